use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::services::tag_generator::TagGenerator;
use fmcsa_leads::arbitrage::tags::{parse_tags, tag_prompt};
use fmcsa_leads::fetch::{HttpClient, post_json};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const MODEL: &str = "gpt-4o-mini";
const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 500;

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completions tag generator. Expects `http` to carry the bearer key.
pub struct OpenAiTagGenerator {
    http: Box<dyn HttpClient>,
    base_url: String,
}

impl OpenAiTagGenerator {
    pub fn new(http: Box<dyn HttpClient>) -> Self {
        Self::with_base_url(http, OPENAI_BASE_URL)
    }

    pub fn with_base_url(http: Box<dyn HttpClient>, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl TagGenerator for OpenAiTagGenerator {
    async fn generate_tags(&self, context: &str, count: usize) -> Result<Vec<String>> {
        let prompt = tag_prompt(context, count);
        let request = ChatRequest {
            model: MODEL,
            messages: vec![ChatMessage {
                role: "user",
                content: &prompt,
            }],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let response: ChatResponse = post_json(&*self.http, &url, &request)
            .await
            .context("requesting tags")?;

        let reply = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        debug!(reply = %reply, "Tag generator reply");

        Ok(parse_tags(&reply, count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fmcsa_leads::fetch::BasicClient;
    use fmcsa_leads::fetch::auth::ApiKey;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_generate_tags_sends_prompt_and_parses_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({"model": "gpt-4o-mini", "max_tokens": 500})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "[\"senate\", \"house\", \"governor\"]"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let http = ApiKey::bearer(BasicClient::new(), "sk-test").unwrap();
        let generator = OpenAiTagGenerator::with_base_url(Box::new(http), &server.uri());
        let tags = generator.generate_tags("midterms", 2).await.unwrap();
        assert_eq!(tags, vec!["senate", "house"]);
    }

    #[tokio::test]
    async fn test_empty_choices_yield_no_tags() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
            .mount(&server)
            .await;

        let generator = OpenAiTagGenerator::with_base_url(Box::new(BasicClient::new()), &server.uri());
        assert!(generator.generate_tags("", 5).await.unwrap().is_empty());
    }
}
