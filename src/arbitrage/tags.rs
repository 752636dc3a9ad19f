//! Turning a free-text LLM reply into a tag list.

use serde_json::Value;

use super::types::DEFAULT_TAGS;

/// Prompt asking for `count` tags, optionally steered by `context`.
pub fn tag_prompt(context: &str, count: usize) -> String {
    let context = context.trim();
    if context.is_empty() {
        format!("Generate {count} relevant tags for finding arbitrage opportunities in election prediction markets. Return only JSON array.")
    } else {
        format!("Generate {count} relevant tags for finding arbitrage opportunities in election prediction markets. Context: {context} Return only JSON array.")
    }
}

/// Reads a JSON array of strings (code fences allowed). Failing that, takes
/// every line containing a double quote with quotes and commas stripped.
/// At most `limit` non-empty tags are returned.
pub fn parse_tags(reply: &str, limit: usize) -> Vec<String> {
    let body = strip_code_fence(reply.trim());

    let tags: Vec<String> = match serde_json::from_str::<Value>(body) {
        Ok(Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        _ => body
            .lines()
            .filter(|l| l.contains('"'))
            .map(|l| {
                l.trim()
                    .trim_matches(|c: char| c == '"' || c == ',' || c.is_whitespace())
                    .to_string()
            })
            .collect(),
    };

    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .take(limit)
        .collect()
}

/// `tags`, or [`DEFAULT_TAGS`] when empty.
pub fn or_default_tags(tags: Vec<String>) -> Vec<String> {
    if tags.is_empty() {
        DEFAULT_TAGS.iter().map(|t| t.to_string()).collect()
    } else {
        tags
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
