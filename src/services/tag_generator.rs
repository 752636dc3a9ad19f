//! Trait for producing topical search tags.

use anyhow::Result;

#[async_trait::async_trait]
pub trait TagGenerator {
    /// Returns at most `count` tags relevant to `context`. An empty list is
    /// a valid answer.
    async fn generate_tags(&self, context: &str, count: usize) -> Result<Vec<String>>;
}
