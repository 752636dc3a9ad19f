use async_trait::async_trait;
use reqwest::{Request, Response};

/// Transport seam: everything that talks HTTP goes through this, so auth
/// can be layered on and tests can point at a mock server.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
