//! Trait for a prediction-market data provider.

use anyhow::Result;
use fmcsa_leads::arbitrage::Market;

/// Abstraction over a market-data provider (e.g., Kalshi).
#[async_trait::async_trait]
pub trait MarketApi {
    /// Returns up to `limit` active markets, prices as probabilities.
    async fn list_markets(&self, limit: usize) -> Result<Vec<Market>>;

    /// Returns the number of market series the provider lists.
    async fn list_series(&self) -> Result<usize>;
}
