use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::services::market_api::MarketApi;
use fmcsa_leads::arbitrage::Market;
use fmcsa_leads::fetch::{HttpClient, fetch_json};

pub const KALSHI_BASE_URL: &str = "https://api.elections.kalshi.com/trade-api/v2";

/// Market as returned by the API: prices in cents.
#[derive(Deserialize, Default)]
#[serde(default)]
struct RawMarket {
    ticker: String,
    title: String,
    category: String,
    tags: Vec<String>,
    yes_bid: f64,
    yes_ask: f64,
    no_bid: f64,
    no_ask: f64,
    volume: u64,
    volume_24h: u64,
    open_interest: u64,
    last_price: f64,
}

impl From<RawMarket> for Market {
    fn from(m: RawMarket) -> Self {
        let cents = |v: f64| v / 100.0;
        Market {
            ticker: m.ticker,
            title: m.title,
            category: m.category,
            tags: m.tags,
            yes_bid: cents(m.yes_bid),
            yes_ask: cents(m.yes_ask),
            no_bid: cents(m.no_bid),
            no_ask: cents(m.no_ask),
            volume: m.volume,
            volume_24h: m.volume_24h,
            open_interest: m.open_interest,
            last_price: cents(m.last_price),
        }
    }
}

#[derive(Deserialize)]
struct MarketsResponse {
    #[serde(default)]
    markets: Vec<RawMarket>,
}

#[derive(Deserialize)]
struct SeriesResponse {
    #[serde(default)]
    series: Vec<serde_json::Value>,
}

pub struct KalshiClient {
    http: Box<dyn HttpClient>,
    base_url: String,
}

impl KalshiClient {
    pub fn new(http: Box<dyn HttpClient>) -> Self {
        Self::with_base_url(http, KALSHI_BASE_URL)
    }

    pub fn with_base_url(http: Box<dyn HttpClient>, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl MarketApi for KalshiClient {
    async fn list_markets(&self, limit: usize) -> Result<Vec<Market>> {
        let url = format!("{}/markets?limit={}&status=active", self.base_url, limit);
        let response: MarketsResponse = fetch_json(&*self.http, &url).await?;
        debug!(markets = response.markets.len(), "Markets fetched");
        Ok(response.markets.into_iter().map(Market::from).collect())
    }

    async fn list_series(&self) -> Result<usize> {
        let url = format!("{}/series", self.base_url);
        let response: SeriesResponse = fetch_json(&*self.http, &url).await?;
        Ok(response.series.len())
    }
}
