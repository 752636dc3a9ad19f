//! Market and opportunity records.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Used when the tag generator returns nothing.
pub const DEFAULT_TAGS: &[&str] = &["election", "politics", "democrat", "republican", "2024", "president"];

/// One prediction market. Prices are probabilities in `[0, 1]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub ticker: String,
    pub title: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub yes_bid: f64,
    pub yes_ask: f64,
    pub no_bid: f64,
    pub no_ask: f64,
    pub volume: u64,
    pub volume_24h: u64,
    pub open_interest: u64,
    pub last_price: f64,
}

impl Market {
    /// Ticker prefix before the first `-`, or the category when the ticker
    /// has no `-`.
    pub fn series(&self) -> &str {
        match self.ticker.split_once('-') {
            Some((prefix, _)) => prefix,
            None => &self.category,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Liquidity proxy from the mean 24h volume of the markets involved.
    pub fn from_volume(avg_volume_24h: f64) -> Self {
        match avg_volume_24h {
            v if v > 10_000.0 => RiskLevel::Low,
            v if v > 1_000.0 => RiskLevel::Medium,
            _ => RiskLevel::High,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Opportunity {
    pub description: String,
    pub markets: Vec<Market>,
    pub potential_profit: f64,
    pub risk_level: RiskLevel,
    pub confidence: f64,
}

impl Opportunity {
    /// Multi-line human-readable report of this opportunity.
    pub fn report(&self, rank: usize) -> String {
        let mut out = format!(
            "{rank}. {}\n   Profit: ${:.2}\n   Risk: {} | Confidence: {:.2}\n",
            self.description, self.potential_profit, self.risk_level, self.confidence
        );
        for m in &self.markets {
            out.push_str(&format!(
                "   - {}: {}\n     Price: ${:.2} | Volume: {}\n     Spread: Yes({:.2}-{:.2}) No({:.2}-{:.2})\n",
                m.ticker, m.title, m.last_price, m.volume_24h, m.yes_bid, m.yes_ask, m.no_bid, m.no_ask
            ));
        }
        out
    }
}
