//! Keyword-overlap arbitrage heuristic over prediction markets.
//!
//! Markets are grouped by series, paired by a tag/title/category overlap
//! score, and pairs whose last prices sum below 0.95 are reported. The score
//! is a proxy only; it carries no statistical guarantee.

pub mod correlation;
pub mod detector;
pub mod tags;
pub mod types;

pub use detector::{ArbitrageDetector, CorrelatedPair, detect_opportunities, find_correlated_pairs};
pub use types::{DEFAULT_TAGS, Market, Opportunity, RiskLevel};
