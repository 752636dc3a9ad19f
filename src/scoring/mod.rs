//! Weighted lead scoring.
//!
//! Six component scores in `[0, 5]` are combined with fixed weights into a
//! composite, which decides the [`LeadTier`].

pub mod components;
pub mod enrichment;
pub mod report;
pub mod scorer;
pub mod tier;
pub mod types;
pub mod utility;

pub use report::{LeadReport, lead_report};
pub use scorer::{DEFAULT_TOP_LEADS, LeadScorer, summary, top_leads};
pub use tier::LeadTier;
pub use types::{ComponentScores, ScoredLead, ScoringSummary};
