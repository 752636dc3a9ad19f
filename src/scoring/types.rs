//! Data types produced by the lead scorer.

use serde::Serialize;
use std::collections::BTreeMap;

use super::components::Weights;
use super::tier::LeadTier;

/// The six component scores of one lead, each in `[0, 5]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ComponentScores {
    pub growth: f64,
    pub legitimacy: f64,
    pub safety: f64,
    pub contact: f64,
    pub specialization: f64,
    pub recency: f64,
}

impl ComponentScores {
    pub fn composite(&self, w: &Weights) -> f64 {
        self.growth * w.growth
            + self.legitimacy * w.legitimacy
            + self.safety * w.safety
            + self.contact * w.contact
            + self.specialization * w.specialization
            + self.recency * w.recency
    }
}

/// A scored census row. `source_row` indexes the table that was scored.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredLead {
    pub source_row: usize,
    pub dot_number: String,
    pub scores: ComponentScores,
    pub composite: f64,
    pub tier: LeadTier,
}

/// Aggregate view over a scored lead list.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScoringSummary {
    pub total_leads: usize,
    pub tier_breakdown: BTreeMap<String, usize>,
    pub average_score: f64,
    pub top_tier_count: usize,
    pub high_growth_leads: usize,
    pub poor_safety_leads: usize,
}
