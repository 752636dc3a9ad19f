use serde::{Deserialize, Serialize};
use std::fmt;

/// Outreach priority derived from the composite score.
///
/// | Composite   | Tier            |
/// |-------------|-----------------|
/// | >= 5.0      | Top Tier        |
/// | >= 3.5      | High Priority   |
/// | >= 2.0      | Medium Priority |
/// | < 2.0       | Low Priority    |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LeadTier {
    #[serde(rename = "Low Priority")]
    Low,
    #[serde(rename = "Medium Priority")]
    Medium,
    #[serde(rename = "High Priority")]
    High,
    #[serde(rename = "Top Tier")]
    Top,
}

impl LeadTier {
    pub const ALL: [LeadTier; 4] = [LeadTier::Low, LeadTier::Medium, LeadTier::High, LeadTier::Top];

    pub fn from_composite(composite: f64) -> Self {
        match composite {
            c if c >= 5.0 => LeadTier::Top,
            c if c >= 3.5 => LeadTier::High,
            c if c >= 2.0 => LeadTier::Medium,
            _ => LeadTier::Low,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LeadTier::Low => "Low Priority",
            LeadTier::Medium => "Medium Priority",
            LeadTier::High => "High Priority",
            LeadTier::Top => "Top Tier",
        }
    }

    /// Outreach label for tiers worth contacting now.
    pub fn priority(&self) -> Option<&'static str> {
        match self {
            LeadTier::Top => Some("Immediate Outreach"),
            LeadTier::High => Some("High Priority"),
            _ => None,
        }
    }
}

impl fmt::Display for LeadTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
