use anyhow::Result;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::info;

use super::components::{
    WEIGHTS, Weights, contact_score, growth_score, legitimacy_score, recency_score,
    safety_score, specialization_score,
};
use super::enrichment::Enrichment;
use super::tier::LeadTier;
use super::types::{ComponentScores, ScoredLead, ScoringSummary};
use super::utility::mean;
use crate::error::PipelineError;
use crate::parser::census::{fleet_category, fleet_size};
use crate::table::Table;

/// Columns appended to the source table by [`LeadScorer::to_table`].
pub const SCORE_COLUMNS: &[&str] = &[
    "growth_score",
    "legitimacy_score",
    "safety_score",
    "contact_score",
    "specialization_score",
    "recency_score",
    "composite_score",
    "lead_tier",
];

pub const DEFAULT_TOP_LEADS: usize = 50;

/// Scores census rows against optional safety and licensing data.
///
/// Dates are measured against `as_of` so results are reproducible.
#[derive(Debug, Clone)]
pub struct LeadScorer {
    as_of: NaiveDate,
    weights: Weights,
}

impl LeadScorer {
    pub fn new(as_of: NaiveDate) -> Self {
        Self {
            as_of,
            weights: WEIGHTS,
        }
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    /// Scores every row of `census`, highest composite first. Equal
    /// composites keep their input order. `census` is not modified.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Join`] when enrichment data is supplied but `census`
    /// has no `dot_number` column.
    #[tracing::instrument(skip_all, fields(rows = census.len(), sms = sms.is_some(), li = li.is_some()))]
    pub fn score(
        &self,
        census: &Table,
        sms: Option<&Table>,
        li: Option<&Table>,
    ) -> Result<Vec<ScoredLead>> {
        if (sms.is_some() || li.is_some()) && !census.has_column("dot_number") {
            return Err(PipelineError::Join {
                column: "dot_number".to_string(),
                side: "left",
            }
            .into());
        }

        let sms = sms.and_then(|t| Enrichment::index(t, "sms"));
        let li = li.and_then(|t| Enrichment::index(t, "li"));

        let mut leads: Vec<ScoredLead> = census
            .rows()
            .map(|row| {
                let dot = row.text("dot_number").trim();
                let safety = sms.as_ref().and_then(|e| e.get(dot));
                let licensing = li.as_ref().and_then(|e| e.get(dot));

                let scores = ComponentScores {
                    growth: growth_score(&row, safety.as_ref()),
                    legitimacy: legitimacy_score(&row, licensing.as_ref()),
                    safety: safety_score(safety.as_ref()),
                    contact: contact_score(&row),
                    specialization: specialization_score(&row),
                    recency: recency_score(&row, self.as_of),
                };
                let composite = scores.composite(&self.weights);

                ScoredLead {
                    source_row: row.index(),
                    dot_number: dot.to_string(),
                    scores,
                    composite,
                    tier: LeadTier::from_composite(composite),
                }
            })
            .collect();

        leads.sort_by(|a, b| b.composite.total_cmp(&a.composite));

        info!(
            leads = leads.len(),
            top_tier = leads.iter().filter(|l| l.tier == LeadTier::Top).count(),
            "Scored leads"
        );
        Ok(leads)
    }

    /// Source columns plus `fleet_category` (when absent) and the score
    /// columns, one row per lead in `leads` order.
    pub fn to_table(&self, census: &Table, leads: &[ScoredLead]) -> Table {
        let indices: Vec<usize> = leads.iter().map(|l| l.source_row).collect();
        let mut table = census.take(&indices);

        if !table.has_column("fleet_category") {
            let categories = table
                .rows()
                .map(|r| fleet_category(fleet_size(&r)).unwrap_or_default().to_string())
                .collect();
            table.set_column("fleet_category", categories);
        }

        let column = |f: fn(&ScoredLead) -> String| leads.iter().map(f).collect::<Vec<_>>();
        table.set_column("growth_score", column(|l| l.scores.growth.to_string()));
        table.set_column("legitimacy_score", column(|l| l.scores.legitimacy.to_string()));
        table.set_column("safety_score", column(|l| l.scores.safety.to_string()));
        table.set_column("contact_score", column(|l| l.scores.contact.to_string()));
        table.set_column("specialization_score", column(|l| l.scores.specialization.to_string()));
        table.set_column("recency_score", column(|l| l.scores.recency.to_string()));
        table.set_column("composite_score", column(|l| l.composite.to_string()));
        table.set_column("lead_tier", column(|l| l.tier.label().to_string()));
        table
    }

    /// Top Tier and High Priority leads, at most `max`, with a `priority`
    /// column.
    pub fn top_leads_table(&self, census: &Table, leads: &[ScoredLead], max: usize) -> Table {
        let top = top_leads(leads, max);
        let mut table = self.to_table(census, &top);
        let priority = top
            .iter()
            .map(|l| l.tier.priority().unwrap_or_default().to_string())
            .collect();
        table.set_column("priority", priority);
        table
    }
}

/// Top Tier and High Priority leads in ranked order, at most `max`.
pub fn top_leads(leads: &[ScoredLead], max: usize) -> Vec<ScoredLead> {
    leads
        .iter()
        .filter(|l| l.tier.priority().is_some())
        .take(max)
        .cloned()
        .collect()
}

pub fn summary(leads: &[ScoredLead]) -> ScoringSummary {
    let mut tier_breakdown = BTreeMap::new();
    for lead in leads {
        *tier_breakdown.entry(lead.tier.label().to_string()).or_insert(0) += 1;
    }
    let composites: Vec<f64> = leads.iter().map(|l| l.composite).collect();

    ScoringSummary {
        total_leads: leads.len(),
        tier_breakdown,
        average_score: mean(&composites),
        top_tier_count: leads.iter().filter(|l| l.tier == LeadTier::Top).count(),
        high_growth_leads: leads.iter().filter(|l| l.scores.growth >= 4.0).count(),
        poor_safety_leads: leads.iter().filter(|l| l.scores.safety >= 4.0).count(),
    }
}
