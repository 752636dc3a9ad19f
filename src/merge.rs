//! Census-centred merge of safety and inspection data.

use anyhow::Result;
use std::collections::HashSet;
use tracing::info;

use crate::config::FsmaSettings;
use crate::parser::inspection::{food_safety_violations, violation_summary};
use crate::table::Table;

/// Left-joins `safety` (suffix `_safety`) and the per-carrier violation
/// summary of `inspections` (suffix `_violations`) onto `census`, then flags
/// carriers with food-safety violations in `has_fsma_violations`.
///
/// # Errors
///
/// [`crate::error::PipelineError::Join`] when a joined table lacks
/// `dot_number`.
#[tracing::instrument(skip_all, fields(census = census.len()))]
pub fn merge_datasets(
    census: &Table,
    safety: Option<&Table>,
    inspections: Option<&Table>,
    fsma: &FsmaSettings,
) -> Result<Table> {
    let mut merged = census.clone();

    if let Some(safety) = safety {
        merged = merged.left_join(safety, "dot_number", "_safety")?;
    }

    if let Some(inspections) = inspections {
        let summary = violation_summary(inspections);
        merged = merged.left_join(&summary, "dot_number", "_violations")?;

        let flagged: HashSet<String> = food_safety_violations(inspections, fsma)
            .column_values("dot_number")
            .map(|v| v.map(|d| d.trim().to_string()).collect())
            .unwrap_or_default();
        let flags = merged
            .rows()
            .map(|r| flagged.contains(r.text("dot_number").trim()).to_string())
            .collect();
        merged.set_column("has_fsma_violations", flags);
    }

    info!(rows = merged.len(), columns = merged.columns().len(), "Merged datasets");
    Ok(merged)
}
