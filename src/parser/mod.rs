//! Reading raw dataset files into [`Table`]s.
//!
//! Format is chosen by extension; the dataset-specific cleaning lives in the
//! submodules and is applied by [`process_file`].

pub mod census;
pub mod delimited;
pub mod fixed_width;
pub mod inspection;
pub mod licensing;
pub mod safety;

use anyhow::Result;
use std::path::Path;
use tracing::info;

use crate::config::{DatasetKind, FsmaSettings};
use crate::error::PipelineError;
use crate::table::Table;
use fixed_width::FieldSpec;

/// Parses `path` as CSV (`.csv`) or fixed-width text (`.txt`, needs `layout`).
pub fn parse_file(path: &Path, layout: Option<&[FieldSpec]>, batch_size: usize) -> Result<Table> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "csv" => delimited::read_csv(path),
        "txt" => {
            let layout =
                layout.ok_or_else(|| PipelineError::MissingLayout(path.display().to_string()))?;
            fixed_width::read_fixed_width(path, layout, batch_size)
        }
        other => Err(PipelineError::UnsupportedFormat(other.to_string()).into()),
    }
}

/// Parses `path` and applies the cleaning for `kind`. For inspections the
/// result is the food-safety subset.
#[tracing::instrument(skip(layout, fsma), fields(path = %path.display()))]
pub fn process_file(
    path: &Path,
    kind: DatasetKind,
    layout: Option<&[FieldSpec]>,
    batch_size: usize,
    fsma: &FsmaSettings,
) -> Result<Table> {
    let table = parse_file(path, layout, batch_size)?;
    let processed = match kind {
        DatasetKind::Census => {
            let cleaned = census::clean(table);
            census::log_summary(&cleaned);
            cleaned
        }
        DatasetKind::Safety => safety::clean(table),
        DatasetKind::Licensing => licensing::clean(table),
        DatasetKind::Inspections => inspection::food_safety_violations(&table, fsma),
    };
    info!(kind = ?kind, rows = processed.len(), "Processed dataset");
    Ok(processed)
}
