//! Output formatting and persistence for scored leads.
//!
//! Supports pretty-printing summaries, and writing tables as CSV, gzipped
//! CSV or JSON.

use anyhow::Result;
use chrono::Local;
use csv::WriterBuilder;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

use crate::error::PipelineError;
use crate::table::Table;

/// Columns kept in outreach exports, in this order, when present.
pub const OUTREACH_COLUMNS: &[&str] = &[
    "dot_number",
    "legal_name",
    "dba_name",
    "entity_type",
    "carrier_operation",
    "phy_city",
    "phy_state",
    "phy_zip",
    "fleet_size",
    "fleet_category",
    "email",
    "phone",
    "contact_name",
    "growth_score",
    "legitimacy_score",
    "safety_score",
    "contact_score",
    "specialization_score",
    "recency_score",
    "composite_score",
    "lead_tier",
    "priority",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    CsvGz,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::CsvGz => "csv.gz",
            ExportFormat::Json => "json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "csv.gz" | "gz" | "gzip" => Ok(ExportFormat::CsvGz),
            "json" => Ok(ExportFormat::Json),
            other => Err(PipelineError::UnsupportedFormat(other.to_string()).into()),
        }
    }
}

/// Logs a summary using Rust's debug pretty-print format.
pub fn print_pretty<T: std::fmt::Debug>(summary: &T) {
    debug!("{:#?}", summary);
}

/// Logs a summary as pretty-printed JSON.
pub fn print_json<T: Serialize>(summary: &T) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(summary)?);
    Ok(())
}

/// `<dir>/<stem>_<YYYYmmdd_HHMMSS>.<ext>`
pub fn timestamped_path(dir: &Path, stem: &str, format: ExportFormat) -> PathBuf {
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    dir.join(format!("{}_{}.{}", stem, stamp, format.extension()))
}

pub fn write_csv<W: Write>(table: &Table, writer: W) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(writer);
    writer.write_record(table.columns())?;
    for row in table.raw_rows() {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes rows as a JSON array of `{column: value}` objects. Blank cells
/// become `null`.
pub fn write_json<W: Write>(table: &Table, writer: W) -> Result<()> {
    let records: Vec<Value> = table
        .raw_rows()
        .iter()
        .map(|row| {
            let object: Map<String, Value> = table
                .columns()
                .iter()
                .zip(row)
                .map(|(c, v)| {
                    let value = if v.is_empty() {
                        Value::Null
                    } else {
                        Value::String(v.clone())
                    };
                    (c.clone(), value)
                })
                .collect();
            Value::Object(object)
        })
        .collect();
    serde_json::to_writer_pretty(writer, &records)?;
    Ok(())
}

/// Writes `table` to `path` in `format`. Existing files are overwritten.
#[tracing::instrument(skip(table), fields(path = %path.display(), rows = table.len()))]
pub fn write_table(table: &Table, path: &Path, format: ExportFormat) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = BufWriter::new(File::create(path)?);
    match format {
        ExportFormat::Csv => write_csv(table, file)?,
        ExportFormat::Json => write_json(table, file)?,
        ExportFormat::CsvGz => {
            let mut encoder = GzEncoder::new(file, Compression::default());
            write_csv(table, &mut encoder)?;
            encoder.finish()?.flush()?;
        }
    }
    info!("Table written");
    Ok(())
}

/// Writes the outreach columns of `table` once per format into `dir`,
/// returning the created paths.
pub fn export_outreach(
    table: &Table,
    dir: &Path,
    stem: &str,
    formats: &[ExportFormat],
) -> Result<Vec<PathBuf>> {
    let outreach = table.select(OUTREACH_COLUMNS);
    let mut paths = Vec::with_capacity(formats.len());
    for &format in formats {
        let path = timestamped_path(dir, stem, format);
        write_table(&outreach, &path, format)?;
        paths.push(path);
    }
    Ok(paths)
}
