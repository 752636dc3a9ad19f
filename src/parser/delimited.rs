//! Delimited text reader with delimiter sniffing.

use anyhow::Result;
use csv::ReaderBuilder;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, info};

use crate::error::PipelineError;
use crate::table::{Table, normalize_columns};

const SAMPLE_BYTES: usize = 1024;
const CANDIDATES: &[u8] = b",\t;|";
pub const DEFAULT_DELIMITER: u8 = b',';

/// Picks the delimiter that occurs the same, non-zero number of times on
/// every complete line of `sample`. Quoted sections are ignored. Returns
/// `None` when no candidate is consistent.
pub fn sniff_delimiter(sample: &str) -> Option<u8> {
    let mut lines: Vec<&str> = sample.lines().collect();
    // The last line of a truncated sample is usually partial.
    if lines.len() > 1 && !sample.ends_with('\n') {
        lines.pop();
    }
    let lines: Vec<&str> = lines.into_iter().filter(|l| !l.trim().is_empty()).collect();
    if lines.is_empty() {
        return None;
    }

    CANDIDATES.iter().copied().find(|&delim| {
        let counts: Vec<usize> = lines.iter().map(|l| count_unquoted(l, delim)).collect();
        counts[0] > 0 && counts.iter().all(|&c| c == counts[0])
    })
}

fn count_unquoted(line: &str, delim: u8) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for b in line.bytes() {
        if b == b'"' {
            in_quotes = !in_quotes;
        } else if b == delim && !in_quotes {
            count += 1;
        }
    }
    count
}

/// Reads a delimited file into a [`Table`] with normalized headers.
///
/// All cells stay text. Rows with too few fields are padded, rows with too
/// many are truncated.
///
/// # Errors
///
/// [`PipelineError::Parse`] for malformed records or invalid UTF-8.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn read_csv(path: &Path) -> Result<Table> {
    let mut file = File::open(path)?;

    let mut sample = vec![0u8; SAMPLE_BYTES];
    let n = file.read(&mut sample)?;
    sample.truncate(n);
    let sample = String::from_utf8_lossy(&sample);
    let delimiter = sniff_delimiter(&sample).unwrap_or_else(|| {
        debug!("Delimiter detection failed, using default");
        DEFAULT_DELIMITER
    });
    file.seek(SeekFrom::Start(0))?;

    let table = read_delimited(BufReader::new(file), delimiter)
        .map_err(|e| PipelineError::parse(path.display().to_string(), e))?;

    info!(
        rows = table.len(),
        columns = table.columns().len(),
        delimiter = %(delimiter as char).escape_default(),
        "Parsed CSV"
    );
    Ok(table)
}

/// Reads delimited text from any reader. Errors are returned unclassified.
pub fn read_delimited<R: Read>(reader: R, delimiter: u8) -> Result<Table> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let mut table = Table::new(normalize_columns(headers.iter()));

    for record in rdr.records() {
        let record = record?;
        table.push_row(record.iter().map(str::to_string).collect());
    }

    Ok(table)
}
