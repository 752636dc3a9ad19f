//! Fixed-width text files (the L&I extracts ship this way).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info};

use crate::error::PipelineError;
use crate::table::Table;

/// One column of a fixed-width layout. Offsets count characters, not bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub start: usize,
    pub length: usize,
}

impl FieldSpec {
    pub fn new(name: &str, start: usize, length: usize) -> Self {
        Self {
            name: name.to_string(),
            start,
            length,
        }
    }

    fn slice(&self, chars: &[char]) -> String {
        if self.start >= chars.len() {
            return String::new();
        }
        let end = self.start.saturating_add(self.length).min(chars.len());
        chars[self.start..end].iter().collect::<String>().trim().to_string()
    }
}

/// Loads a layout from a JSON array of `{"name", "start", "length"}`.
pub fn load_layout(path: &Path) -> Result<Vec<FieldSpec>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading layout {}", path.display()))?;
    Ok(serde_json::from_str(&content)?)
}

/// Parses `path` with `fields`, `batch_size` lines at a time.
#[tracing::instrument(skip(fields), fields(path = %path.display(), fields = fields.len()))]
pub fn read_fixed_width(path: &Path, fields: &[FieldSpec], batch_size: usize) -> Result<Table> {
    let file = File::open(path)?;
    let table = parse_lines(BufReader::new(file), fields, batch_size)
        .map_err(|e| PipelineError::parse(path.display().to_string(), e))?;
    info!(rows = table.len(), columns = table.columns().len(), "Parsed fixed-width file");
    Ok(table)
}

/// Splits every non-empty line of `reader` into `fields`.
pub fn parse_lines<R: BufRead>(reader: R, fields: &[FieldSpec], batch_size: usize) -> Result<Table> {
    let batch_size = batch_size.max(1);
    let columns: Vec<String> = fields.iter().map(|f| f.name.clone()).collect();
    let mut table = Table::new(columns.clone());
    let mut batch: Vec<String> = Vec::with_capacity(batch_size);
    let mut batches = 0usize;

    for line in reader.lines() {
        let line = line?;
        batch.push(line.trim_end_matches(['\r', '\n']).to_string());
        if batch.len() >= batch_size {
            table.append(parse_batch(&columns, fields, &batch));
            batch.clear();
            batches += 1;
            debug!(batches, rows = table.len(), "Fixed-width batch parsed");
        }
    }
    if !batch.is_empty() {
        table.append(parse_batch(&columns, fields, &batch));
    }

    Ok(table)
}

fn parse_batch(columns: &[String], fields: &[FieldSpec], lines: &[String]) -> Table {
    let mut table = Table::new(columns.to_vec());
    for line in lines.iter().filter(|l| !l.is_empty()) {
        let chars: Vec<char> = line.chars().collect();
        table.push_row(fields.iter().map(|f| f.slice(&chars)).collect());
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn layout() -> Vec<FieldSpec> {
        vec![
            FieldSpec::new("dot_number", 0, 8),
            FieldSpec::new("authority_status", 8, 10),
            FieldSpec::new("bond_amount", 18, 8),
        ]
    }

    #[test]
    fn test_slices_and_trims_fields() {
        let input = "00012345ACTIVE       75000\n";
        let table = parse_lines(Cursor::new(input), &layout(), 10).unwrap();
        let row = table.row(0).unwrap();
        assert_eq!(row.text("dot_number"), "00012345");
        assert_eq!(row.text("authority_status"), "ACTIVE");
        assert_eq!(row.number("bond_amount"), Some(75000.0));
    }

    #[test]
    fn test_short_lines_yield_empty_fields() {
        let input = "00000001REVOKED\n";
        let table = parse_lines(Cursor::new(input), &layout(), 10).unwrap();
        let row = table.row(0).unwrap();
        assert_eq!(row.text("authority_status"), "REVOKED");
        assert_eq!(row.text("bond_amount"), "");
    }

    #[test]
    fn test_batches_cover_every_line_and_skip_blanks() {
        let mut input = String::new();
        for i in 0..25 {
            input.push_str(&format!("{:08}ACTIVE    {:>8}\n", i, i * 1000));
            if i % 10 == 0 {
                input.push('\n');
            }
        }
        let table = parse_lines(Cursor::new(input), &layout(), 4).unwrap();
        assert_eq!(table.len(), 25);
        assert_eq!(table.row(24).unwrap().text("dot_number"), "00000024");
        assert_eq!(table.row(24).unwrap().number("bond_amount"), Some(24000.0));
    }

    #[test]
    fn test_crlf_and_multibyte_characters() {
        let input = "00000009ÉTAT      1\r\n";
        let table = parse_lines(Cursor::new(input), &layout(), 10).unwrap();
        assert_eq!(table.row(0).unwrap().text("authority_status"), "ÉTAT");
        assert_eq!(table.row(0).unwrap().text("bond_amount"), "1");
    }

    #[test]
    fn test_oversized_length_reads_to_end_of_line() {
        let fields = vec![FieldSpec::new("dot_number", 0, 8), FieldSpec::new("rest", 8, usize::MAX)];
        let table = parse_lines(Cursor::new("00000042ACTIVE BOND\n"), &fields, 10).unwrap();
        assert_eq!(table.row(0).unwrap().text("rest"), "ACTIVE BOND");
    }

    #[test]
    fn test_layout_from_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(
            &mut file,
            br#"[{"name":"dot_number","start":0,"length":8}]"#,
        )
        .unwrap();
        let fields = load_layout(file.path()).unwrap();
        assert_eq!(fields, vec![FieldSpec::new("dot_number", 0, 8)]);
    }
}
