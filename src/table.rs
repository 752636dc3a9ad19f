//! Column-labelled, all-text tables.
//!
//! Every cell is kept as the text that was read; an empty cell is the
//! "missing" value. Numbers and dates are parsed on access through [`Row`],
//! and anything that does not parse comes back as `None` instead of an
//! error.

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

use crate::error::PipelineError;

static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s\-_./]+").unwrap());
static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w]").unwrap());
static REPEATED_UNDERSCORE: Lazy<Regex> = Lazy::new(|| Regex::new(r"_{2,}").unwrap());

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y%m%d", "%d-%b-%y", "%d-%b-%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M",
];

/// Lowercases a header and joins its words with `_`.
///
/// `"Phy State"` → `phy_state`, `"Controlled Substances/Alcohol"` →
/// `controlled_substances_alcohol`.
pub fn normalize_column_name(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    let joined = SEPARATORS.replace_all(&lower, "_");
    let cleaned = NON_WORD.replace_all(&joined, "");
    let collapsed = REPEATED_UNDERSCORE.replace_all(&cleaned, "_");
    collapsed.trim_matches('_').to_string()
}

/// Normalizes every header, suffixing repeats with `_1`, `_2`, ...
pub fn normalize_columns<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    names
        .into_iter()
        .map(|name| {
            let base = normalize_column_name(name);
            match seen.get_mut(&base) {
                Some(count) => {
                    *count += 1;
                    format!("{}_{}", base, count)
                }
                None => {
                    seen.insert(base.clone(), 0);
                    base
                }
            }
        })
        .collect()
}

/// Parses a numeric cell. Blank, non-numeric and non-finite values are `None`.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses a date cell in any of the layouts the FMCSA extracts use.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
                .map(|dt| dt.date())
        })
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Builds a table from string literals. Mostly useful in tests.
    pub fn from_rows(columns: &[&str], rows: &[&[&str]]) -> Self {
        let mut table = Table::new(columns.iter().map(|c| c.to_string()).collect());
        for row in rows {
            table.push_row(row.iter().map(|c| c.to_string()).collect());
        }
        table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Returns the first of `candidates` that exists in this table.
    pub fn first_present<'c>(&self, candidates: &[&'c str]) -> Option<&'c str> {
        candidates.iter().copied().find(|c| self.has_column(c))
    }

    /// Appends a row, padding short rows with blanks and dropping extra cells.
    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.columns.len(), String::new());
        self.rows.push(row);
    }

    pub fn row(&self, index: usize) -> Option<Row<'_>> {
        (index < self.rows.len()).then_some(Row { table: self, index })
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        (0..self.rows.len()).map(move |index| Row { table: self, index })
    }

    pub fn raw_rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Cells of `name`, or `None` when the column does not exist.
    pub fn column_values(&self, name: &str) -> Option<impl Iterator<Item = &str>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |r| r[idx].as_str()))
    }

    /// Keeps the rows matching `pred`, in order.
    pub fn filter(&self, pred: impl Fn(&Row<'_>) -> bool) -> Table {
        let rows = self
            .rows()
            .filter(|r| pred(r))
            .map(|r| self.rows[r.index].clone())
            .collect();
        Table {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// Keeps rows by index, in the order given.
    pub fn take(&self, indices: &[usize]) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: indices
                .iter()
                .filter_map(|&i| self.rows.get(i).cloned())
                .collect(),
        }
    }

    /// Projects onto the listed columns that exist, in the listed order.
    pub fn select(&self, names: &[&str]) -> Table {
        let picked: Vec<(String, usize)> = names
            .iter()
            .filter_map(|n| self.column_index(n).map(|i| (n.to_string(), i)))
            .collect();
        Table {
            columns: picked.iter().map(|(n, _)| n.clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|r| picked.iter().map(|(_, i)| r[*i].clone()).collect())
                .collect(),
        }
    }

    /// Adds `name` (or replaces it when present) with one value per row.
    pub fn set_column(&mut self, name: &str, values: Vec<String>) {
        debug_assert_eq!(values.len(), self.rows.len());
        match self.column_index(name) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.columns.push(name.to_string());
                let mut values = values.into_iter();
                for row in self.rows.iter_mut() {
                    row.push(values.next().unwrap_or_default());
                }
            }
        }
    }

    /// Rewrites every cell of `name` in place. No-op when the column is absent.
    pub fn map_column(&mut self, name: &str, f: impl Fn(&str) -> String) {
        if let Some(idx) = self.column_index(name) {
            for row in self.rows.iter_mut() {
                row[idx] = f(&row[idx]);
            }
        }
    }

    /// Appends all rows of `other`, aligning columns by name. Columns only
    /// `other` has are added; cells missing on either side are blank.
    pub fn append(&mut self, other: Table) {
        if self.columns.is_empty() && self.rows.is_empty() {
            *self = other;
            return;
        }
        for col in &other.columns {
            if !self.has_column(col) {
                self.columns.push(col.clone());
                for row in self.rows.iter_mut() {
                    row.push(String::new());
                }
            }
        }
        let mapping: Vec<usize> = other
            .columns
            .iter()
            .filter_map(|c| self.column_index(c))
            .collect();
        for row in other.rows {
            let mut out = vec![String::new(); self.columns.len()];
            for (value, &idx) in row.into_iter().zip(&mapping) {
                out[idx] = value;
            }
            self.rows.push(out);
        }
    }

    /// Left join on `on`. Each left row yields one output row per matching
    /// right row (or one blank-padded row when nothing matches). Right-side
    /// columns that clash with a left column get `suffix` appended.
    pub fn left_join(&self, right: &Table, on: &str, suffix: &str) -> anyhow::Result<Table> {
        let left_key = self.column_index(on).ok_or_else(|| PipelineError::Join {
            column: on.to_string(),
            side: "left",
        })?;
        let right_key = right.column_index(on).ok_or_else(|| PipelineError::Join {
            column: on.to_string(),
            side: "right",
        })?;

        let right_cols: Vec<usize> = (0..right.columns.len()).filter(|&i| i != right_key).collect();
        let mut columns = self.columns.clone();
        for &i in &right_cols {
            let name = &right.columns[i];
            if self.has_column(name) {
                columns.push(format!("{}{}", name, suffix));
            } else {
                columns.push(name.clone());
            }
        }

        let mut index: HashMap<&str, Vec<usize>> = HashMap::new();
        for (i, row) in right.rows.iter().enumerate() {
            let key = row[right_key].trim();
            if !key.is_empty() {
                index.entry(key).or_default().push(i);
            }
        }

        let mut joined = Table::new(columns);
        for row in &self.rows {
            match index.get(row[left_key].trim()) {
                Some(matches) => {
                    for &m in matches {
                        let mut out = row.clone();
                        out.extend(right_cols.iter().map(|&i| right.rows[m][i].clone()));
                        joined.rows.push(out);
                    }
                }
                None => {
                    let mut out = row.clone();
                    out.extend(right_cols.iter().map(|_| String::new()));
                    joined.rows.push(out);
                }
            }
        }

        Ok(joined)
    }

    /// Stable sort by a key computed from each row.
    pub fn sort_by(&mut self, cmp: impl Fn(&Row<'_>, &Row<'_>) -> std::cmp::Ordering) {
        let this: &Table = self;
        let mut order: Vec<usize> = (0..this.rows.len()).collect();
        order.sort_by(|&a, &b| {
            cmp(
                &Row { table: this, index: a },
                &Row { table: this, index: b },
            )
        });
        let sorted = order.into_iter().map(|i| this.rows[i].clone()).collect();
        self.rows = sorted;
    }
}

/// Borrowed view of one table row with typed, defaulting lookups.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    table: &'a Table,
    index: usize,
}

impl<'a> Row<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    /// Raw cell text, `""` when the column does not exist.
    pub fn text(&self, column: &str) -> &'a str {
        self.table
            .column_index(column)
            .map(|i| self.table.rows[self.index][i].as_str())
            .unwrap_or("")
    }

    /// Trimmed cell text, `None` when absent or blank.
    pub fn value(&self, column: &str) -> Option<&'a str> {
        let v = self.text(column).trim();
        (!v.is_empty()).then_some(v)
    }

    pub fn number(&self, column: &str) -> Option<f64> {
        parse_number(self.text(column))
    }

    pub fn date(&self, column: &str) -> Option<NaiveDate> {
        parse_date(self.text(column))
    }

    /// Lowercased cell text for keyword matching.
    pub fn lower(&self, column: &str) -> String {
        self.text(column).to_lowercase()
    }

    pub fn cells(&self) -> &'a [String] {
        &self.table.rows[self.index]
    }
}
