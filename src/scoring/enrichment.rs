//! Lookup of safety / licensing rows by DOT number.

use std::collections::HashMap;
use tracing::warn;

use crate::table::{Row, Table};

/// First row of `table` for each trimmed DOT number.
pub struct Enrichment<'a> {
    table: &'a Table,
    by_dot: HashMap<&'a str, usize>,
}

impl<'a> Enrichment<'a> {
    /// Indexes `table`. A table without a `dot_number` column cannot be
    /// joined and yields `None`.
    pub fn index(table: &'a Table, name: &str) -> Option<Self> {
        let Some(values) = table.column_values("dot_number") else {
            warn!(dataset = name, "Enrichment table has no dot_number column, ignoring it");
            return None;
        };

        let mut by_dot = HashMap::new();
        let mut duplicates = 0usize;
        for (i, dot) in values.map(str::trim).enumerate() {
            if dot.is_empty() {
                continue;
            }
            if by_dot.contains_key(dot) {
                duplicates += 1;
            } else {
                by_dot.insert(dot, i);
            }
        }
        if duplicates > 0 {
            warn!(dataset = name, duplicates, "Duplicate DOT numbers, keeping the first row");
        }

        Some(Self { table, by_dot })
    }

    pub fn get(&self, dot_number: &str) -> Option<Row<'a>> {
        let dot = dot_number.trim();
        if dot.is_empty() {
            return None;
        }
        self.by_dot.get(dot).and_then(|&i| self.table.row(i))
    }

    pub fn len(&self) -> usize {
        self.by_dot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_dot.is_empty()
    }
}
