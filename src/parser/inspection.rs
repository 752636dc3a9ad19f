//! Inspection records and the food-safety (FSMA) subset.

use std::collections::HashMap;
use tracing::info;

use crate::config::FsmaSettings;
use crate::table::{Row, Table};

/// `true` when the row's violation code or description matches the rules.
pub fn is_food_safety_violation(row: &Row<'_>, rules: &FsmaSettings) -> bool {
    let code = row.lower("violation_code");
    let description = row.lower("violation_description");

    let code_hit = !code.is_empty()
        && rules
            .violation_codes
            .iter()
            .any(|c| code.contains(&c.to_lowercase()));
    let keyword_hit = !description.is_empty()
        && rules
            .keywords
            .iter()
            .any(|k| description.contains(&k.to_lowercase()));

    code_hit || keyword_hit
}

pub fn food_safety_violations(table: &Table, rules: &FsmaSettings) -> Table {
    let hits = table.filter(|r| is_food_safety_violation(r, rules));
    info!(count = hits.len(), "Food safety violations found");
    hits
}

/// One row per `(dot_number, violation_code)` with the first description
/// and `violation_count`, most frequent first.
pub fn violation_summary(table: &Table) -> Table {
    let mut order: Vec<(String, String)> = Vec::new();
    let mut groups: HashMap<(String, String), (String, usize)> = HashMap::new();

    for row in table.rows() {
        let key = (
            row.text("dot_number").trim().to_string(),
            row.text("violation_code").trim().to_string(),
        );
        let counted = usize::from(row.value("inspection_date").is_some());
        match groups.get_mut(&key) {
            Some((_, count)) => *count += counted,
            None => {
                let description = row.text("violation_description").to_string();
                groups.insert(key.clone(), (description, counted));
                order.push(key);
            }
        }
    }

    let mut summary = Table::new(
        ["dot_number", "violation_code", "violation_description", "violation_count"]
            .map(String::from)
            .to_vec(),
    );
    for key in order {
        if let Some((description, count)) = groups.remove(&key) {
            summary.push_row(vec![key.0, key.1, description, count.to_string()]);
        }
    }
    summary.sort_by(|a, b| {
        let count = |r: &Row<'_>| r.number("violation_count").unwrap_or(0.0);
        count(b).total_cmp(&count(a))
    });
    summary
}
