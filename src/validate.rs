//! Non-blocking data quality checks.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use tracing::warn;

use crate::table::Table;

static DOT_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{1,8}$").unwrap());
static STATE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{2}$").unwrap());

const MAX_NAME_LENGTH: usize = 255;
const MAX_BLANK_SHARE: f64 = 0.5;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub total_rows: usize,
    pub total_columns: usize,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// A DOT number is 1 to 8 ASCII digits after trimming.
pub fn validate_dot_number(value: &str) -> bool {
    DOT_NUMBER.is_match(value.trim())
}

/// Checks identifiers, names, states and blank-heavy columns. Every finding
/// is logged as a warning and collected in the report.
#[tracing::instrument(skip_all, fields(rows = table.len()))]
pub fn validate(table: &Table) -> ValidationReport {
    let mut report = ValidationReport {
        total_rows: table.len(),
        total_columns: table.columns().len(),
        warnings: Vec::new(),
    };

    match table.column_values("dot_number") {
        None => report.warnings.push("missing dot_number column".to_string()),
        Some(values) => {
            let mut seen = HashSet::new();
            let mut invalid = 0;
            let mut duplicates = 0;
            for value in values.map(str::trim) {
                if !validate_dot_number(value) {
                    invalid += 1;
                } else if !seen.insert(value) {
                    duplicates += 1;
                }
            }
            if invalid > 0 {
                report.warnings.push(format!("{invalid} invalid DOT numbers"));
            }
            if duplicates > 0 {
                report.warnings.push(format!("{duplicates} duplicate DOT numbers"));
            }
        }
    }

    if let Some(names) = table.column_values("legal_name") {
        let long = names.filter(|n| n.chars().count() > MAX_NAME_LENGTH).count();
        if long > 0 {
            report
                .warnings
                .push(format!("{long} legal names longer than {MAX_NAME_LENGTH} characters"));
        }
    }

    if let Some(states) = table.column_values("phy_state") {
        let bad = states
            .map(str::trim)
            .filter(|s| !s.is_empty() && !STATE_CODE.is_match(s))
            .count();
        if bad > 0 {
            report.warnings.push(format!("{bad} invalid state codes"));
        }
    }

    if !table.is_empty() {
        for column in table.columns() {
            let blank = table
                .column_values(column)
                .map(|v| v.filter(|c| c.trim().is_empty()).count())
                .unwrap_or(0);
            let share = blank as f64 / table.len() as f64;
            if share > MAX_BLANK_SHARE {
                report.warnings.push(format!(
                    "column {column} is {:.0}% blank",
                    share * 100.0
                ));
            }
        }
    }

    for w in &report.warnings {
        warn!(warning = %w, "Validation");
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_dot_number() {
        assert!(validate_dot_number("1"));
        assert!(validate_dot_number(" 12345678 "));
        assert!(!validate_dot_number("123456789"));
        assert!(!validate_dot_number("12a"));
        assert!(!validate_dot_number(""));
    }

    #[test]
    fn test_clean_table_has_no_warnings() {
        let t = Table::from_rows(
            &["dot_number", "legal_name", "phy_state"],
            &[&["1", "Acme", "TX"], &["2", "Beta", "CA"]],
        );
        let report = validate(&t);
        assert!(report.is_clean());
        assert_eq!(report.total_rows, 2);
        assert_eq!(report.total_columns, 3);
    }

    #[test]
    fn test_reports_each_problem() {
        let long_name = "x".repeat(256);
        let t = Table::from_rows(
            &["dot_number", "legal_name", "phy_state", "email"],
            &[
                &["1", long_name.as_str(), "tx", ""],
                &["1", "Beta", "CA", ""],
                &["abc", "Gamma", "", "a@b.com"],
            ],
        );
        let report = validate(&t);
        assert!(report.warnings.contains(&"1 invalid DOT numbers".to_string()));
        assert!(report.warnings.contains(&"1 duplicate DOT numbers".to_string()));
        assert!(report.warnings.iter().any(|w| w.starts_with("1 legal names")));
        assert!(report.warnings.contains(&"1 invalid state codes".to_string()));
        assert!(report.warnings.contains(&"column email is 67% blank".to_string()));
    }

    #[test]
    fn test_missing_dot_column() {
        let t = Table::from_rows(&["legal_name"], &[&["Acme"]]);
        assert_eq!(validate(&t).warnings, vec!["missing dot_number column".to_string()]);
    }
}
