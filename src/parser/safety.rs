//! SMS safety data: per-carrier score averages and risk buckets.

use tracing::info;

use crate::scoring::utility::mean;
use crate::table::{Row, Table};

pub fn risk_level(avg: Option<f64>) -> Option<&'static str> {
    match avg? {
        s if s <= 0.0 => None,
        s if s <= 2.0 => Some("Low Risk"),
        s if s <= 3.0 => Some("Moderate Risk"),
        s if s <= 4.0 => Some("High Risk"),
        _ => Some("Critical Risk"),
    }
}

fn score_columns(table: &Table) -> Vec<String> {
    table
        .columns()
        .iter()
        .filter(|c| c.contains("score"))
        .cloned()
        .collect()
}

fn average_of(row: &Row<'_>, columns: &[String]) -> Option<f64> {
    let values: Vec<f64> = columns.iter().filter_map(|c| row.number(c)).collect();
    (!values.is_empty()).then(|| mean(&values))
}

/// Trims `dot_number` and adds `avg_safety_score` and `risk_level` when the
/// table has any score columns.
pub fn clean(mut table: Table) -> Table {
    table.map_column("dot_number", |v| v.trim().to_string());

    let columns = score_columns(&table);
    if columns.is_empty() {
        return table;
    }

    let averages: Vec<Option<f64>> = table.rows().map(|r| average_of(&r, &columns)).collect();
    let risk = averages
        .iter()
        .map(|a| risk_level(*a).unwrap_or_default().to_string())
        .collect();
    let avg = averages
        .iter()
        .map(|a| a.map(|v| v.to_string()).unwrap_or_default())
        .collect();

    table.set_column("avg_safety_score", avg);
    table.set_column("risk_level", risk);
    table
}

/// Rows whose first score or rating column is at least `threshold`,
/// highest first.
pub fn high_risk_carriers(table: &Table, threshold: f64) -> Table {
    let Some(column) = table
        .columns()
        .iter()
        .find(|c| c.contains("score") || c.contains("rating"))
        .cloned()
    else {
        return Table::new(table.columns().to_vec());
    };

    let mut risky = table.filter(|r| r.number(&column).is_some_and(|v| v >= threshold));
    risky.sort_by(|a, b| {
        let (a, b) = (a.number(&column).unwrap_or(0.0), b.number(&column).unwrap_or(0.0));
        b.total_cmp(&a)
    });

    info!(count = risky.len(), threshold, column = %column, "High-risk carriers found");
    risky
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_buckets() {
        assert_eq!(risk_level(Some(0.0)), None);
        assert_eq!(risk_level(Some(2.0)), Some("Low Risk"));
        assert_eq!(risk_level(Some(2.5)), Some("Moderate Risk"));
        assert_eq!(risk_level(Some(4.0)), Some("High Risk"));
        assert_eq!(risk_level(Some(4.1)), Some("Critical Risk"));
        assert_eq!(risk_level(None), None);
    }

    #[test]
    fn test_clean_averages_parseable_scores() {
        let t = Table::from_rows(
            &["dot_number", "unsafe_driving_score", "driver_fitness_score", "safety_rating"],
            &[&[" 7 ", "3", "4", "SATISFACTORY"], &["8", "", "x", ""]],
        );
        let t = clean(t);
        let r = t.row(0).unwrap();
        assert_eq!(r.text("dot_number"), "7");
        assert_eq!(r.number("avg_safety_score"), Some(3.5));
        assert_eq!(r.text("risk_level"), "High Risk");

        let r = t.row(1).unwrap();
        assert_eq!(r.text("avg_safety_score"), "");
        assert_eq!(r.text("risk_level"), "");
    }

    #[test]
    fn test_clean_without_score_columns() {
        let t = clean(Table::from_rows(&["dot_number"], &[&["1"]]));
        assert!(!t.has_column("avg_safety_score"));
    }

    #[test]
    fn test_high_risk_sorted_descending() {
        let t = Table::from_rows(
            &["dot_number", "unsafe_driving_score"],
            &[&["1", "3"], &["2", "4.5"], &["3", "1"], &["4", "4.5"]],
        );
        let risky = high_risk_carriers(&t, 3.0);
        let dots: Vec<_> = risky.column_values("dot_number").unwrap().collect();
        assert_eq!(dots, vec!["2", "4", "1"]);
    }
}
