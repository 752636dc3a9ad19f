//! Outreach report over a scored lead table.

use serde::Serialize;
use tracing::info;

use super::utility::mean;
use crate::parser::census::{FLEET_SIZE_COLUMNS, fleet_size, value_counts};
use crate::table::Table;

/// Right-inclusive composite bins: `(0, 2]` is Poor, `(2, 3]` Below Average
/// and so on up to `(5, 6]`.
pub const SCORE_BINS: &[(f64, f64, &str)] = &[
    (0.0, 2.0, "Poor"),
    (2.0, 3.0, "Below Average"),
    (3.0, 4.0, "Average"),
    (4.0, 5.0, "Good"),
    (5.0, 6.0, "Excellent"),
];

const CONTACT_FIELDS: &[&str] = &["email", "phone", "contact_name"];

const TOP_STATES: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LeadReport {
    pub total_leads: usize,
    pub avg_fleet_size: Option<f64>,
    pub states_covered: usize,
    pub top_states: Vec<(String, usize)>,
    /// Every bin in order, including empty ones. `None` without a
    /// `composite_score` column.
    pub score_distribution: Option<Vec<(String, usize)>>,
    /// Non-empty email, phone and contact name cells, summed.
    pub contact_info_available: usize,
}

/// Label of the bin holding `score`; scores outside `(0, 6]` have none.
pub fn score_bin(score: f64) -> Option<&'static str> {
    SCORE_BINS
        .iter()
        .find(|(low, high, _)| score > *low && score <= *high)
        .map(|(_, _, label)| *label)
}

/// Builds the report from a table produced by
/// [`LeadScorer::to_table`](super::LeadScorer::to_table) or any census
/// table. Sections whose columns are missing stay empty.
pub fn lead_report(table: &Table) -> LeadReport {
    let avg_fleet_size = table.first_present(FLEET_SIZE_COLUMNS).and_then(|_| {
        let sizes: Vec<f64> = table.rows().filter_map(|r| fleet_size(&r)).collect();
        (!sizes.is_empty()).then(|| mean(&sizes))
    });

    let (states_covered, top_states) = match table.column_values("phy_state") {
        Some(states) => {
            let mut counts: Vec<(String, usize)> = value_counts(states).into_iter().collect();
            counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            let covered = counts.len();
            counts.truncate(TOP_STATES);
            (covered, counts)
        }
        None => (0, Vec::new()),
    };

    let score_distribution = table.has_column("composite_score").then(|| {
        let mut bins: Vec<(String, usize)> =
            SCORE_BINS.iter().map(|(_, _, label)| (label.to_string(), 0)).collect();
        for row in table.rows() {
            let Some(label) = row.number("composite_score").and_then(score_bin) else {
                continue;
            };
            if let Some(bin) = bins.iter_mut().find(|(l, _)| l.as_str() == label) {
                bin.1 += 1;
            }
        }
        bins
    });

    let present: Vec<&str> = CONTACT_FIELDS
        .iter()
        .copied()
        .filter(|c| table.has_column(c))
        .collect();
    let contact_info_available = table
        .rows()
        .map(|r| present.iter().filter(|c| !r.text(c).trim().is_empty()).count())
        .sum();

    let report = LeadReport {
        total_leads: table.len(),
        avg_fleet_size,
        states_covered,
        top_states,
        score_distribution,
        contact_info_available,
    };
    info!(
        total = report.total_leads,
        states = report.states_covered,
        contacts = report.contact_info_available,
        "Lead report built"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bins_are_right_inclusive() {
        assert_eq!(score_bin(0.0), None);
        assert_eq!(score_bin(0.01), Some("Poor"));
        assert_eq!(score_bin(2.0), Some("Poor"));
        assert_eq!(score_bin(2.000001), Some("Below Average"));
        assert_eq!(score_bin(3.0), Some("Below Average"));
        assert_eq!(score_bin(4.0), Some("Average"));
        assert_eq!(score_bin(5.0), Some("Good"));
        assert_eq!(score_bin(5.5), Some("Excellent"));
        assert_eq!(score_bin(6.5), None);
    }

    #[test]
    fn test_report_sections() {
        let table = Table::from_rows(
            &["dot_number", "phy_state", "fleet_size", "email", "phone", "contact_name", "composite_score"],
            &[
                &["1", "TX", "10", "a@b.com", "5125550100", "", "4.2"],
                &["2", "TX", "", "", " ", "Pat", "1.5"],
                &["3", "CA", "30", "", "", "", "5"],
                &["4", "NV", "5", "", "", "", ""],
                &["5", "OR", "", "", "", "", "3.5"],
                &["6", "WA", "", "", "", "", "2.5"],
                &["7", "ID", "", "", "", "", "3.9"],
            ],
        );
        let report = lead_report(&table);
        assert_eq!(report.total_leads, 7);
        assert_eq!(report.avg_fleet_size, Some(15.0));
        assert_eq!(report.states_covered, 6);
        assert_eq!(report.top_states.len(), 5);
        assert_eq!(report.top_states[0], ("TX".to_string(), 2));
        // ties broken alphabetically
        assert_eq!(report.top_states[1], ("CA".to_string(), 1));
        assert_eq!(report.contact_info_available, 3);

        let bins = report.score_distribution.unwrap();
        let counts: Vec<usize> = bins.iter().map(|(_, n)| *n).collect();
        assert_eq!(counts, vec![1, 1, 2, 2, 0]);
        assert_eq!(bins[4].0, "Excellent");
    }

    #[test]
    fn test_report_without_optional_columns() {
        let report = lead_report(&Table::from_rows(&["dot_number"], &[&["1"]]));
        assert_eq!(report.total_leads, 1);
        assert_eq!(report.avg_fleet_size, None);
        assert_eq!(report.states_covered, 0);
        assert!(report.top_states.is_empty());
        assert_eq!(report.score_distribution, None);
        assert_eq!(report.contact_info_available, 0);
    }
}
