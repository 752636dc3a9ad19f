//! Regional and equipment targeting applied as a row mask.

use std::collections::HashSet;
use tracing::{info, warn};

use crate::parser::census::{filter_by_city, fleet_size};
use crate::table::{Row, Table};

/// Columns searched for equipment keywords, in order.
pub const EQUIPMENT_COLUMNS: &[&str] =
    &["cargo_type", "equipment_type", "commodity_type", "vehicle_type"];

/// `true` when the row's trimmed, uppercased `phy_state` is in `states`.
pub fn matches_any_state(row: &Row<'_>, states: &[String]) -> bool {
    let state = row.text("phy_state").trim().to_uppercase();
    states.iter().any(|s| s.trim().eq_ignore_ascii_case(&state))
}

/// Keeps rows that mention any keyword in the first candidate column
/// containing it. Returns an empty table when no candidate column exists.
pub fn filter_by_equipment(table: &Table, keywords: &[String]) -> Table {
    let columns: Vec<&str> = EQUIPMENT_COLUMNS
        .iter()
        .copied()
        .filter(|c| table.has_column(c))
        .collect();
    if columns.is_empty() {
        warn!("No equipment type column found");
        return Table::new(table.columns().to_vec());
    }

    let keywords: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();
    table.filter(|r| {
        columns.iter().any(|c| {
            let cell = r.lower(c);
            keywords.iter().any(|k| cell.contains(k.as_str()))
        })
    })
}

/// Keeps rows whose trimmed `dot_number` appears in `other`.
pub fn restrict_to_dot_numbers(table: &Table, other: &Table) -> Table {
    let Some(dots) = other.column_values("dot_number") else {
        warn!("No dot_number column to restrict by");
        return Table::new(table.columns().to_vec());
    };
    let dots: HashSet<&str> = dots.map(str::trim).collect();
    table.filter(|r| dots.contains(r.text("dot_number").trim()))
}

/// Combined targeting criteria; empty criteria accept every row.
#[derive(Debug, Clone, Default)]
pub struct LeadFilter {
    pub states: Vec<String>,
    pub min_fleet_size: Option<f64>,
    pub equipment: Vec<String>,
    pub city: Option<String>,
}

impl LeadFilter {
    #[tracing::instrument(skip_all, fields(rows = table.len()))]
    pub fn apply(&self, table: &Table) -> Table {
        let mut result = table.clone();

        if !self.states.is_empty() {
            result = result.filter(|r| matches_any_state(r, &self.states));
        }
        if let Some(min) = self.min_fleet_size {
            result = result.filter(|r| fleet_size(r).unwrap_or(0.0) >= min);
        }
        if !self.equipment.is_empty() {
            result = filter_by_equipment(&result, &self.equipment);
        }
        if let Some(city) = &self.city {
            result = filter_by_city(&result, city, None);
        }

        info!(kept = result.len(), "Lead filter applied");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leads() -> Table {
        Table::from_rows(
            &["dot_number", "phy_state", "fleet_size", "cargo_type", "equipment_type"],
            &[
                &["1", " tx ", "12", "Refrigerated Food", ""],
                &["2", "CA", "3", "General Freight", "Flatbed"],
                &["3", "TX", "", "", "Reefer"],
                &["4", "NV", "80", "Hazmat", ""],
            ],
        )
    }

    #[test]
    fn test_empty_filter_keeps_everything() {
        assert_eq!(LeadFilter::default().apply(&leads()).len(), 4);
    }

    #[test]
    fn test_state_membership_is_normalized() {
        let f = LeadFilter {
            states: vec!["tx".into()],
            ..Default::default()
        };
        let dots: Vec<_> = f.apply(&leads()).column_values("dot_number").unwrap().map(String::from).collect();
        assert_eq!(dots, vec!["1", "3"]);
    }

    #[test]
    fn test_min_fleet_treats_missing_as_zero() {
        let f = LeadFilter {
            min_fleet_size: Some(10.0),
            ..Default::default()
        };
        assert_eq!(f.apply(&leads()).len(), 2);
    }

    #[test]
    fn test_equipment_searches_candidate_columns() {
        let t = filter_by_equipment(&leads(), &["REEFER".into(), "flatbed".into()]);
        let dots: Vec<_> = t.column_values("dot_number").unwrap().collect();
        assert_eq!(dots, vec!["2", "3"]);
    }

    #[test]
    fn test_equipment_without_columns_is_empty() {
        let t = Table::from_rows(&["dot_number"], &[&["1"]]);
        assert!(filter_by_equipment(&t, &["reefer".into()]).is_empty());
    }

    #[test]
    fn test_combined_criteria() {
        let f = LeadFilter {
            states: vec!["TX".into(), "NV".into()],
            min_fleet_size: Some(5.0),
            equipment: vec!["haz".into(), "food".into()],
            city: None,
        };
        let dots: Vec<_> = f.apply(&leads()).column_values("dot_number").unwrap().map(String::from).collect();
        assert_eq!(dots, vec!["1", "4"]);
    }

    #[test]
    fn test_city_narrows_after_state() {
        let t = Table::from_rows(
            &["dot_number", "phy_state", "phy_city"],
            &[&["1", "TX", "Austin"], &["2", "TX", "Houston"], &["3", "CA", "Austin Lake"]],
        );
        let f = LeadFilter {
            states: vec!["TX".into()],
            city: Some("AUSTIN".into()),
            ..Default::default()
        };
        let dots: Vec<_> = f.apply(&t).column_values("dot_number").unwrap().map(String::from).collect();
        assert_eq!(dots, vec!["1"]);
    }

    #[test]
    fn test_restrict_to_dot_numbers() {
        let risky = Table::from_rows(&["dot_number", "unsafe_driving_score"], &[&[" 4 ", "4.5"], &["9", "3.0"]]);
        let kept = restrict_to_dot_numbers(&leads(), &risky);
        let dots: Vec<_> = kept.column_values("dot_number").unwrap().collect();
        assert_eq!(dots, vec!["4"]);

        let unkeyed = Table::from_rows(&["legal_name"], &[&["Acme"]]);
        assert!(restrict_to_dot_numbers(&leads(), &unkeyed).is_empty());
    }
}
