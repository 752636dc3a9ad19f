//! MCMIS census derivations, filters and summaries.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use tracing::{info, warn};

use crate::filter::matches_any_state;
use crate::scoring::utility::{mean, median};
use crate::table::{Row, Table};

/// Columns that may carry the fleet size, in order of preference.
pub const FLEET_SIZE_COLUMNS: &[&str] = &["fleet_size", "nbr_power_unit", "power_units"];

/// Columns that may carry the registration date, in order of preference.
pub const REGISTRATION_DATE_COLUMNS: &[&str] =
    &["add_date", "registration_date", "created_date", "start_date"];

const CONTACT_COLUMNS: &[&str] = &[
    "dot_number",
    "legal_name",
    "dba_name",
    "phy_city",
    "phy_state",
    "phy_zip",
    "phy_country",
    "mail_city",
    "mail_state",
    "mail_zip",
    "email",
    "phone",
    "fax",
    "contact_name",
];

static STRICT_EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap());

/// Fleet size of a census row, `None` when missing or unparseable.
pub fn fleet_size(row: &Row<'_>) -> Option<f64> {
    FLEET_SIZE_COLUMNS.iter().find_map(|c| row.number(c))
}

/// Bucket label for a fleet size; non-positive or missing sizes have none.
pub fn fleet_category(size: Option<f64>) -> Option<&'static str> {
    match size? {
        s if s <= 0.0 => None,
        s if s <= 1.0 => Some("1 vehicle"),
        s if s <= 5.0 => Some("2-5 vehicles"),
        s if s <= 20.0 => Some("6-20 vehicles"),
        s if s <= 100.0 => Some("21-100 vehicles"),
        _ => Some("100+ vehicles"),
    }
}

/// Trims identifiers and names, uppercases states, adds `fleet_category`.
pub fn clean(mut table: Table) -> Table {
    table.map_column("dot_number", |v| v.trim().to_string());
    table.map_column("legal_name", |v| v.trim().to_string());
    table.map_column("phy_state", |v| v.trim().to_uppercase());

    if table.first_present(FLEET_SIZE_COLUMNS).is_some() {
        let categories = table
            .rows()
            .map(|r| fleet_category(fleet_size(&r)).unwrap_or_default().to_string())
            .collect();
        table.set_column("fleet_category", categories);
    }
    table
}

pub fn filter_by_state(table: &Table, state: &str) -> Table {
    filter_by_region(table, &[state.to_string()])
}

pub fn filter_by_region(table: &Table, states: &[String]) -> Table {
    table.filter(|r| matches_any_state(r, states))
}

/// Keeps rows with `min <= fleet size (<= max)`. Missing sizes count as 0.
pub fn filter_by_fleet_size(table: &Table, min: f64, max: Option<f64>) -> Table {
    table.filter(|r| {
        let size = fleet_size(r).unwrap_or(0.0);
        size >= min && max.is_none_or(|m| size <= m)
    })
}

pub fn is_broker(row: &Row<'_>) -> bool {
    row.lower("carrier_operation").contains("broker")
}

pub fn filter_brokers(table: &Table) -> Table {
    table.filter(is_broker)
}

/// Everything that is not a broker by operation or entity type.
pub fn filter_carriers(table: &Table) -> Table {
    table.filter(|r| !is_broker(r) && !r.lower("entity_type").contains("broker"))
}

/// Companies registered within `days_back` days of `as_of`, newest first.
/// Without any registration date column the result is empty.
pub fn find_new_companies(table: &Table, days_back: i64, as_of: NaiveDate) -> Table {
    let Some(column) = table.first_present(REGISTRATION_DATE_COLUMNS) else {
        warn!("No date column found for identifying new companies");
        return Table::new(table.columns().to_vec());
    };

    // a window reaching past the earliest representable date keeps every dated row
    let cutoff = chrono::Duration::try_days(days_back)
        .and_then(|window| as_of.checked_sub_signed(window))
        .unwrap_or(NaiveDate::MIN);
    let mut recent = table.filter(|r| r.date(column).is_some_and(|d| d >= cutoff));
    recent.sort_by(|a, b| b.date(column).cmp(&a.date(column)));

    info!(count = recent.len(), days_back, column, "New companies found");
    recent
}

/// Case-insensitive city substring match, optionally within one state.
pub fn filter_by_city(table: &Table, city: &str, state: Option<&str>) -> Table {
    let city = city.to_lowercase();
    table.filter(|r| {
        r.lower("phy_city").contains(&city)
            && state.is_none_or(|s| r.text("phy_state").trim().eq_ignore_ascii_case(s))
    })
}

/// Contact columns plus `valid_email` and digits-only `clean_phone`.
pub fn contact_info(table: &Table) -> Table {
    let mut contacts = table.select(CONTACT_COLUMNS);

    if contacts.has_column("email") {
        contacts.map_column("email", |v| v.trim().to_lowercase());
        let valid = contacts
            .rows()
            .map(|r| STRICT_EMAIL.is_match(r.text("email")).to_string())
            .collect();
        contacts.set_column("valid_email", valid);
    }

    if contacts.has_column("phone") {
        let clean = contacts
            .rows()
            .map(|r| r.text("phone").chars().filter(char::is_ascii_digit).collect())
            .collect();
        contacts.set_column("clean_phone", clean);
    }

    contacts
}

/// Logs row count, operation mix, fleet statistics and the busiest states.
pub fn log_summary(table: &Table) {
    info!(total = table.len(), "Census data summary");

    if let Some(ops) = table.column_values("carrier_operation") {
        let counts = value_counts(ops);
        info!(operation_types = ?counts, "Operation types");
    }

    if table.first_present(FLEET_SIZE_COLUMNS).is_some() {
        let sizes: Vec<f64> = table.rows().filter_map(|r| fleet_size(&r)).collect();
        info!(
            mean = format!("{:.1}", mean(&sizes)),
            median = format!("{:.1}", median(&sizes)),
            "Fleet size"
        );
    }

    if let Some(states) = table.column_values("phy_state") {
        let mut counts: Vec<(String, usize)> = value_counts(states).into_iter().collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        counts.truncate(10);
        info!(top_states = ?counts, "Top 10 states by carrier count");
    }
}

/// Counts of trimmed, non-empty values.
pub(crate) fn value_counts<'a>(values: impl Iterator<Item = &'a str>) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for v in values.map(str::trim).filter(|v| !v.is_empty()) {
        *counts.entry(v.to_string()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn census() -> Table {
        Table::from_rows(
            &["dot_number", "legal_name", "phy_city", "phy_state", "fleet_size", "carrier_operation", "entity_type", "add_date", "email", "phone"],
            &[
                &[" 1 ", " Acme ", "Austin", "tx", "1", "Interstate Carrier", "CARRIER", "2024-05-01", " Ops@Acme.com ", "(512) 555-0100"],
                &["2", "Beta", "Dallas", "TX", "15", "Broker", "BROKER", "2023-01-01", "bad", ""],
                &["3", "Gamma", "Reno", "NV", "", "Intrastate", "CARRIER", "", "", "555"],
                &["4", "Delta", "Austin", "CA", "150", "Interstate", "CARRIER/BROKER", "2024-05-20", "", ""],
            ],
        )
    }

    #[test]
    fn test_fleet_category_buckets() {
        assert_eq!(fleet_category(Some(0.0)), None);
        assert_eq!(fleet_category(None), None);
        assert_eq!(fleet_category(Some(1.0)), Some("1 vehicle"));
        assert_eq!(fleet_category(Some(5.0)), Some("2-5 vehicles"));
        assert_eq!(fleet_category(Some(20.0)), Some("6-20 vehicles"));
        assert_eq!(fleet_category(Some(100.0)), Some("21-100 vehicles"));
        assert_eq!(fleet_category(Some(101.0)), Some("100+ vehicles"));
    }

    #[test]
    fn test_clean_trims_and_derives() {
        let t = clean(census());
        let r = t.row(0).unwrap();
        assert_eq!(r.text("dot_number"), "1");
        assert_eq!(r.text("legal_name"), "Acme");
        assert_eq!(r.text("phy_state"), "TX");
        assert_eq!(r.text("fleet_category"), "1 vehicle");
        assert_eq!(t.row(2).unwrap().text("fleet_category"), "");
    }

    #[test]
    fn test_fleet_size_fallback_column() {
        let t = Table::from_rows(&["nbr_power_unit"], &[&["7"]]);
        assert_eq!(fleet_size(&t.row(0).unwrap()), Some(7.0));
    }

    #[test]
    fn test_state_and_fleet_filters() {
        let t = census();
        assert_eq!(filter_by_state(&t, "TX").len(), 2);
        assert_eq!(filter_by_region(&t, &["nv".into(), "ca".into()]).len(), 2);
        assert_eq!(filter_by_fleet_size(&t, 10.0, None).len(), 2);
        assert_eq!(filter_by_fleet_size(&t, 0.0, Some(20.0)).len(), 3);
    }

    #[test]
    fn test_broker_and_carrier_split() {
        let t = census();
        let brokers = filter_brokers(&t);
        assert_eq!(brokers.len(), 1);
        assert_eq!(brokers.row(0).unwrap().text("dot_number"), "2");

        // entity type mentioning a broker also excludes the row
        let carriers = filter_carriers(&t);
        let dots: Vec<_> = carriers.column_values("dot_number").unwrap().collect();
        assert_eq!(dots, vec![" 1 ", "3"]);
    }

    #[test]
    fn test_new_companies_sorted_newest_first() {
        let as_of = NaiveDate::from_ymd_opt(2024, 5, 31).unwrap();
        let recent = find_new_companies(&census(), 30, as_of);
        let dots: Vec<_> = recent.column_values("dot_number").unwrap().collect();
        assert_eq!(dots, vec!["4", " 1 "]);
    }

    #[test]
    fn test_new_companies_with_unbounded_window() {
        let as_of = NaiveDate::from_ymd_opt(2024, 5, 31).unwrap();
        let all = find_new_companies(&census(), i64::MAX, as_of);
        assert_eq!(all.len(), 3);
        let huge = find_new_companies(&census(), 1_000_000_000_000, as_of);
        assert_eq!(huge.len(), 3);
    }

    #[test]
    fn test_new_companies_without_date_column() {
        let t = Table::from_rows(&["dot_number"], &[&["1"]]);
        let as_of = NaiveDate::from_ymd_opt(2024, 5, 31).unwrap();
        assert!(find_new_companies(&t, 30, as_of).is_empty());
    }

    #[test]
    fn test_city_filter_with_state() {
        let t = clean(census());
        assert_eq!(filter_by_city(&t, "aus", None).len(), 2);
        assert_eq!(filter_by_city(&t, "aus", Some("tx")).len(), 1);
    }

    #[test]
    fn test_contact_info_derivations() {
        let contacts = contact_info(&census());
        assert!(!contacts.has_column("fleet_size"));
        let r = contacts.row(0).unwrap();
        assert_eq!(r.text("email"), "ops@acme.com");
        assert_eq!(r.text("valid_email"), "true");
        assert_eq!(r.text("clean_phone"), "5125550100");
        assert_eq!(contacts.row(1).unwrap().text("valid_email"), "false");
    }
}
