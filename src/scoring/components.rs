//! The six component scores. Each returns a value in `[0, 5]`.
//!
//! `lead` is the census row; `safety` and `licensing` are the matching
//! enrichment rows, `None` when that dataset was not supplied or has no
//! row for the carrier.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use super::utility::{clamp_score, mean};
use crate::parser::census::fleet_size;
use crate::table::Row;

static SIMPLE_EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^@]+@[^@]+\.[^@]+$").unwrap());

pub const BASIC_COLUMNS: &[&str] = &[
    "unsafe_driving_score",
    "hours_of_service_compliance_score",
    "vehicle_maintenance_score",
    "controlled_substances_alcohol_score",
    "hazardous_materials_compliance_score",
    "driver_fitness_score",
];

const HAZMAT: &[&str] = &["hazmat", "hazardous", "chemical", "explosive", "radioactive"];
const SPECIALIZED: &[&str] = &[
    "refrigerated",
    "reefer",
    "temperature_controlled",
    "oversized",
    "heavy_haul",
];
const VALUABLE: &[&str] = &[
    "household_goods",
    "electronics",
    "pharmaceutical",
    "automotive",
    "machinery",
];
const TIME_SENSITIVE: &[&str] = &["perishable", "fresh_produce", "dairy", "meat", "bakery"];

const HIGH_VMT_PER_UNIT: f64 = 50_000.0;
const LARGE_BOND: f64 = 75_000.0;

/// Component weights of the composite score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
    pub growth: f64,
    pub legitimacy: f64,
    pub safety: f64,
    pub contact: f64,
    pub specialization: f64,
    pub recency: f64,
}

pub const WEIGHTS: Weights = Weights {
    growth: 0.25,
    legitimacy: 0.20,
    safety: 0.20,
    contact: 0.15,
    specialization: 0.10,
    recency: 0.10,
};

/// Fleet size bucket, plus fleet utilization and mileage when safety data
/// is available.
pub fn growth_score(lead: &Row<'_>, safety: Option<&Row<'_>>) -> f64 {
    let mut score: f64 = match fleet_size(lead) {
        Some(f) if f > 50.0 => 5.0,
        Some(f) if f > 20.0 => 4.0,
        Some(f) if f > 10.0 => 3.0,
        Some(f) if f > 5.0 => 2.0,
        Some(f) if f > 1.0 => 1.0,
        _ => 0.0,
    };

    if let Some(sms) = safety {
        let power_units = sms.number("power_units").unwrap_or(0.0);
        let drivers = sms.number("drivers").filter(|d| *d > 0.0).unwrap_or(1.0);
        score += match power_units / drivers {
            r if r > 2.0 => 2.0,
            r if r > 1.5 => 1.0,
            _ => 0.0,
        };

        let units = if power_units == 0.0 { 1.0 } else { power_units };
        if sms.number("vmt").is_some_and(|vmt| vmt / units >= HIGH_VMT_PER_UNIT) {
            score += 1.0;
        }
    }

    score.min(5.0)
}

/// Operating type, plus authority and bond status when licensing data is
/// available.
pub fn legitimacy_score(lead: &Row<'_>, licensing: Option<&Row<'_>>) -> f64 {
    let entity = lead.lower("entity_type");
    let operation = lead.lower("carrier_operation");
    let mentions = |word: &str| entity.contains(word) || operation.contains(word);

    let mut score = 3.0;
    if mentions("carrier") {
        score += 1.0;
    }
    if mentions("broker") {
        score += 1.0;
    }

    if let Some(li) = licensing {
        let authority = li.lower("authority_status");
        if authority.contains("active") {
            score += 1.0;
        }
        if authority.contains("revoked") || authority.contains("suspended") {
            score -= 2.0;
        }
        let bond = li.lower("bond_status");
        if bond.contains("active") || bond.contains("valid") {
            score += 1.0;
        }
        if li.number("bond_amount").is_some_and(|b| b >= LARGE_BOND) {
            score += 1.0;
        }
    }

    clamp_score(score)
}

/// Higher for carriers with safety problems: they are more likely to buy
/// compliance services.
pub fn safety_score(safety: Option<&Row<'_>>) -> f64 {
    let Some(sms) = safety else {
        return 3.0;
    };

    let mut score = 3.0;
    let rating = sms.lower("safety_rating");
    if rating.contains("unsatisfactory") {
        score += 2.0;
    }
    if rating.contains("conditional") {
        score += 1.0;
    }

    let basics: Vec<f64> = BASIC_COLUMNS.iter().filter_map(|c| sms.number(c)).collect();
    if !basics.is_empty() {
        score += match mean(&basics) {
            m if m >= 3.0 => 1.0,
            m if m >= 2.0 => 0.5,
            _ => 0.0,
        };
    }

    score += match sms.number("total_inspections") {
        Some(n) if n > 50.0 => 1.0,
        Some(n) if n > 20.0 => 0.5,
        _ => 0.0,
    };

    clamp_score(score)
}

/// Completeness of email, phone and physical address.
pub fn contact_score(lead: &Row<'_>) -> f64 {
    let mut score: f64 = 0.0;

    let email = lead.text("email").trim();
    if SIMPLE_EMAIL.is_match(email) {
        score += 2.0;
        if email.to_lowercase().ends_with(".com") {
            score += 0.5;
        }
    }

    let digits = lead.text("phone").chars().filter(char::is_ascii_digit).count();
    score += match digits {
        d if d > 10 => 2.0,
        d if d > 7 => 1.0,
        _ => 0.0,
    };

    for column in ["phy_city", "phy_state", "phy_zip"] {
        if lead.value(column).is_some() {
            score += 1.0;
        }
    }

    score.min(5.0)
}

/// Cargo specialization from the keywords in `cargo_carried`.
pub fn specialization_score(lead: &Row<'_>) -> f64 {
    let cargo = lead.lower("cargo_carried");
    let any_of = |words: &[&str]| words.iter().any(|w| cargo.contains(w));

    let mut score: f64 = 1.0;
    if any_of(HAZMAT) {
        score += 2.0;
    }
    if any_of(SPECIALIZED) {
        score += 1.5;
    }
    if any_of(VALUABLE) {
        score += 1.0;
    }
    if any_of(TIME_SENSITIVE) {
        score += 1.0;
    }
    if cargo.contains("intermodal") {
        score += 0.5;
    }
    if cargo.contains("international") {
        score += 0.5;
    }

    score.min(5.0)
}

/// Newer registrations score higher. Missing or future dates are neutral.
pub fn recency_score(lead: &Row<'_>, as_of: NaiveDate) -> f64 {
    let Some(added) = lead.date("add_date") else {
        return 3.0;
    };
    match (as_of - added).num_days() {
        d if d < 0 => 3.0,
        d if d <= 30 => 5.0,
        d if d <= 90 => 4.0,
        d if d <= 365 => 3.0,
        d if d <= 730 => 2.0,
        _ => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Table;

    fn one(columns: &[&str], values: &[&str]) -> Table {
        Table::from_rows(columns, &[values])
    }

    #[test]
    fn test_weights_sum_to_one() {
        let w = WEIGHTS;
        let sum = w.growth + w.legitimacy + w.safety + w.contact + w.specialization + w.recency;
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_growth_fleet_buckets() {
        let cases = [
            ("", 0.0),
            ("-3", 0.0),
            ("0", 0.0),
            ("1", 0.0),
            ("5", 1.0),
            ("10", 2.0),
            ("20", 3.0),
            ("50", 4.0),
            ("51", 5.0),
        ];
        for (fleet, expected) in cases {
            let t = one(&["fleet_size"], &[fleet]);
            assert_eq!(growth_score(&t.row(0).unwrap(), None), expected, "fleet {fleet}");
        }
    }

    #[test]
    fn test_growth_with_utilization_and_mileage() {
        let lead = one(&["fleet_size"], &["8"]);
        let sms = one(&["power_units", "drivers", "vmt"], &["10", "4", "600000"]);
        // 2 + 2 (ratio 2.5) + 1 (60k miles per unit)
        assert_eq!(growth_score(&lead.row(0).unwrap(), sms.row(0).as_ref()), 5.0);

        let sms = one(&["power_units", "drivers", "vmt"], &["7", "4", "10"]);
        assert_eq!(growth_score(&lead.row(0).unwrap(), sms.row(0).as_ref()), 3.0);

        // no drivers counts as one driver
        let sms = one(&["power_units", "drivers"], &["3", "0"]);
        assert_eq!(growth_score(&lead.row(0).unwrap(), sms.row(0).as_ref()), 4.0);
    }

    #[test]
    fn test_growth_is_capped() {
        let lead = one(&["fleet_size"], &["100"]);
        let sms = one(&["power_units", "drivers", "vmt"], &["100", "10", "9000000"]);
        assert_eq!(growth_score(&lead.row(0).unwrap(), sms.row(0).as_ref()), 5.0);
    }

    #[test]
    fn test_legitimacy() {
        let lead = one(&["entity_type", "carrier_operation"], &["CARRIER/BROKER", ""]);
        assert_eq!(legitimacy_score(&lead.row(0).unwrap(), None), 5.0);

        let lead = one(&["entity_type"], &["SHIPPER"]);
        let li = one(&["authority_status", "bond_status", "bond_amount"], &["REVOKED", "", "1000"]);
        assert_eq!(legitimacy_score(&lead.row(0).unwrap(), li.row(0).as_ref()), 1.0);

        let lead = one(&["carrier_operation"], &["Interstate Carrier"]);
        let li = one(&["authority_status", "bond_status", "bond_amount"], &["Active", "VALID", "75000"]);
        assert_eq!(legitimacy_score(&lead.row(0).unwrap(), li.row(0).as_ref()), 5.0);
    }

    #[test]
    fn test_safety_without_data_is_neutral() {
        assert_eq!(safety_score(None), 3.0);
    }

    #[test]
    fn test_safety_components() {
        let sms = one(
            &["safety_rating", "unsafe_driving_score", "driver_fitness_score", "total_inspections"],
            &["Conditional", "2", "2.5", "30"],
        );
        // 3 + 1 + 0.5 + 0.5
        assert_eq!(safety_score(sms.row(0).as_ref()), 5.0);

        let sms = one(&["safety_rating", "total_inspections"], &["Satisfactory", "20"]);
        assert_eq!(safety_score(sms.row(0).as_ref()), 3.0);

        let sms = one(&["unsafe_driving_score", "total_inspections"], &["1", "51"]);
        assert_eq!(safety_score(sms.row(0).as_ref()), 4.0);
    }

    #[test]
    fn test_safety_rating_mentioning_both_levels() {
        let sms = one(&["safety_rating"], &["Unsatisfactory (was Conditional)"]);
        assert_eq!(safety_score(sms.row(0).as_ref()), 5.0);

        let sms = one(&["safety_rating"], &["UNSATISFACTORY"]);
        assert_eq!(safety_score(sms.row(0).as_ref()), 5.0);
    }

    #[test]
    fn test_contact() {
        let lead = one(
            &["email", "phone", "phy_city", "phy_state", "phy_zip"],
            &[" info@acme.com ", "(555) 123-4567", "Austin", "TX", ""],
        );
        // 2.5 email + 1 phone (10 digits) + 2 address
        assert_eq!(contact_score(&lead.row(0).unwrap()), 5.0);

        let lead = one(&["email", "phone"], &["info@acme.org", "+1 555 123 4567 x"]);
        assert_eq!(contact_score(&lead.row(0).unwrap()), 4.0);

        let lead = one(&["email", "phone"], &["not-an-email", "5551234"]);
        assert_eq!(contact_score(&lead.row(0).unwrap()), 0.0);
    }

    #[test]
    fn test_specialization() {
        let lead = one(&["cargo_carried"], &[""]);
        assert_eq!(specialization_score(&lead.row(0).unwrap()), 1.0);

        let lead = one(&["cargo_carried"], &["Refrigerated, Intermodal"]);
        assert_eq!(specialization_score(&lead.row(0).unwrap()), 3.0);

        let lead = one(&["cargo_carried"], &["HAZMAT; reefer; dairy; electronics"]);
        assert_eq!(specialization_score(&lead.row(0).unwrap()), 5.0);
    }

    #[test]
    fn test_recency_buckets() {
        let as_of = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let cases = [
            ("2024-06-01", 5.0),
            ("2024-05-02", 5.0),
            ("2024-05-01", 4.0),
            ("2024-03-03", 4.0),
            ("2023-06-02", 3.0),
            ("2022-06-02", 2.0),
            ("2020-01-01", 1.0),
            ("2024-07-01", 3.0),
            ("", 3.0),
            ("garbage", 3.0),
        ];
        for (date, expected) in cases {
            let t = one(&["add_date"], &[date]);
            assert_eq!(recency_score(&t.row(0).unwrap(), as_of), expected, "date {date}");
        }
    }
}
