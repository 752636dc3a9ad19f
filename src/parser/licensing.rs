//! Licensing & insurance (L&I) records.

use crate::table::Table;

/// Columns the scorer reads from licensing data.
pub const LICENSING_COLUMNS: &[&str] = &["authority_status", "bond_status", "bond_amount"];

/// Trims `dot_number` and strips thousands separators and `$` from
/// `bond_amount` so it parses as a number.
pub fn clean(mut table: Table) -> Table {
    table.map_column("dot_number", |v| v.trim().to_string());
    table.map_column("bond_amount", |v| {
        v.trim().chars().filter(|c| *c != ',' && *c != '$').collect()
    });
    table
}
