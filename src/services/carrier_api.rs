//! Trait and types for per-carrier lookups by DOT number.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

/// Pause between consecutive lookups in [`lookup_many`].
pub const LOOKUP_DELAY: Duration = Duration::from_millis(100);

/// Carrier snapshot as reported by the lookup service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CarrierProfile {
    pub dot_number: Option<u64>,
    pub legal_name: Option<String>,
    pub dba_name: Option<String>,
    pub allowed_to_operate: Option<String>,
    pub safety_rating: Option<String>,
    pub total_power_units: Option<u64>,
    pub total_drivers: Option<u64>,
    pub phy_city: Option<String>,
    pub phy_state: Option<String>,
}

#[async_trait::async_trait]
pub trait CarrierApi {
    async fn carrier(&self, dot_number: &str) -> Result<CarrierProfile>;
}

/// Looks up each DOT number in turn, pausing `delay` between requests.
/// A failed lookup is recorded and the batch continues.
pub async fn lookup_many<A: CarrierApi + Sync>(
    api: &A,
    dot_numbers: &[String],
    delay: Duration,
) -> Vec<(String, Result<CarrierProfile>)> {
    let mut results = Vec::with_capacity(dot_numbers.len());
    for (i, dot) in dot_numbers.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(delay).await;
        }
        let result = api.carrier(dot).await;
        match &result {
            Ok(profile) => info!(dot_number = %dot, name = ?profile.legal_name, "Carrier found"),
            Err(e) => warn!(dot_number = %dot, error = %e, "Carrier lookup failed"),
        }
        results.push((dot.clone(), result));
    }
    results
}
