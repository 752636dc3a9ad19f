use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

use crate::services::carrier_api::{CarrierApi, CarrierProfile};
use fmcsa_leads::fetch::{HttpClient, fetch_json};
use fmcsa_leads::validate::validate_dot_number;

pub const QCMOBILE_BASE_URL: &str = "https://mobile.fmcsa.dot.gov/qc/services";

#[derive(Deserialize)]
struct CarrierEnvelope {
    content: Option<CarrierContent>,
}

#[derive(Deserialize)]
struct CarrierContent {
    carrier: Option<CarrierProfile>,
}

/// QCMobile carrier lookups. Expects `http` to append the `webKey` parameter.
pub struct QcMobileClient {
    http: Box<dyn HttpClient>,
    base_url: String,
}

impl QcMobileClient {
    pub fn new(http: Box<dyn HttpClient>) -> Self {
        Self::with_base_url(http, QCMOBILE_BASE_URL)
    }

    pub fn with_base_url(http: Box<dyn HttpClient>, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl CarrierApi for QcMobileClient {
    async fn carrier(&self, dot_number: &str) -> Result<CarrierProfile> {
        let dot = dot_number.trim();
        if !validate_dot_number(dot) {
            anyhow::bail!("invalid DOT number '{dot}'");
        }
        let url = format!("{}/carriers/{}", self.base_url, dot);
        let envelope: CarrierEnvelope = fetch_json(&*self.http, &url).await?;
        envelope
            .content
            .and_then(|c| c.carrier)
            .ok_or_else(|| anyhow::anyhow!("no carrier found for DOT {dot}"))
    }
}
