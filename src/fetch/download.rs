//! Bulk dataset downloads with bounded retry.

use anyhow::Result;
use chrono::Local;
use flate2::read::GzDecoder;
use reqwest::header::{ACCEPT, ACCEPT_ENCODING, CONTENT_ENCODING, HeaderValue, USER_AGENT};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

use super::client::HttpClient;
use crate::config::{DatasetSpec, DownloadSettings};
use crate::error::PipelineError;

/// Outcome of one registry entry in [`Downloader::download_all`].
#[derive(Debug)]
pub enum DownloadOutcome {
    Downloaded { key: String, path: PathBuf },
    Failed { key: String, error: String },
}

#[derive(Debug, Default)]
pub struct DownloadReport {
    pub outcomes: Vec<DownloadOutcome>,
}

impl DownloadReport {
    pub fn downloaded(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.outcomes.iter().filter_map(|o| match o {
            DownloadOutcome::Downloaded { key, path } => Some((key.as_str(), path.as_path())),
            DownloadOutcome::Failed { .. } => None,
        })
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &str)> {
        self.outcomes.iter().filter_map(|o| match o {
            DownloadOutcome::Failed { key, error } => Some((key.as_str(), error.as_str())),
            DownloadOutcome::Downloaded { .. } => None,
        })
    }
}

fn transport(url: &str, err: impl ToString) -> anyhow::Error {
    PipelineError::Transport {
        url: url.to_string(),
        message: err.to_string(),
    }
    .into()
}

fn is_transient(err: &anyhow::Error) -> bool {
    err.downcast_ref::<PipelineError>()
        .is_some_and(PipelineError::is_transient)
}

/// Delay before retrying after failed attempt `attempt` (0-based).
pub fn backoff(base: Duration, attempt: u32) -> Duration {
    2u32.checked_pow(attempt)
        .and_then(|factor| base.checked_mul(factor))
        .unwrap_or(Duration::MAX)
}

/// `<key lowercase>_<YYYYmmdd_HHMMSS>.<ext>`
pub fn dataset_file_name(spec: &DatasetSpec, stamp: &str) -> String {
    format!("{}_{}.{}", spec.key.to_lowercase(), stamp, spec.format.extension())
}

pub struct Downloader<C> {
    client: C,
    settings: DownloadSettings,
    raw_dir: PathBuf,
}

impl<C: HttpClient> Downloader<C> {
    pub fn new(client: C, settings: DownloadSettings, raw_dir: PathBuf) -> Self {
        Self {
            client,
            settings,
            raw_dir,
        }
    }

    /// Downloads one registry entry into the raw directory.
    #[tracing::instrument(skip(self, spec), fields(dataset = %spec.key))]
    pub async fn download(&self, spec: &DatasetSpec) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.raw_dir)?;
        let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let path = self.raw_dir.join(dataset_file_name(spec, &stamp));
        self.download_to(&spec.url, &path).await?;
        Ok(path)
    }

    /// Fetches `url` into `path`, retrying transport failures with
    /// exponential backoff. Other failures are returned immediately.
    pub async fn download_to(&self, url: &str, path: &Path) -> Result<()> {
        let attempts = self.settings.max_retries.max(1);
        let mut last_error = String::new();

        for attempt in 0..attempts {
            info!(url, attempt = attempt + 1, attempts, "Downloading");
            match self.attempt(url, path).await {
                Ok(bytes) => {
                    info!(url, path = %path.display(), bytes, "Download complete");
                    return Ok(());
                }
                Err(e) if is_transient(&e) => {
                    warn!(url, attempt = attempt + 1, error = %e, "Download attempt failed");
                    last_error = e.to_string();
                    if attempt + 1 < attempts {
                        tokio::time::sleep(backoff(self.settings.retry_delay(), attempt)).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }

        error!(url, attempts, "All download attempts failed");
        Err(PipelineError::RetriesExhausted {
            url: url.to_string(),
            attempts,
            message: last_error,
        }
        .into())
    }

    async fn attempt(&self, url: &str, path: &Path) -> Result<u64> {
        let mut req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);
        let headers = req.headers_mut();
        headers.insert(USER_AGENT, HeaderValue::from_str(&self.settings.user_agent)?);
        headers.insert(ACCEPT, HeaderValue::from_str(&self.settings.accept)?);
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip, deflate"));

        let resp = self
            .client
            .execute(req)
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| transport(url, e))?;

        let gzipped = resp
            .headers()
            .get(CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("gzip"));

        if gzipped {
            let body = resp.bytes().await.map_err(|e| transport(url, e))?;
            let mut decoded = Vec::new();
            GzDecoder::new(body.as_ref())
                .read_to_end(&mut decoded)
                .map_err(|e| PipelineError::parse(url, e))?;
            std::fs::write(path, &decoded)?;
            return Ok(decoded.len() as u64);
        }

        let mut resp = resp;
        let mut file = File::create(path)?;
        let mut written = 0u64;
        while let Some(chunk) = resp.chunk().await.map_err(|e| transport(url, e))? {
            file.write_all(&chunk)?;
            written += chunk.len() as u64;
        }
        file.flush()?;
        Ok(written)
    }

    /// Downloads every entry in order. A failure is recorded for that entry
    /// and the rest continue.
    pub async fn download_all(&self, specs: &[DatasetSpec]) -> DownloadReport {
        let mut report = DownloadReport::default();
        for spec in specs {
            let outcome = match self.download(spec).await {
                Ok(path) => DownloadOutcome::Downloaded {
                    key: spec.key.clone(),
                    path,
                },
                Err(e) => {
                    error!(dataset = %spec.key, error = %e, "Dataset download failed");
                    DownloadOutcome::Failed {
                        key: spec.key.clone(),
                        error: e.to_string(),
                    }
                }
            };
            report.outcomes.push(outcome);
        }
        info!(
            downloaded = report.downloaded().count(),
            failed = report.failed().count(),
            "Download run finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DatasetFormat, DatasetKind};

    #[test]
    fn test_backoff_doubles() {
        let base = Duration::from_secs(5);
        assert_eq!(backoff(base, 0), Duration::from_secs(5));
        assert_eq!(backoff(base, 1), Duration::from_secs(10));
        assert_eq!(backoff(base, 2), Duration::from_secs(20));
        assert_eq!(backoff(base, 40), Duration::MAX);
    }

    #[test]
    fn test_file_name() {
        let spec = DatasetSpec {
            key: "SMS_BULK".into(),
            name: String::new(),
            url: String::new(),
            format: DatasetFormat::Zip,
            kind: DatasetKind::Safety,
            description: String::new(),
        };
        assert_eq!(dataset_file_name(&spec, "20240101_120000"), "sms_bulk_20240101_120000.zip");
    }
}
