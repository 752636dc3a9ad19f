//! Runtime configuration.
//!
//! [`Settings`] is built once at startup (defaults, optionally overlaid by a
//! JSON file and `FMCSA_DATA_DIR`) and handed to each component. The dataset
//! registry lives here too: URLs are data, not behaviour.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::PipelineError;
use crate::parser::fixed_width::{FieldSpec, load_layout};

/// On-disk container of a registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetFormat {
    Csv,
    Zip,
    Txt,
}

impl DatasetFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            DatasetFormat::Csv => "csv",
            DatasetFormat::Zip => "zip",
            DatasetFormat::Txt => "txt",
        }
    }
}

/// What a table contains, which decides the derivations applied to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    Census,
    Safety,
    Licensing,
    Inspections,
}

impl DatasetKind {
    /// Guesses the dataset kind from a file name.
    pub fn detect(file_name: &str) -> Option<Self> {
        let name = file_name.to_lowercase();
        if name.contains("census") || name.contains("registration") {
            Some(DatasetKind::Census)
        } else if name.contains("sms") || name.contains("safety") {
            Some(DatasetKind::Safety)
        } else if name.contains("inspection") {
            Some(DatasetKind::Inspections)
        } else if name.starts_with("li_") || name.contains("licens") || name.contains("authhist") {
            Some(DatasetKind::Licensing)
        } else {
            None
        }
    }
}

impl std::str::FromStr for DatasetKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "census" => Ok(DatasetKind::Census),
            "safety" | "sms" => Ok(DatasetKind::Safety),
            "licensing" | "li" => Ok(DatasetKind::Licensing),
            "inspections" | "inspection" => Ok(DatasetKind::Inspections),
            other => Err(PipelineError::UnknownDataset(other.to_string()).into()),
        }
    }
}

/// One entry of the dataset registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSpec {
    pub key: String,
    pub name: String,
    pub url: String,
    pub format: DatasetFormat,
    pub kind: DatasetKind,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadSettings {
    pub max_retries: u32,
    pub retry_delay_secs: u64,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub accept: String,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_secs: 5,
            timeout_secs: 300,
            user_agent: "FMCSA-Bulk-Data-Downloader/1.0".to_string(),
            accept: "text/csv,application/zip,text/plain,*/*".to_string(),
        }
    }
}

impl DownloadSettings {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Food-safety (FSMA) matching rules for inspection data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FsmaSettings {
    pub violation_codes: Vec<String>,
    pub keywords: Vec<String>,
}

impl Default for FsmaSettings {
    fn default() -> Self {
        Self {
            violation_codes: vec!["390.3".to_string()],
            keywords: [
                "food",
                "perishable",
                "refrigerated",
                "temperature",
                "sanitary",
                "contamination",
                "pest",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub raw_dir: PathBuf,
    pub processed_dir: PathBuf,
    pub fixed_width_batch_size: usize,
    /// JSON field layout for the fixed-width licensing extract.
    pub li_layout: Option<PathBuf>,
    pub download: DownloadSettings,
    pub fsma: FsmaSettings,
    pub datasets: Vec<DatasetSpec>,
}

/// On-disk shape of [`Settings`]. Directories left out are derived from
/// `data_dir`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SettingsFile {
    data_dir: Option<PathBuf>,
    raw_dir: Option<PathBuf>,
    processed_dir: Option<PathBuf>,
    fixed_width_batch_size: Option<usize>,
    li_layout: Option<PathBuf>,
    download: DownloadSettings,
    fsma: FsmaSettings,
    datasets: Option<Vec<DatasetSpec>>,
}

impl SettingsFile {
    fn resolve(self) -> Settings {
        let mut settings = Settings::with_data_dir(self.data_dir.unwrap_or_else(|| PathBuf::from("data")));
        if let Some(raw) = self.raw_dir {
            settings.raw_dir = raw;
        }
        if let Some(processed) = self.processed_dir {
            settings.processed_dir = processed;
        }
        if let Some(batch) = self.fixed_width_batch_size {
            settings.fixed_width_batch_size = batch;
        }
        if let Some(datasets) = self.datasets {
            settings.datasets = datasets;
        }
        settings.li_layout = self.li_layout;
        settings.download = self.download;
        settings.fsma = self.fsma;
        settings
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::with_data_dir(PathBuf::from("data"))
    }
}

impl Settings {
    /// Defaults rooted at `data_dir` (`raw/` and `processed/` beneath it).
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            raw_dir: data_dir.join("raw"),
            processed_dir: data_dir.join("processed"),
            data_dir,
            fixed_width_batch_size: 10_000,
            li_layout: None,
            download: DownloadSettings::default(),
            fsma: FsmaSettings::default(),
            datasets: default_registry(),
        }
    }

    /// Loads settings from an optional JSON file, then applies
    /// `FMCSA_DATA_DIR` if set. Missing keys keep their defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let content = match path {
            Some(path) => Some(
                std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?,
            ),
            None => None,
        };
        let data_dir = std::env::var("FMCSA_DATA_DIR")
            .ok()
            .filter(|d| !d.trim().is_empty())
            .map(PathBuf::from);

        Self::from_json(content.as_deref().unwrap_or("{}"), data_dir)
            .with_context(|| format!("parsing config {}", path.unwrap_or(Path::new("<defaults>")).display()))
    }

    /// Builds settings from JSON text. `data_dir_override` replaces the
    /// configured `data_dir`; `raw_dir` and `processed_dir` follow it unless
    /// they are set explicitly.
    pub fn from_json(content: &str, data_dir_override: Option<PathBuf>) -> Result<Self> {
        let mut file: SettingsFile = serde_json::from_str(content)?;
        if data_dir_override.is_some() {
            file.data_dir = data_dir_override;
        }
        Ok(file.resolve())
    }

    /// Field layout for fixed-width files of `kind`. Only licensing data has
    /// one, read from [`Settings::li_layout`].
    pub fn layout_for(&self, kind: DatasetKind) -> Result<Option<Vec<FieldSpec>>> {
        match (kind, &self.li_layout) {
            (DatasetKind::Licensing, Some(path)) => Ok(Some(load_layout(path)?)),
            _ => Ok(None),
        }
    }

    /// Creates the raw and processed directories.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.data_dir, &self.raw_dir, &self.processed_dir] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        Ok(())
    }

    pub fn dataset(&self, key: &str) -> Result<&DatasetSpec> {
        self.datasets
            .iter()
            .find(|d| d.key.eq_ignore_ascii_case(key))
            .ok_or_else(|| PipelineError::UnknownDataset(key.to_string()).into())
    }
}

/// API credentials read from the environment. Presence is the only check.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub openai_api_key: Option<String>,
    pub kalshi_api_key: Option<String>,
    pub fmcsa_web_key: Option<String>,
}

impl Credentials {
    pub fn from_env() -> Self {
        let read = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            openai_api_key: read("OPENAI_API_KEY"),
            kalshi_api_key: read("KALSHI_API_KEY"),
            fmcsa_web_key: read("FMCSA_WEB_KEY"),
        }
    }
}

/// The built-in registry of FMCSA bulk datasets.
pub fn default_registry() -> Vec<DatasetSpec> {
    vec![
        DatasetSpec {
            key: "MCMIS_CENSUS".into(),
            name: "Motor Carrier Registrations Census Files".into(),
            url: "https://data.transportation.gov/api/views/4a2k-zf79/rows.csv?accessType=DOWNLOAD"
                .into(),
            format: DatasetFormat::Csv,
            kind: DatasetKind::Census,
            description: "Registered carriers and brokers with DOT numbers, names, addresses and fleet sizes".into(),
        },
        DatasetSpec {
            key: "SMS_BULK".into(),
            name: "Safety Measurement System Bulk Data".into(),
            url: "https://ai.fmcsa.dot.gov/SMS/Tools/Index.aspx".into(),
            format: DatasetFormat::Zip,
            kind: DatasetKind::Safety,
            description: "BASIC scores, crash counts and inspection totals".into(),
        },
        DatasetSpec {
            key: "LI_PUBLIC".into(),
            name: "Licensing & Insurance Public Data".into(),
            url: "https://catalog.data.gov/dataset/authhist".into(),
            format: DatasetFormat::Txt,
            kind: DatasetKind::Licensing,
            description: "Authority, insurance and broker bond status".into(),
        },
        DatasetSpec {
            key: "INSPECTIONS".into(),
            name: "Motor Carrier Inspections".into(),
            url: "https://data.transportation.gov/api/views/3fs9-47s9/rows.csv?accessType=DOWNLOAD"
                .into(),
            format: DatasetFormat::Csv,
            kind: DatasetKind::Inspections,
            description: "Vehicle inspections including food safety violations (49 CFR 390.3)".into(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_dirs_are_under_data_dir() {
        let s = Settings::with_data_dir(PathBuf::from("/tmp/x"));
        assert_eq!(s.raw_dir, PathBuf::from("/tmp/x/raw"));
        assert_eq!(s.processed_dir, PathBuf::from("/tmp/x/processed"));
        assert_eq!(s.download.max_retries, 3);
    }

    #[test]
    fn test_dataset_lookup_is_case_insensitive() {
        let s = Settings::default();
        assert_eq!(s.dataset("mcmis_census").unwrap().kind, DatasetKind::Census);
        let err = s.dataset("nope").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::UnknownDataset(_))
        ));
    }

    #[test]
    fn test_load_partial_json_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"download": {{"max_retries": 7}}}}"#).unwrap();

        let s = Settings::load(Some(file.path())).unwrap();
        assert_eq!(s.download.max_retries, 7);
        assert_eq!(s.download.retry_delay_secs, 5);
        assert_eq!(s.datasets.len(), 4);
    }

    #[test]
    fn test_configured_data_dir_roots_subdirectories() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"data_dir": "/srv/fmcsa"}}"#).unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        let s = Settings::from_json(&content, None).unwrap();
        assert_eq!(s.data_dir, PathBuf::from("/srv/fmcsa"));
        assert_eq!(s.raw_dir, PathBuf::from("/srv/fmcsa/raw"));
        assert_eq!(s.processed_dir, PathBuf::from("/srv/fmcsa/processed"));
    }

    #[test]
    fn test_explicit_subdirectory_survives_override() {
        let s = Settings::from_json(
            r#"{"data_dir": "/a", "raw_dir": "/mnt/raw"}"#,
            Some(PathBuf::from("/b")),
        )
        .unwrap();
        assert_eq!(s.data_dir, PathBuf::from("/b"));
        assert_eq!(s.raw_dir, PathBuf::from("/mnt/raw"));
        assert_eq!(s.processed_dir, PathBuf::from("/b/processed"));
        assert_eq!(s.datasets.len(), 4);
    }

    #[test]
    fn test_layout_only_for_licensing() {
        let mut layout = tempfile::NamedTempFile::new().unwrap();
        write!(layout, r#"[{{"name": "dot_number", "start": 0, "length": 8}}]"#).unwrap();

        let mut s = Settings::default();
        assert!(s.layout_for(DatasetKind::Licensing).unwrap().is_none());

        s.li_layout = Some(layout.path().to_path_buf());
        let fields = s.layout_for(DatasetKind::Licensing).unwrap().unwrap();
        assert_eq!(fields[0].name, "dot_number");
        assert!(s.layout_for(DatasetKind::Census).unwrap().is_none());
    }

    #[test]
    fn test_detect_kind_from_file_name() {
        assert_eq!(DatasetKind::detect("mcmis_census_20240101.csv"), Some(DatasetKind::Census));
        assert_eq!(DatasetKind::detect("SMS_input.csv"), Some(DatasetKind::Safety));
        assert_eq!(DatasetKind::detect("inspections_2024.csv"), Some(DatasetKind::Inspections));
        assert_eq!(DatasetKind::detect("li_public_1.txt"), Some(DatasetKind::Licensing));
        assert_eq!(DatasetKind::detect("random.csv"), None);
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("SMS".parse::<DatasetKind>().unwrap(), DatasetKind::Safety);
        assert!("foo".parse::<DatasetKind>().is_err());
    }
}
