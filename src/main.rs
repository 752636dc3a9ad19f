//! CLI entry point for the FMCSA lead toolkit.
//!
//! Provides subcommands for downloading and processing FMCSA bulk data,
//! scoring and filtering carrier leads, looking up individual carriers, and
//! scanning prediction markets for arbitrage.

mod infra;
mod services;

use crate::infra::fmcsa::client::QcMobileClient;
use crate::infra::kalshi::client::KalshiClient;
use crate::infra::openai::client::OpenAiTagGenerator;
use crate::services::carrier_api::{LOOKUP_DELAY, lookup_many};
use crate::services::market_api::MarketApi;
use crate::services::tag_generator::TagGenerator;
use anyhow::{Context, Result};
use chrono::Local;
use clap::{CommandFactory, Parser, Subcommand};
use fmcsa_leads::arbitrage::ArbitrageDetector;
use fmcsa_leads::arbitrage::tags::or_default_tags;
use fmcsa_leads::config::{Credentials, DatasetFormat, DatasetKind, Settings};
use fmcsa_leads::error::PipelineError;
use fmcsa_leads::fetch::archive::extract_archive;
use fmcsa_leads::fetch::auth::{ApiKey, UrlParam};
use fmcsa_leads::fetch::{BasicClient, Downloader, HttpClient};
use fmcsa_leads::filter::{LeadFilter, restrict_to_dot_numbers};
use fmcsa_leads::merge::merge_datasets;
use fmcsa_leads::output::{
    ExportFormat, export_outreach, print_json, print_pretty, timestamped_path, write_table,
};
use fmcsa_leads::parser::census::{
    contact_info, filter_brokers, filter_carriers, find_new_companies,
};
use fmcsa_leads::parser::fixed_width::load_layout;
use fmcsa_leads::parser::process_file;
use fmcsa_leads::parser::safety::high_risk_carriers;
use fmcsa_leads::scoring::{DEFAULT_TOP_LEADS, LeadScorer, lead_report, summary};
use fmcsa_leads::table::Table;
use fmcsa_leads::validate::validate;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const MARKET_LIMIT: usize = 500;

#[derive(Parser)]
#[command(name = "fmcsa_leads")]
#[command(about = "FMCSA carrier lead scoring and prediction-market arbitrage", long_about = None)]
struct Cli {
    /// JSON settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Fixed-width layout (JSON) for licensing .txt files
    #[arg(long, global = true, value_name = "FILE")]
    li_layout: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the dataset registry
    Datasets,
    /// Download registry datasets into the raw directory
    Download {
        /// Registry key to download (repeatable, default: all)
        #[arg(short, long = "dataset", value_name = "KEY")]
        datasets: Vec<String>,

        /// Parse and clean each downloaded file into the processed directory
        #[arg(long, default_value_t = false)]
        process: bool,
    },
    /// Parse and clean one dataset file
    Process {
        /// census, safety, inspections or licensing
        kind: DatasetKind,

        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Fixed-width layout (JSON) for .txt files, overriding --li-layout
        #[arg(long)]
        layout: Option<PathBuf>,
    },
    /// Join safety and inspection data onto a census file
    Merge {
        #[arg(long)]
        census: PathBuf,

        #[arg(long)]
        safety: Option<PathBuf>,

        #[arg(long)]
        inspections: Option<PathBuf>,
    },
    /// Score census carriers as sales leads and export them
    Score {
        #[arg(long)]
        census: PathBuf,

        /// SMS safety data for enrichment
        #[arg(long)]
        sms: Option<PathBuf>,

        /// Licensing & insurance data for enrichment
        #[arg(long)]
        li: Option<PathBuf>,

        /// Maximum number of top leads to export
        #[arg(long, default_value_t = DEFAULT_TOP_LEADS)]
        top: usize,

        /// Export format: csv, csv.gz or json (repeatable)
        #[arg(short, long = "format", default_value = "csv")]
        formats: Vec<ExportFormat>,
    },
    /// Filter census carriers by region, fleet size and equipment
    Filter {
        #[arg(long)]
        census: PathBuf,

        /// Two-letter state code (repeatable)
        #[arg(long = "state")]
        states: Vec<String>,

        #[arg(long)]
        min_fleet: Option<f64>,

        /// Equipment keyword (repeatable)
        #[arg(long)]
        equipment: Vec<String>,

        /// City name substring
        #[arg(long)]
        city: Option<String>,

        /// Keep carriers registered within this many days
        #[arg(long, value_name = "DAYS")]
        new_since_days: Option<i64>,

        /// SMS safety data used by --high-risk
        #[arg(long, requires = "high_risk")]
        sms: Option<PathBuf>,

        /// Keep carriers whose SMS score or rating is at least this value
        #[arg(long, value_name = "THRESHOLD", requires = "sms")]
        high_risk: Option<f64>,

        /// Reduce output to contact columns with email and phone checks
        #[arg(long, conflicts_with = "score")]
        contacts_only: bool,

        /// Score the filtered carriers and print a lead report
        #[arg(long)]
        score: bool,

        /// Keep only brokers
        #[arg(long, conflicts_with = "carriers")]
        brokers: bool,

        /// Keep only carriers
        #[arg(long)]
        carriers: bool,

        #[arg(short, long, default_value = "csv")]
        format: ExportFormat,
    },
    /// Look up carriers by DOT number via QCMobile
    Lookup {
        #[arg(value_name = "DOT", required = true)]
        dot_numbers: Vec<String>,
    },
    /// Scan prediction markets for correlated-pair arbitrage
    Arbitrage {
        /// Free-text steer for tag generation
        #[arg(long, default_value = "")]
        context: String,

        #[arg(long, default_value_t = 10)]
        num_tags: usize,

        /// Maximum opportunities to report
        #[arg(long, default_value_t = 10)]
        max: usize,

        /// Minimum correlation for a pair
        #[arg(long, default_value_t = 0.6)]
        threshold: f64,

        /// Do not query the series listing
        #[arg(long, default_value_t = false)]
        skip_series: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/fmcsa_leads.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("fmcsa_leads.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(layout) = cli.li_layout {
        settings.li_layout = Some(layout);
    }
    let credentials = Credentials::from_env();

    match command {
        Commands::Datasets => {
            for spec in &settings.datasets {
                info!(
                    key = %spec.key,
                    name = %spec.name,
                    format = spec.format.extension(),
                    kind = ?spec.kind,
                    url = %spec.url,
                    "Dataset"
                );
            }
            info!(total = settings.datasets.len(), "Dataset registry");
        }
        Commands::Download { datasets, process } => {
            download(&settings, &datasets, process).await?;
        }
        Commands::Process { kind, file, layout } => {
            let layout = match layout {
                Some(path) => Some(load_layout(&path)?),
                None => settings.layout_for(kind)?,
            };
            let table = process_file(
                &file,
                kind,
                layout.as_deref(),
                settings.fixed_width_batch_size,
                &settings.fsma,
            )?;
            let stem = file
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("dataset");
            let path = timestamped_path(
                &settings.processed_dir,
                &format!("{stem}_processed"),
                ExportFormat::Csv,
            );
            write_table(&table, &path, ExportFormat::Csv)?;
            info!(path = %path.display(), rows = table.len(), "Processed file written");
        }
        Commands::Merge {
            census,
            safety,
            inspections,
        } => {
            let census = load(&settings, &census, DatasetKind::Census)?;
            let safety = load_optional(&settings, safety.as_deref(), DatasetKind::Safety)?;
            let inspections = parse_optional(&settings, inspections.as_deref())?;

            let merged = merge_datasets(
                &census,
                safety.as_ref(),
                inspections.as_ref(),
                &settings.fsma,
            )?;
            let path = timestamped_path(&settings.processed_dir, "merged", ExportFormat::Csv);
            write_table(&merged, &path, ExportFormat::Csv)?;
            info!(path = %path.display(), rows = merged.len(), "Merged dataset written");
        }
        Commands::Score {
            census,
            sms,
            li,
            top,
            formats,
        } => {
            let census = load(&settings, &census, DatasetKind::Census)?;
            let sms = load_optional(&settings, sms.as_deref(), DatasetKind::Safety)?;
            let li = load_optional(&settings, li.as_deref(), DatasetKind::Licensing)?;

            let report = validate(&census);
            if !report.is_clean() {
                warn!(warnings = report.warnings.len(), "Census has data quality warnings");
            }

            let scorer = LeadScorer::new(Local::now().date_naive());
            let leads = scorer.score(&census, sms.as_ref(), li.as_ref())?;

            let scored = scorer.to_table(&census, &leads);
            for path in export_outreach(&scored, &settings.processed_dir, "scored_leads", &formats)? {
                info!(path = %path.display(), "Scored leads exported");
            }

            let top_table = scorer.top_leads_table(&census, &leads, top);
            for path in export_outreach(&top_table, &settings.processed_dir, "top_leads", &formats)? {
                info!(path = %path.display(), leads = top_table.len(), "Top leads exported");
            }

            let summary = summary(&leads);
            print_pretty(&summary);
            print_json(&summary)?;
            print_json(&lead_report(&scored))?;
        }
        Commands::Filter {
            census,
            states,
            min_fleet,
            equipment,
            city,
            new_since_days,
            sms,
            high_risk,
            contacts_only,
            score,
            brokers,
            carriers,
            format,
        } => {
            let census = load(&settings, &census, DatasetKind::Census)?;
            let filter = LeadFilter {
                states,
                min_fleet_size: min_fleet,
                equipment,
                city,
            };
            let mut filtered = filter.apply(&census);
            if brokers {
                filtered = filter_brokers(&filtered);
            } else if carriers {
                filtered = filter_carriers(&filtered);
            }
            if let Some(days) = new_since_days {
                filtered = find_new_companies(&filtered, days, Local::now().date_naive());
            }
            if let (Some(sms), Some(threshold)) = (sms.as_deref(), high_risk) {
                let sms = load(&settings, sms, DatasetKind::Safety)?;
                filtered = restrict_to_dot_numbers(&filtered, &high_risk_carriers(&sms, threshold));
            }

            if score {
                let scorer = LeadScorer::new(Local::now().date_naive());
                let leads = scorer.score(&filtered, None, None)?;
                let scored = scorer.to_table(&filtered, &leads);
                for path in export_outreach(&scored, &settings.processed_dir, "filtered_scored_leads", &[format])? {
                    info!(path = %path.display(), leads = scored.len(), "Filtered leads scored");
                }
                print_json(&lead_report(&scored))?;
                return Ok(());
            }
            if contacts_only {
                filtered = contact_info(&filtered);
            }

            let path = timestamped_path(&settings.processed_dir, "filtered_leads", format);
            write_table(&filtered, &path, format)?;
            info!(path = %path.display(), rows = filtered.len(), "Filtered leads written");
        }
        Commands::Lookup { dot_numbers } => {
            let key = credentials
                .fmcsa_web_key
                .ok_or(PipelineError::MissingCredential("FMCSA_WEB_KEY"))?;
            let http = UrlParam::new(BasicClient::new(), "webKey", &key);
            let client = QcMobileClient::new(Box::new(http));

            let results = lookup_many(&client, &dot_numbers, LOOKUP_DELAY).await;
            let found: Vec<_> = results
                .iter()
                .filter_map(|(_, r)| r.as_ref().ok())
                .collect();
            print_json(&found)?;
            info!(
                requested = dot_numbers.len(),
                found = found.len(),
                "Carrier lookup finished"
            );
        }
        Commands::Arbitrage {
            context,
            num_tags,
            max,
            threshold,
            skip_series,
        } => {
            arbitrage(&credentials, &context, num_tags, max, threshold, skip_series).await?;
        }
    }

    Ok(())
}

/// Parses and cleans `path` as `kind`. Licensing `.txt` files use the
/// configured layout.
fn load(settings: &Settings, path: &Path, kind: DatasetKind) -> Result<Table> {
    let layout = settings.layout_for(kind)?;
    process_file(
        path,
        kind,
        layout.as_deref(),
        settings.fixed_width_batch_size,
        &settings.fsma,
    )
    .with_context(|| format!("loading {}", path.display()))
}

fn load_optional(settings: &Settings, path: Option<&Path>, kind: DatasetKind) -> Result<Option<Table>> {
    path.map(|p| load(settings, p, kind)).transpose()
}

/// Inspections are merged raw: the merge derives its own food-safety subset.
fn parse_optional(settings: &Settings, path: Option<&Path>) -> Result<Option<Table>> {
    path.map(|p| {
        fmcsa_leads::parser::parse_file(p, None, settings.fixed_width_batch_size)
            .with_context(|| format!("loading {}", p.display()))
    })
    .transpose()
}

/// Downloads the selected registry entries (all when `keys` is empty),
/// extracts archives and optionally processes each data file. Failures of
/// single datasets are logged and skipped.
#[tracing::instrument(skip_all, fields(keys = ?keys, process))]
async fn download(settings: &Settings, keys: &[String], process: bool) -> Result<()> {
    settings.ensure_dirs()?;

    let specs = if keys.is_empty() {
        settings.datasets.clone()
    } else {
        keys.iter()
            .map(|k| settings.dataset(k).cloned())
            .collect::<Result<Vec<_>>>()?
    };

    let client = BasicClient::with_settings(&settings.download)?;
    let downloader = Downloader::new(client, settings.download.clone(), settings.raw_dir.clone());
    let report = downloader.download_all(&specs).await;

    for (key, path) in report.downloaded() {
        let Ok(spec) = settings.dataset(key) else {
            continue;
        };

        let files = if spec.format == DatasetFormat::Zip {
            let dest = settings.raw_dir.join(key.to_lowercase());
            match extract_archive(path, &dest) {
                Ok(files) => files,
                Err(e) => {
                    error!(dataset = %key, error = %e, "Archive extraction failed");
                    continue;
                }
            }
        } else {
            vec![path.to_path_buf()]
        };

        if !process {
            continue;
        }

        for file in files {
            let name = file.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            let kind = DatasetKind::detect(name).unwrap_or(spec.kind);
            let layout = match settings.layout_for(kind) {
                Ok(layout) => layout,
                Err(e) => {
                    warn!(file = %file.display(), error = %e, "Skipping file");
                    continue;
                }
            };
            let table = match process_file(
                &file,
                kind,
                layout.as_deref(),
                settings.fixed_width_batch_size,
                &settings.fsma,
            ) {
                Ok(table) => table,
                Err(e) => {
                    warn!(file = %file.display(), error = %e, "Skipping file");
                    continue;
                }
            };
            let stem = file.file_stem().and_then(|s| s.to_str()).unwrap_or(key);
            let out = timestamped_path(
                &settings.processed_dir,
                &format!("{stem}_processed"),
                ExportFormat::Csv,
            );
            if let Err(e) = write_table(&table, &out, ExportFormat::Csv) {
                error!(file = %file.display(), error = %e, "Failed to write processed file");
            }
        }
    }

    let failed: Vec<_> = report.failed().map(|(key, _)| key).collect();
    if !failed.is_empty() {
        warn!(failed = ?failed, "Some datasets could not be downloaded");
    }
    Ok(())
}

/// Generates search tags, fetches active markets and reports the best
/// arbitrage opportunities.
#[tracing::instrument(skip(credentials))]
async fn arbitrage(
    credentials: &Credentials,
    context: &str,
    num_tags: usize,
    max: usize,
    threshold: f64,
    skip_series: bool,
) -> Result<()> {
    let openai_key = credentials
        .openai_api_key
        .as_deref()
        .ok_or(PipelineError::MissingCredential("OPENAI_API_KEY"))?;
    let generator = OpenAiTagGenerator::new(Box::new(ApiKey::bearer(BasicClient::new(), openai_key)?));

    let market_http: Box<dyn HttpClient> = match credentials.kalshi_api_key.as_deref() {
        Some(key) => Box::new(ApiKey::bearer(BasicClient::new(), key)?),
        None => Box::new(BasicClient::new()),
    };
    let markets_api = KalshiClient::new(market_http);

    let tags = match generator.generate_tags(context, num_tags).await {
        Ok(tags) => or_default_tags(tags),
        Err(e) => {
            warn!(error = %e, "Tag generation failed, using default tags");
            or_default_tags(Vec::new())
        }
    };
    info!(tags = ?tags, "Search tags");

    if !skip_series {
        match markets_api.list_series().await {
            Ok(series) => info!(series, "Market series listed"),
            Err(e) => warn!(error = %e, "Series listing failed"),
        }
    }

    let markets = markets_api.list_markets(MARKET_LIMIT).await?;
    info!(markets = markets.len(), "Active markets fetched");

    let detector = ArbitrageDetector {
        threshold,
        max_opportunities: max,
    };
    let opportunities = detector.detect(&markets, &tags);

    if opportunities.is_empty() {
        info!("No arbitrage opportunities found.");
        return Ok(());
    }
    for (i, opportunity) in opportunities.iter().enumerate() {
        info!("\n{}", opportunity.report(i + 1));
    }
    Ok(())
}
