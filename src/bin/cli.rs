use anyhow::{Context, Result};
use colored::*;
use holdings::{
    core::IngestConfig,
    edgar::{read_index, utils::HttpSource, ReportType},
    fetch::{resolve_filings, FetchManager, IngestSummary},
    storage::{HoldingsStorage, SqliteConfig, SqliteStorage},
    utils::progress::ProgressTracker,
};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use structopt::StructOpt;
use url::Url;

#[derive(StructOpt, Debug)]
#[structopt(name = "holdings-cli", about = "Ingest 13F holdings listed in an EDGAR master index")]
struct Opt {
    /// Index file to read (overrides HOLDINGS_INDEX)
    #[structopt(short, long, parse(from_os_str))]
    index: Option<PathBuf>,

    /// SQLite database to write (overrides HOLDINGS_DB)
    #[structopt(short, long, parse(from_os_str))]
    db: Option<PathBuf>,

    /// Form type to keep, one of the 13F codes or any exact index code
    #[structopt(short, long)]
    form: Option<String>,

    /// Pause between filings in milliseconds
    #[structopt(long)]
    delay_ms: Option<u64>,

    /// Conventional document name probed before the filing listing
    #[structopt(long)]
    direct_document: Option<String>,

    #[structopt(long)]
    user_agent: Option<String>,

    #[structopt(long)]
    archives_url: Option<Url>,

    /// Disable the progress bar
    #[structopt(long)]
    no_progress: bool,

    /// Print the run summary as JSON
    #[structopt(long)]
    json: bool,
}

impl Opt {
    fn apply(self, mut config: IngestConfig) -> Result<IngestConfig> {
        if let Some(index) = self.index {
            config.index_path = index;
        }
        if let Some(db) = self.db {
            config.database_path = db;
        }
        if let Some(form) = self.form {
            config.form_type = ReportType::from_str(&form).map_err(|e| {
                anyhow::anyhow!("invalid form type ({}); known types: {}", e, ReportType::list_types())
            })?;
        }
        if let Some(ms) = self.delay_ms {
            config.delay = Duration::from_millis(ms);
        }
        if let Some(name) = self.direct_document {
            config.direct_document = Some(name).filter(|n| !n.trim().is_empty());
        }
        if let Some(user_agent) = self.user_agent {
            config.user_agent = user_agent;
        }
        if let Some(url) = self.archives_url {
            config.archives_url = url;
        }
        Ok(config)
    }
}

fn print_summary(summary: &IngestSummary) {
    println!(
        "{} {} of {} filings stored",
        "Done:".green().bold(),
        summary.filings_stored.to_string().bold(),
        summary.filings_seen
    );
    println!(
        "  holdings inserted: {}, failed: {}, incomplete entries: {}",
        summary.holdings_inserted.to_string().cyan(),
        summary.holdings_failed,
        summary.entries_incomplete
    );
    for (kind, count) in &summary.filings_skipped {
        println!("  {} {}: {}", "skipped".yellow(), kind, count);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::debug!("Logger initialized");

    let opt = Opt::from_args();
    let no_progress = opt.no_progress;
    let json = opt.json;
    let config = opt.apply(IngestConfig::from_env()?)?;
    log::debug!("Config: {:?}", config);

    let records = read_index(&config.index_path, &config.form_type)?;
    log::info!(
        "{} {} filings listed in {}",
        records.len(),
        config.form_type,
        config.index_path.display()
    );
    let filings = resolve_filings(&config.resolver(), &records);

    let source = HttpSource::new(&config.user_agent).context("building HTTP client")?;
    let storage = SqliteStorage::new(SqliteConfig {
        path: config.database_path.clone(),
    })
    .await?;

    let tracker = if no_progress {
        ProgressTracker::hidden()
    } else {
        ProgressTracker::new(filings.len() as u64)
    };
    let mut manager = FetchManager::new(source, storage, config.rate_limiter()).with_progress(tracker);

    let result = manager.run(&filings).await;
    manager.into_storage().close().await;
    let summary = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}
