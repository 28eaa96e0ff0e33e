/// Command line entry point for the price analytics core
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use pricecorr::{
    config::load_config_or_default,
    data::seed_demo_data,
    error::PriceError,
    store::{spawn_expiry_sweeper, JournalSampleStore, MemorySampleStore, SampleStore},
    time::{delta, Clock, SystemClock},
    utils::init_logging,
    Config, PriceService,
};

#[derive(Parser)]
#[command(
    name = "pricecorr",
    version,
    about = "Windowed price history, averages and cross-ticker correlation",
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Insert the demo samples (NVDA, GOOGL, PYPL)
    Seed,
    /// Record one price
    Ingest {
        #[arg(long)]
        ticker: String,
        #[arg(long, allow_negative_numbers = true)]
        price: f64,
        /// RFC 3339 timestamp, defaults to now
        #[arg(long)]
        observed_at: Option<DateTime<Utc>>,
    },
    /// Print the samples of a ticker within the window
    History {
        #[arg(long)]
        ticker: String,
        #[arg(long)]
        minutes: Option<i64>,
    },
    /// Aggregate one ticker over the window
    Average {
        #[arg(long)]
        ticker: String,
        #[arg(long)]
        minutes: Option<i64>,
        #[arg(long, default_value = "average")]
        aggregation: String,
    },
    /// Correlate two tickers over the window
    Correlate {
        /// Pass exactly twice
        #[arg(long = "ticker", required = true)]
        tickers: Vec<String>,
        #[arg(long)]
        minutes: Option<i64>,
        /// Overrides the configured alignment tolerance
        #[arg(long)]
        tolerance_secs: Option<i64>,
    },
    /// Remove expired samples now
    Sweep,
    /// Rewrite the journal with live samples only
    Compact,
    /// Ingest JSON lines from stdin until EOF or Ctrl+C, sweeping in the background
    Run,
}

const FEED_RETRY_DELAY: std::time::Duration = std::time::Duration::from_millis(500);

/// One line of the stdin feed
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedLine {
    ticker: String,
    price: f64,
    observed_at: Option<DateTime<Utc>>,
}

/// Application state
struct PriceApp {
    config: Config,
    clock: Arc<dyn Clock>,
    store: Arc<dyn SampleStore>,
    journal: Option<Arc<JournalSampleStore>>,
    service: PriceService,
}

impl PriceApp {
    async fn new(config_path: &str) -> anyhow::Result<Self> {
        let config = load_config_or_default(config_path)?;
        init_logging(&config.log_level, config.log_json)?;

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let (store, journal): (Arc<dyn SampleStore>, Option<Arc<JournalSampleStore>>) =
            match &config.journal_path {
                Some(path) => {
                    let journal = Arc::new(JournalSampleStore::open(path, clock.now()).await?);
                    let store: Arc<dyn SampleStore> = journal.clone();
                    (store, Some(journal))
                }
                None => {
                    let store: Arc<dyn SampleStore> = Arc::new(MemorySampleStore::new());
                    (store, None)
                }
            };
        info!("Using {} sample store", store.backend_type());

        let service = PriceService::new(Arc::clone(&store), Arc::clone(&clock), &config)?;

        if config.seed_on_startup {
            seed_demo_data(&service).await?;
        }

        Ok(PriceApp {
            config,
            clock,
            store,
            journal,
            service,
        })
    }

    fn window(&self, minutes: Option<i64>) -> pricecorr::Result<Duration> {
        match minutes {
            Some(minutes) => delta::minutes(minutes),
            None => self.config.default_window(),
        }
    }

    async fn execute(&self, command: Commands) -> anyhow::Result<()> {
        match command {
            Commands::Seed => {
                let inserted = seed_demo_data(&self.service).await?;
                print_json(&serde_json::json!({ "inserted": inserted }))?;
            }
            Commands::Ingest {
                ticker,
                price,
                observed_at,
            } => {
                let observed_at = observed_at.unwrap_or_else(|| self.clock.now());
                let sample = self.service.ingest(&ticker, price, observed_at).await?;
                print_json(&sample)?;
            }
            Commands::History { ticker, minutes } => {
                let history = self.service.history(&ticker, self.window(minutes)?).await?;
                print_json(&history)?;
            }
            Commands::Average {
                ticker,
                minutes,
                aggregation,
            } => {
                let result = self
                    .service
                    .aggregate(&ticker, self.window(minutes)?, &aggregation)
                    .await?;
                print_json(&result)?;
            }
            Commands::Correlate {
                tickers,
                minutes,
                tolerance_secs,
            } => {
                let window = self.window(minutes)?;
                let result = match (tolerance_secs, tickers.as_slice()) {
                    (Some(secs), [a, b]) => {
                        self.service
                            .correlate(a, b, window, delta::seconds(secs)?)
                            .await?
                    }
                    _ => self.service.correlate_tickers(&tickers, window).await?,
                };
                print_json(&result)?;
            }
            Commands::Sweep => {
                let removed = self.service.sweep().await?;
                print_json(&serde_json::json!({
                    "removed": removed,
                    "remaining": self.store.count().await,
                }))?;
            }
            Commands::Compact => {
                let journal = self.journal.as_ref().ok_or_else(|| {
                    PriceError::UnsupportedOperation(
                        "compact requires journal_path to be configured".to_string(),
                    )
                })?;
                let kept = journal.compact(self.clock.now()).await?;
                print_json(&serde_json::json!({ "kept": kept }))?;
            }
            Commands::Run => self.run_feed().await?,
        }

        Ok(())
    }

    /// Ingest a JSON-lines feed from stdin
    async fn run_feed(&self) -> anyhow::Result<()> {
        let sweeper = self.start_sweeper();

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let (mut accepted, mut rejected) = (0usize, 0usize);

        loop {
            let line = tokio::select! {
                line = lines.next_line() => line?,
                _ = tokio::signal::ctrl_c() => {
                    info!("Ctrl+C received - stopping feed");
                    None
                }
            };
            let Some(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }

            let feed: FeedLine = match serde_json::from_str(&line) {
                Ok(feed) => feed,
                Err(e) => {
                    warn!("Skipping malformed feed line: {}", e);
                    rejected += 1;
                    continue;
                }
            };

            let observed_at = feed.observed_at.unwrap_or_else(|| self.clock.now());
            let mut outcome = self.service.ingest(&feed.ticker, feed.price, observed_at).await;
            if let Err(e) = &outcome {
                if e.is_recoverable() {
                    warn!("Ingestion failed ({}), retrying once: {}", e.error_code(), e);
                    tokio::time::sleep(FEED_RETRY_DELAY).await;
                    outcome = self.service.ingest(&feed.ticker, feed.price, observed_at).await;
                }
            }
            match outcome {
                Ok(_) => accepted += 1,
                Err(e) if e.is_client_error() => rejected += 1,
                Err(e) => {
                    error!("Ingestion failed: {} ({})", e, e.error_code());
                    if let Some(handle) = sweeper {
                        handle.abort();
                    }
                    return Err(e.into());
                }
            }
        }

        if let Some(handle) = sweeper {
            handle.abort();
        }
        info!("Feed finished: {} accepted, {} rejected", accepted, rejected);
        print_json(&FeedSummary { accepted, rejected })?;
        Ok(())
    }

    fn start_sweeper(&self) -> Option<JoinHandle<()>> {
        if self.config.sweep_interval_secs == 0 {
            return None;
        }
        Some(spawn_expiry_sweeper(
            Arc::clone(&self.store),
            Arc::clone(&self.clock),
            std::time::Duration::from_secs(self.config.sweep_interval_secs),
        ))
    }
}

#[derive(Serialize)]
struct FeedSummary {
    accepted: usize,
    rejected: usize,
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = std::env::var("CONFIG_PATH")
        .unwrap_or_else(|_| "config.toml".to_string());

    let app = PriceApp::new(&config_path).await?;

    if let Err(e) = app.execute(cli.command).await {
        if let Some(price_error) = e.downcast_ref::<PriceError>() {
            error!("Command failed: {} ({})", price_error, price_error.error_code());
        } else {
            error!("Command failed: {}", e);
        }
        return Err(e);
    }

    Ok(())
}
