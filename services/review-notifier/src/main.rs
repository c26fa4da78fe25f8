//! Review notifier CLI
//!
//! Command-line interface for the homework review status poller.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use clap::Parser;
use review_notifier::{load_config, Config, ReviewNotifierBuilder};
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "review-notifier")]
#[command(about = "Polls homework review statuses and sends Telegram notifications")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Poll interval in seconds (overrides config file)
    #[arg(long)]
    interval: Option<u64>,

    /// Initial cursor as seconds since the epoch; 0 fetches the full history
    #[arg(long)]
    from_date: Option<i64>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: Level,

    /// Also append logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let file_layer = match &args.log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(LevelFilter::from_level(args.log_level))
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    tracing::debug!(
        "Parsed command line arguments: config={:?}, interval={:?}, from_date={:?}, \
         log_level={:?}, log_file={:?}",
        args.config,
        args.interval,
        args.from_date,
        args.log_level,
        args.log_file
    );

    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!("Loaded environment from {:?}", path),
        Err(e) if e.not_found() => tracing::debug!("No .env file found"),
        Err(e) => return Err(e.into()),
    }

    let mut config = if let Some(config_path) = &args.config {
        tracing::debug!("Loading configuration from {:?}", config_path);
        load_config(config_path)?
    } else {
        tracing::debug!("Using default configuration");
        Config::default()
    };

    config.resolve_secrets()?;

    if let Some(interval) = args.interval {
        config.polling.interval_seconds = interval;
    }
    if let Some(from_date) = args.from_date {
        config.polling.from_date = Some(from_date);
    }

    tracing::info!("Starting review notifier");
    tracing::debug!("Configuration: {:?}", config);

    ReviewNotifierBuilder::new(config).build()?.start().await?;

    Ok(())
}
