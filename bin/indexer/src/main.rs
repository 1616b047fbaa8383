//! Process entry point for the state-diff IPLD indexer.

#![warn(missing_debug_implementations, unreachable_pub, rustdoc::all)]
#![deny(unused_must_use, rust_2018_idioms)]

mod config;

use crate::config::{Config, LogSection};
use clap::{Parser, Subcommand};
use ipld_eth_core::{Cleaner, Converter};
use ipld_eth_sql::{ensure_schema_version, PgCleaner, PgIndexReader, PgIndexer, PgPublisher};
use ipld_eth_sync::{Backfiller, HttpFetcher, Pipeline, SyncService, WsStreamer};
use ipld_eth_types::{BlockRange, DataKind};
use std::{
    fs::File,
    io,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "ipld-eth-indexer", about = "Ethereum state-diff IPLD indexer")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the long-running indexing process.
    Run {
        /// Path to the TOML configuration file.
        #[arg(long, env = "INDEXER_CONFIG")]
        config: PathBuf,
    },
    /// Delete indexed data and blobs over block ranges.
    Clean {
        /// Path to the TOML configuration file.
        #[arg(long, env = "INDEXER_CONFIG")]
        config: PathBuf,
        /// Data layer to remove: full, headers, uncles, transactions,
        /// receipts, state or storage.
        #[arg(long, value_parser = parse_kind)]
        kind: DataKind,
        /// Inclusive ranges, each as `low-high`.
        #[arg(long, required = true, value_parser = parse_range)]
        ranges: Vec<BlockRange>,
    },
    /// Zero the validation counters over block ranges.
    ResetValidation {
        /// Path to the TOML configuration file.
        #[arg(long, env = "INDEXER_CONFIG")]
        config: PathBuf,
        /// Inclusive ranges, each as `low-high`.
        #[arg(long, required = true, value_parser = parse_range)]
        ranges: Vec<BlockRange>,
    },
    /// Print build information.
    Version,
}

fn parse_kind(raw: &str) -> Result<DataKind, String> {
    raw.parse().map_err(|err: ipld_eth_types::UnknownDataKind| err.to_string())
}

fn parse_range(raw: &str) -> Result<BlockRange, String> {
    let (low, high) = raw
        .split_once('-')
        .ok_or_else(|| format!("expected `low-high`, got `{raw}`"))?;
    let low = low.trim().parse::<u64>().map_err(|err| err.to_string())?;
    let high = high.trim().parse::<u64>().map_err(|err| err.to_string())?;
    Ok(BlockRange::new(low, high))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    match Cli::parse().command {
        Command::Run { config } => run(&config).await,
        Command::Clean { config, kind, ranges } => {
            let pool = connect(&config).await?;
            PgCleaner::new(pool).clean(&ranges, kind).await?;
            Ok(())
        }
        Command::ResetValidation { config, ranges } => {
            let pool = connect(&config).await?;
            PgCleaner::new(pool).reset_validation(&ranges).await?;
            Ok(())
        }
        Command::Version => {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn connect(config_path: &Path) -> Result<sqlx::PgPool, Box<dyn std::error::Error>> {
    let config = Config::load(config_path)?;
    init_tracing(&config.log)?;
    let pool = ipld_eth_sql::connect(&config.database).await?;
    ensure_schema_version(&pool).await?;
    Ok(pool)
}

async fn run(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load(config_path)?;
    init_tracing(&config.log)?;

    let pool = ipld_eth_sql::connect(&config.database).await?;
    ensure_schema_version(&pool).await?;

    let source = config.source_node();
    info!(fingerprint = source.fingerprint(), "starting state-diff indexer");

    let cancel = CancellationToken::new();
    let tracker = TaskTracker::new();
    let pipeline = || {
        Arc::new(Pipeline::new(
            Converter::new(source.chain_id),
            PgPublisher::new(pool.clone()),
            PgIndexer::new(pool.clone(), &source),
        ))
    };

    if config.sync.on {
        let streamer = WsStreamer::connect(&config.sync.ws_path).await?;
        let service =
            SyncService::new(streamer, pipeline(), config.sync.workers, cancel.clone());
        tracker.spawn(service.run());
    }

    if config.backfill.on {
        let fetcher = HttpFetcher::connect(&config.backfill.http_path)?;
        let backfiller = Backfiller::new(
            fetcher,
            PgIndexReader::new(pool.clone()),
            pipeline(),
            config.backfill.runtime(),
            cancel.clone(),
        );
        tracker.spawn(backfiller.run());
    }

    if !config.sync.on && !config.backfill.on {
        info!("neither sync nor backfill is enabled; nothing to do");
        return Ok(());
    }

    tracker.close();
    // The token also trips from inside the service on fatal errors; either
    // way the process drains and exits.
    tokio::select! {
        _ = cancel.cancelled() => {
            info!("internal shutdown requested; draining in-flight payloads");
        }
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("shutdown signal received; draining in-flight payloads");
            cancel.cancel();
        }
    }
    tracker.wait().await;
    info!("indexer stopped");
    Ok(())
}

/// Clonable handle writing through a shared log file.
#[derive(Debug, Clone)]
struct SharedFile(Arc<File>);

impl io::Write for SharedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (&*self.0).write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        (&*self.0).flush()
    }
}

fn init_tracing(log: &LogSection) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&log.level))?;
    match &log.file {
        Some(path) => {
            let writer = SharedFile(Arc::new(File::create(path)?));
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(move || writer.clone())
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
    Ok(())
}
