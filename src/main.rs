//! recall_recon - offline replay runner
//!
//! Replays a captured transaction-log dump through the full recovery
//! pipeline and reports the reconciliation summary. Useful for validating a
//! captured log before a failover, or for post-incident analysis.
//!
//! ```text
//! ┌──────────┐    ┌────────────┐    ┌──────────┐    ┌──────────┐
//! │  Dump    │───▶│ Aggregator │───▶│  Driver  │───▶│  Cache   │
//! │ (JSONL)  │    │ (per order)│    │ (recon)  │    │ + Client │
//! └──────────┘    └────────────┘    └──────────┘    └──────────┘
//! ```
//!
//! Each dump line is a JSON record: `{"topic": ..., "timestamp": ...,
//! "payload": ...}` with the timestamp in bookmark format. Publishes are
//! recorded and printed, not sent - there is no broker in an offline replay.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

use recall_recon::bookmark::parse_bookmark;
use recall_recon::codec::decode_entry;
use recall_recon::{
    AppConfig, ContextReadySignal, MessagingClient, RecordingClient, RecoveryDriver, StateCache,
    TransactionLogAggregator,
};

// ============================================================
// ARGUMENTS
// ============================================================

#[derive(Debug, Default)]
struct Args {
    config_path: Option<String>,
    input_path: Option<String>,
    ticket_bookmark: Option<String>,
    oms_bookmark: Option<String>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args::default();
    let mut iter = std::env::args().skip(1);
    while let Some(flag) = iter.next() {
        let mut value = |name: &str| {
            iter.next()
                .with_context(|| format!("{name} requires a value"))
        };
        match flag.as_str() {
            "--config" => args.config_path = Some(value("--config")?),
            "--input" => args.input_path = Some(value("--input")?),
            "--ticket-bookmark" => args.ticket_bookmark = Some(value("--ticket-bookmark")?),
            "--oms-bookmark" => args.oms_bookmark = Some(value("--oms-bookmark")?),
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }
    Ok(args)
}

// ============================================================
// DUMP LOADING
// ============================================================

/// One captured topic record.
#[derive(Debug, Deserialize)]
struct DumpRecord {
    topic: String,
    timestamp: String,
    payload: String,
}

fn load_dump(
    path: &str,
    config: &AppConfig,
    aggregator: &TransactionLogAggregator,
) -> Result<(u64, u64)> {
    let file = File::open(path).with_context(|| format!("cannot open dump file {path}"))?;
    let mut loaded = 0u64;
    let mut dropped = 0u64;

    for (lineno, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let record: DumpRecord = match serde_json::from_str(&line) {
            Ok(record) => record,
            Err(err) => {
                warn!(lineno, %err, "unreadable dump line, dropping");
                dropped += 1;
                continue;
            }
        };

        let Some(source) = config.recovery.source_for(&record.topic) else {
            warn!(lineno, topic = %record.topic, "record from unknown topic, dropping");
            dropped += 1;
            continue;
        };
        let Some(timestamp) = parse_bookmark(&record.timestamp) else {
            warn!(lineno, "record without a usable timestamp, dropping");
            dropped += 1;
            continue;
        };

        match decode_entry(source, timestamp, &record.payload) {
            Ok(entry) => {
                aggregator.append(entry);
                loaded += 1;
            }
            Err(err) => {
                warn!(lineno, %err, "undecodable payload, dropping");
                dropped += 1;
            }
        }
    }

    Ok((loaded, dropped))
}

// ============================================================
// MAIN
// ============================================================

fn main() -> Result<()> {
    let args = parse_args()?;

    let config = match args.config_path.as_deref() {
        Some(path) => AppConfig::from_file(path)
            .map_err(|e| anyhow::anyhow!("failed to load config {path}: {e}"))?,
        None => AppConfig::default(),
    };

    let _guard = recall_recon::logging::init_logging(&config.logging);

    let input = args
        .input_path
        .context("--input <dump.jsonl> is required")?;

    let aggregator = TransactionLogAggregator::new();
    let (loaded, dropped) = load_dump(&input, &config, &aggregator)?;
    info!(loaded, dropped, orders = aggregator.order_count(), "dump loaded");

    // Offline replay: every stream is complete once the file is read.
    aggregator.mark_replay_complete(recall_recon::LogSource::TicketHistory);
    aggregator.mark_replay_complete(recall_recon::LogSource::RecallToOms);
    aggregator.mark_replay_complete(recall_recon::LogSource::OmsToRecall);

    let cache = Arc::new(StateCache::new());
    let client = Arc::new(RecordingClient::new());
    let driver = RecoveryDriver::new(
        config.recovery.clone(),
        Arc::clone(&cache),
        Some(Arc::clone(&client) as Arc<dyn MessagingClient>),
    )
    .with_bookmarks(
        args.ticket_bookmark.as_deref().and_then(parse_bookmark),
        args.oms_bookmark.as_deref().and_then(parse_bookmark),
    );

    let signal = ContextReadySignal::new(Arc::clone(&cache));
    signal.on_context_refreshed(|| {
        driver.run(&aggregator);
        Ok(())
    });

    for (topic, payload) in client.published() {
        info!(%topic, %payload, "would publish");
    }
    info!(
        initialized = cache.is_initialized(),
        tickets = cache.ticket_count(),
        orders = cache.order_count(),
        "replay complete"
    );

    Ok(())
}
