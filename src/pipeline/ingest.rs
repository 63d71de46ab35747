// src/pipeline/ingest.rs

//! Ingestion pipeline: registry listing, batched fetch and merge, output.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::error::Result;
use crate::models::{Config, RunStats};
use crate::pipeline::batch::{BatchContext, process_batch};
use crate::pipeline::writer::WriterHandle;
use crate::services::{
    EntityFetcher, FuzzyMatcher, ReferenceIndex, RegistryClient, RegistryEndpoints,
};
use crate::storage::StreamingWriter;
use crate::utils::http::Transport;
use crate::utils::{log, mebibytes};

/// Per-run overrides of the configuration.
#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    /// Output path instead of `output.path`
    pub output: Option<PathBuf>,
    /// Process only the first `limit` listed entities
    pub limit: Option<usize>,
}

/// Run the full ingestion against an already built reference index.
///
/// Batches run strictly one after another; the output is complete and
/// valid JSON once this returns `Ok`.
pub async fn run_ingest(
    config: &Config,
    transport: Arc<dyn Transport>,
    index: Arc<ReferenceIndex>,
    options: &IngestOptions,
) -> Result<RunStats> {
    config.validate()?;
    log::header("Food ingestion");

    let endpoints = RegistryEndpoints::new(&config.registry)?;
    log::info(&format!("Listing registry at {}", endpoints.root()));
    let listing = RegistryClient::new(Arc::clone(&transport), endpoints.clone())
        .fetch_all()
        .await?;

    let mut ids: Vec<u64> = listing.entities.iter().map(|e| e.id).collect();
    if let Some(limit) = options.limit {
        ids.truncate(limit);
    }
    log::info(&format!(
        "Listed {} foods over {} pages, processing {}",
        listing.entities.len(),
        listing.pages,
        ids.len()
    ));

    let mut stats = RunStats::start(ids.len());
    stats.skipped_listing_items = listing.skipped;

    let output = options
        .output
        .clone()
        .unwrap_or_else(|| config.output.path.clone());
    let writer = StreamingWriter::create(
        &output,
        config.output.pretty,
        config.output.sync_each_record,
    )
    .await?;
    let writer = WriterHandle::spawn(writer, config.batch.size * 2);

    let gate = Arc::new(Semaphore::new(config.fetch.max_concurrent));
    let context = BatchContext {
        fetcher: Arc::new(EntityFetcher::new(transport, endpoints, gate, &config.fetch)),
        matcher: Arc::new(FuzzyMatcher::new(index, &config.matching)),
        records: writer.sender(),
    };

    let batch_delay = Duration::from_millis(config.batch.delay_ms);
    let batch_count = ids.len().div_ceil(config.batch.size);

    for (i, chunk) in ids.chunks(config.batch.size).enumerate() {
        log::step(
            i + 1,
            batch_count,
            &format!("Processing {} foods", chunk.len()),
        );

        let result = process_batch(&context, i, chunk).await;
        let report = match result {
            Ok(report) => report,
            Err(e) => {
                drop(context);
                return Err(writer.into_error(e).await);
            }
        };
        let progress = match writer.barrier().await {
            Ok(progress) => progress,
            Err(e) => {
                drop(context);
                return Err(writer.into_error(e).await);
            }
        };
        stats.record_batch(&report);

        log::sub_item(&format!(
            "{} foods in {:.1}s ({:.1}/s), {} matched, {} degraded requests",
            report.entities,
            report.elapsed.as_secs_f64(),
            report.entities_per_sec(),
            report.matched,
            report.degraded_requests
        ));
        log::sub_item(&format!(
            "Progress: {}/{} foods, match rate {:.1}%, {:.2} MB written",
            stats.entities_processed,
            stats.entities_total,
            stats.match_rate(),
            mebibytes(progress.bytes)
        ));

        if !batch_delay.is_zero() && i + 1 < batch_count {
            tokio::time::sleep(batch_delay).await;
        }
    }

    drop(context);
    let summary = writer.finish().await?;
    stats.finish(summary.bytes);

    log::success(&format!(
        "Wrote {} records to {}",
        summary.records,
        summary.path.display()
    ));
    log::summary(
        "Ingestion",
        &[
            ("Foods processed", stats.entities_processed.to_string()),
            ("Reference matches", stats.entities_matched.to_string()),
            ("Match rate", format!("{:.1}%", stats.match_rate())),
            ("Records written", stats.records_written.to_string()),
            ("Degraded requests", stats.degraded_requests.to_string()),
            ("Failed foods", stats.entity_failures.to_string()),
            ("Skipped listing items", stats.skipped_listing_items.to_string()),
            ("Output size", format!("{:.2} MB", mebibytes(summary.bytes))),
        ],
    );

    Ok(stats)
}
