//! Batch scheduler.
//!
//! Each entity of a batch runs in its own task. The shared semaphore inside
//! [`EntityFetcher`] bounds how many are fetching at once; the rest wait
//! for a permit. Records reach the writer in completion order.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::error::{AppError, Result};
use crate::models::BatchReport;
use crate::pipeline::merge::{assemble, fallback_records};
use crate::pipeline::writer::{WriterCommand, send_records};
use crate::services::{EntityFetcher, FuzzyMatcher, Scorer};
use crate::utils::log;

/// What one entity task reports back.
#[derive(Debug, Clone, Copy)]
struct EntityOutcome {
    matched: bool,
    degraded: usize,
}

/// Shared state for every entity task.
pub struct BatchContext<S: Scorer> {
    pub fetcher: Arc<EntityFetcher>,
    pub matcher: Arc<FuzzyMatcher<S>>,
    pub records: mpsc::Sender<WriterCommand>,
}

impl<S: Scorer> Clone for BatchContext<S> {
    fn clone(&self) -> Self {
        Self {
            fetcher: Arc::clone(&self.fetcher),
            matcher: Arc::clone(&self.matcher),
            records: self.records.clone(),
        }
    }
}

/// Fetch, reconcile, match and send the records of every entity in `ids`.
///
/// Returns once every entity's records are queued for the writer. A task
/// that panics is replaced by the entity's fallback records; only a stopped
/// writer fails the batch.
pub async fn process_batch<S: Scorer + 'static>(
    context: &BatchContext<S>,
    index: usize,
    ids: &[u64],
) -> Result<BatchReport> {
    let started = Instant::now();
    let mut report = BatchReport {
        index,
        ..Default::default()
    };

    let mut tasks = JoinSet::new();
    let mut owners = HashMap::with_capacity(ids.len());
    for &id in ids {
        let context = context.clone();
        let handle = tasks.spawn(async move { process_entity(&context, id).await });
        owners.insert(handle.id(), id);
    }

    while let Some(joined) = tasks.join_next_with_id().await {
        match joined {
            Ok((_, Ok(outcome))) => {
                report.matched += usize::from(outcome.matched);
                report.degraded_requests += outcome.degraded;
            }
            Ok((_, Err(e))) => {
                tasks.abort_all();
                return Err(e);
            }
            Err(join_error) => {
                let id = owners.get(&join_error.id()).copied().ok_or_else(|| {
                    AppError::validation(format!("unknown entity task: {join_error}"))
                })?;
                log::error(&format!("Food #{id} failed, writing defaults: {join_error}"));
                report.failures += 1;
                send_records(&context.records, fallback_records(id)).await?;
            }
        }
        report.entities += 1;
        report.records += 2;
    }

    report.elapsed = started.elapsed();
    Ok(report)
}

async fn process_entity<S: Scorer>(context: &BatchContext<S>, id: u64) -> Result<EntityOutcome> {
    let outcome = context.fetcher.fetch(id).await;
    let reference = context.matcher.best_match(&outcome.bundle.english.detail.name);

    match reference {
        Some(record) => log::debug(&format!(
            "Food #{id} '{}' matched '{}'",
            outcome.bundle.english.detail.name, record.description
        )),
        None => log::debug(&format!("Food #{id} has no reference match")),
    }

    let matched = reference.is_some();
    send_records(&context.records, assemble(&outcome.bundle, reference)).await?;

    Ok(EntityOutcome {
        matched,
        degraded: outcome.degraded,
    })
}
