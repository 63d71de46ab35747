//! Run and batch statistics.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Aggregated statistics of one ingestion run.
#[derive(Debug, Clone, Serialize)]
pub struct RunStats {
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub entities_total: usize,
    pub entities_processed: usize,
    pub entities_matched: usize,
    pub records_written: usize,
    /// Sub-requests replaced by their default value
    pub degraded_requests: usize,
    /// Entities whose task failed outright
    pub entity_failures: usize,
    /// Listing items without a usable id
    pub skipped_listing_items: usize,
    pub batches: usize,
    pub output_bytes: u64,
}

impl RunStats {
    pub fn start(entities_total: usize) -> Self {
        Self {
            start_time: Utc::now(),
            end_time: None,
            entities_total,
            entities_processed: 0,
            entities_matched: 0,
            records_written: 0,
            degraded_requests: 0,
            entity_failures: 0,
            skipped_listing_items: 0,
            batches: 0,
            output_bytes: 0,
        }
    }

    /// Percentage of processed entities with a reference match.
    pub fn match_rate(&self) -> f64 {
        if self.entities_processed == 0 {
            return 0.0;
        }
        self.entities_matched as f64 / self.entities_processed as f64 * 100.0
    }

    /// Fold a finished batch into the totals.
    pub fn record_batch(&mut self, batch: &BatchReport) {
        self.batches += 1;
        self.entities_processed += batch.entities;
        self.entities_matched += batch.matched;
        self.records_written += batch.records;
        self.degraded_requests += batch.degraded_requests;
        self.entity_failures += batch.failures;
    }

    pub fn finish(&mut self, output_bytes: u64) {
        self.output_bytes = output_bytes;
        self.end_time = Some(Utc::now());
    }
}

/// Outcome of a single batch.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub index: usize,
    pub entities: usize,
    pub matched: usize,
    pub records: usize,
    pub degraded_requests: usize,
    pub failures: usize,
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn entities_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.entities as f64 / secs
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_rate_handles_empty_runs() {
        assert_eq!(RunStats::start(0).match_rate(), 0.0);
    }

    #[test]
    fn batches_accumulate() {
        let mut stats = RunStats::start(4);
        stats.record_batch(&BatchReport {
            index: 0,
            entities: 2,
            matched: 1,
            records: 4,
            ..BatchReport::default()
        });
        stats.record_batch(&BatchReport {
            index: 1,
            entities: 2,
            matched: 2,
            records: 4,
            failures: 1,
            ..BatchReport::default()
        });

        assert_eq!(stats.batches, 2);
        assert_eq!(stats.records_written, 8);
        assert_eq!(stats.entity_failures, 1);
        assert_eq!(stats.match_rate(), 75.0);
    }
}
