//! Progress tracking for large feeds.

use crate::model::{Entry, Feed};
use crate::parser::{EntryAction, ParseObserver};
use log::info;
use std::time::Instant;

/// Counts entries as the parser completes them and logs throughput.
#[derive(Debug)]
pub struct ProgressTracker {
    entries_processed: usize,
    batch_failures: usize,
    start_time: Instant,
    last_report_count: usize,
    report_interval: usize,
}

impl ProgressTracker {
    /// The tracker logs progress every `report_interval` entries; `0` turns
    /// periodic reporting off.
    pub fn new(report_interval: usize) -> Self {
        Self {
            entries_processed: 0,
            batch_failures: 0,
            start_time: Instant::now(),
            last_report_count: 0,
            report_interval,
        }
    }

    /// Log final statistics.
    pub fn finish(&self) {
        let elapsed = self.start_time.elapsed();
        let rate = self.entries_processed as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
        info!(
            "Parsing complete: {} entries ({} failed batch operations) in {:.2}s ({:.0} entries/sec)",
            self.entries_processed,
            self.batch_failures,
            elapsed.as_secs_f64(),
            rate
        );
    }

    pub fn entry_count(&self) -> usize {
        self.entries_processed
    }

    /// Entries whose `batch:status` code reports a failure.
    pub fn failure_count(&self) -> usize {
        self.batch_failures
    }
}

impl ParseObserver for ProgressTracker {
    fn entry_completed(&mut self, entry: &Entry) -> EntryAction {
        self.entries_processed += 1;
        let failed = entry
            .batch()
            .and_then(|b| b.status.as_ref())
            .is_some_and(|s| s.is_failure());
        if failed {
            self.batch_failures += 1;
        }

        let count = self.entries_processed;
        if self.report_interval > 0 && count - self.last_report_count >= self.report_interval {
            self.last_report_count = count;
            let elapsed = self.start_time.elapsed();
            let rate = count as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
            info!(
                "Progress: {} entries parsed ({:.0} entries/sec, elapsed: {:.1}s)",
                count,
                rate,
                elapsed.as_secs_f64()
            );
        }
        EntryAction::Keep
    }

    fn document_completed(&mut self, feed: &Feed) {
        info!("Document complete, feed holds {} entries", feed.entries().len());
    }
}
