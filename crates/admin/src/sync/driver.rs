//! Run bookkeeping: per-record logging and totals.
//!
//! The command loop feeds each record's result to [`RunTracker::record`] in
//! order. Errors never escape a record; they become a failed outcome here.

use storebridge_core::{RecordOutcome, RecordStatus, RunSummary};
use tracing::{error, info, warn};

use super::SyncError;

/// Totals for one run.
#[derive(Debug)]
pub struct RunTracker {
    entity: &'static str,
    summary: RunSummary,
}

impl RunTracker {
    /// A tracker for a run over `entity` records (used in logs).
    #[must_use]
    pub fn new(entity: &'static str) -> Self {
        Self {
            entity,
            summary: RunSummary::default(),
        }
    }

    /// Log and count one record, turning an error into a failed outcome.
    pub fn record(&mut self, key: &str, result: Result<RecordOutcome, SyncError>) -> RecordOutcome {
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(entity = self.entity, key, error = %e, "record failed");
                RecordOutcome::failed(e.to_string())
            }
        };

        match outcome.status {
            RecordStatus::Created | RecordStatus::Updated => info!(
                entity = self.entity,
                key,
                status = %outcome.status,
                target_id = outcome.target_id.as_deref().unwrap_or_default(),
                child_failures = outcome.child_failures.len(),
                "record done"
            ),
            RecordStatus::Skipped => info!(
                entity = self.entity,
                key,
                reason = outcome.reason.as_deref().unwrap_or_default(),
                "record skipped"
            ),
            RecordStatus::Failed => {}
        }
        if !outcome.child_failures.is_empty() {
            warn!(
                entity = self.entity,
                key,
                child_failures = outcome.child_failures.len(),
                "record finished with child failures"
            );
        }

        self.summary.record(&outcome);
        outcome
    }

    /// Totals so far.
    #[must_use]
    pub const fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Log the summary and hand it back.
    #[must_use]
    pub fn finish(self) -> RunSummary {
        let s = &self.summary;
        if s.has_failures() {
            warn!(
                entity = self.entity,
                total = s.total(),
                created = s.created,
                updated = s.updated,
                skipped = s.skipped,
                failed = s.failed,
                child_failures = s.child_failures,
                "run finished with failures"
            );
        } else {
            info!(
                entity = self.entity,
                total = s.total(),
                created = s.created,
                updated = s.updated,
                skipped = s.skipped,
                "run finished"
            );
        }
        self.summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_count_as_failed_and_run_continues() {
        let mut tracker = RunTracker::new("company");
        tracker.record("a", Ok(RecordOutcome::created("gid://shopify/Company/1")));
        let failed =
            tracker.record("b", Err(SyncError::Precondition("no shipping address".into())));
        tracker.record("c", Ok(RecordOutcome::skipped(None, "exists")));

        assert_eq!(failed.status, RecordStatus::Failed);
        assert_eq!(failed.reason.as_deref(), Some("Precondition failed: no shipping address"));

        let summary = tracker.finish();
        assert_eq!(summary.created, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.total(), 3);
        assert!(summary.has_failures());
    }

    #[test]
    fn test_child_failures_make_the_run_fail() {
        let mut tracker = RunTracker::new("company");
        tracker.record(
            "a",
            Ok(RecordOutcome::updated("gid://shopify/Company/1")
                .with_child_failures(vec!["location HQ2: boom".into()])),
        );
        let summary = tracker.finish();
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.child_failures, 1);
        assert!(summary.has_failures());
    }
}
