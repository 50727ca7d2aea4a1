//! Per-record outcomes and run totals.

use serde::{Deserialize, Serialize};

/// What happened to one input record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// A new target record was created.
    Created,
    /// An existing target record was updated.
    Updated,
    /// The record was left alone (already exists under a skip policy, or a
    /// precondition failed).
    Skipped,
    /// The record failed; nothing after the failing step was attempted.
    Failed,
}

impl RecordStatus {
    /// Lowercase label used in reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of processing one logical entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordOutcome {
    /// Overall status.
    pub status: RecordStatus,
    /// Target id created or matched, when known.
    pub target_id: Option<String>,
    /// Human-readable reason (skip reason, failure message).
    pub reason: Option<String>,
    /// Child/grandchild steps that failed without aborting the record.
    pub child_failures: Vec<String>,
}

impl RecordOutcome {
    /// A created record.
    #[must_use]
    pub fn created(target_id: impl Into<String>) -> Self {
        Self::with_status(RecordStatus::Created, Some(target_id.into()), None)
    }

    /// An updated record.
    #[must_use]
    pub fn updated(target_id: impl Into<String>) -> Self {
        Self::with_status(RecordStatus::Updated, Some(target_id.into()), None)
    }

    /// A skipped record.
    #[must_use]
    pub fn skipped(target_id: Option<String>, reason: impl Into<String>) -> Self {
        Self::with_status(RecordStatus::Skipped, target_id, Some(reason.into()))
    }

    /// A failed record.
    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::with_status(RecordStatus::Failed, None, Some(reason.into()))
    }

    const fn with_status(
        status: RecordStatus,
        target_id: Option<String>,
        reason: Option<String>,
    ) -> Self {
        Self {
            status,
            target_id,
            reason,
            child_failures: Vec::new(),
        }
    }

    /// Attach child failures collected while processing the record.
    #[must_use]
    pub fn with_child_failures(mut self, failures: Vec<String>) -> Self {
        self.child_failures = failures;
        self
    }

    /// Reason text for reports: the explicit reason, else the joined child failures.
    #[must_use]
    pub fn report_reason(&self) -> String {
        match (&self.reason, self.child_failures.is_empty()) {
            (Some(reason), true) => reason.clone(),
            (Some(reason), false) => format!("{reason}; {}", self.child_failures.join("; ")),
            (None, false) => self.child_failures.join("; "),
            (None, true) => String::new(),
        }
    }
}

/// Running totals for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Records created.
    pub created: usize,
    /// Records updated.
    pub updated: usize,
    /// Records skipped.
    pub skipped: usize,
    /// Records that failed outright.
    pub failed: usize,
    /// Child steps that failed inside otherwise processed records.
    pub child_failures: usize,
}

impl RunSummary {
    /// Count one outcome.
    pub fn record(&mut self, outcome: &RecordOutcome) {
        match outcome.status {
            RecordStatus::Created => self.created += 1,
            RecordStatus::Updated => self.updated += 1,
            RecordStatus::Skipped => self.skipped += 1,
            RecordStatus::Failed => self.failed += 1,
        }
        self.child_failures += outcome.child_failures.len();
    }

    /// Total records seen.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.created + self.updated + self.skipped + self.failed
    }

    /// Whether the run should signal a non-zero completion.
    #[must_use]
    pub const fn has_failures(&self) -> bool {
        self.failed > 0 || self.child_failures > 0
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} records: {} created, {} updated, {} skipped, {} failed ({} child failures)",
            self.total(),
            self.created,
            self.updated,
            self.skipped,
            self.failed,
            self.child_failures
        )
    }
}
