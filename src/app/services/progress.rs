//! Import progress accounting and summary reporting
//!
//! [`ImportProgress`] accumulates success/error/warning events for one import
//! run and exposes immutable [`Summary`] snapshots. Error and warning sample
//! lists are capped to bound memory; the counters stay exact past the cap.
//! An optional caller-supplied callback observes every mutation; a panicking
//! callback is caught and logged, never propagated.

use crate::constants::ERROR_SAMPLE_CAP;
use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;
use tracing::warn;

/// One recorded error or warning with its row context
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErrorRecord {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Compact rendering of the offending row
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<String>,
}

/// Immutable snapshot of an import's progress
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub success: usize,
    pub error: usize,
    pub warning: usize,
    /// First [`ERROR_SAMPLE_CAP`] error records
    pub errors: Vec<ErrorRecord>,
    /// First [`ERROR_SAMPLE_CAP`] warning records
    pub warnings: Vec<ErrorRecord>,
    pub total_processed: usize,
    pub total_rows: usize,
    pub duration_seconds: f64,
    /// True only when the expected row count is known and reached
    pub complete: bool,
}

/// Callback observing progress snapshots
pub type ProgressCallback = Box<dyn Fn(&Summary) + Send>;

/// Mutable accumulator for one import run
pub struct ImportProgress {
    processed: usize,
    success: usize,
    error: usize,
    warning: usize,
    errors: Vec<ErrorRecord>,
    warnings: Vec<ErrorRecord>,
    total_rows: usize,
    started_at: Instant,
    callback: Option<ProgressCallback>,
}

impl std::fmt::Debug for ImportProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImportProgress")
            .field("processed", &self.processed)
            .field("success", &self.success)
            .field("error", &self.error)
            .field("warning", &self.warning)
            .field("total_rows", &self.total_rows)
            .finish()
    }
}

impl ImportProgress {
    /// Create a fresh accumulator; `total_rows` enables the completion flag
    pub fn new(total_rows: usize) -> Self {
        Self {
            processed: 0,
            success: 0,
            error: 0,
            warning: 0,
            errors: Vec::new(),
            warnings: Vec::new(),
            total_rows,
            started_at: Instant::now(),
            callback: None,
        }
    }

    /// Attach a callback invoked with the current summary on every mutation
    pub fn with_callback(mut self, callback: ProgressCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Record one successfully processed row
    pub fn success(&mut self) {
        self.processed += 1;
        self.success += 1;
        self.notify();
    }

    /// Record one failed row with optional context
    pub fn error(
        &mut self,
        message: impl Into<String>,
        line: Option<usize>,
        field: Option<String>,
        row: Option<String>,
    ) {
        self.processed += 1;
        self.error += 1;
        if self.errors.len() < ERROR_SAMPLE_CAP {
            self.errors.push(ErrorRecord {
                message: message.into(),
                line,
                field,
                row,
            });
        }
        self.notify();
    }

    /// Record a non-fatal warning with optional context
    pub fn warning(
        &mut self,
        message: impl Into<String>,
        line: Option<usize>,
        field: Option<String>,
        row: Option<String>,
    ) {
        self.warning += 1;
        if self.warnings.len() < ERROR_SAMPLE_CAP {
            self.warnings.push(ErrorRecord {
                message: message.into(),
                line,
                field,
                row,
            });
        }
        self.notify();
    }

    /// Retract provisional successes from a batch whose commit failed.
    ///
    /// The batch runner calls this before re-recording every row of the
    /// failed batch as an error, so `success` counts only committed rows and
    /// `processed` stays exact.
    pub(crate) fn retract_successes(&mut self, count: usize) {
        self.success = self.success.saturating_sub(count);
        self.processed = self.processed.saturating_sub(count);
    }

    /// Number of rows processed so far
    pub fn processed(&self) -> usize {
        self.processed
    }

    /// Immutable snapshot of the current state
    pub fn summary(&self) -> Summary {
        Summary {
            success: self.success,
            error: self.error,
            warning: self.warning,
            errors: self.errors.clone(),
            warnings: self.warnings.clone(),
            total_processed: self.processed,
            total_rows: self.total_rows,
            duration_seconds: self.started_at.elapsed().as_secs_f64(),
            complete: self.total_rows > 0 && self.processed >= self.total_rows,
        }
    }

    // Progress reporting must never abort an import: a panicking callback is
    // caught here and logged.
    fn notify(&self) {
        if let Some(callback) = &self.callback {
            let summary = self.summary();
            let result = catch_unwind(AssertUnwindSafe(|| callback(&summary)));
            if result.is_err() {
                warn!("progress callback panicked; continuing import");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_counts_and_completion() {
        let mut progress = ImportProgress::new(3);
        progress.success();
        progress.success();
        assert!(!progress.summary().complete);

        progress.error("bad row", Some(4), None, None);
        let summary = progress.summary();
        assert_eq!(summary.success, 2);
        assert_eq!(summary.error, 1);
        assert_eq!(summary.total_processed, 3);
        assert!(summary.complete);
    }

    #[test]
    fn test_unknown_total_never_completes() {
        let mut progress = ImportProgress::new(0);
        progress.success();
        assert!(!progress.summary().complete);
    }

    #[test]
    fn test_error_context_recorded() {
        let mut progress = ImportProgress::new(1);
        progress.error(
            "Invalid numeric value for 'latitude': 'abc'",
            Some(37),
            Some("latitude".to_string()),
            Some("Station A,abc,-122.4".to_string()),
        );

        let summary = progress.summary();
        let record = &summary.errors[0];
        assert_eq!(record.line, Some(37));
        assert_eq!(record.field.as_deref(), Some("latitude"));
        assert!(record.row.as_deref().unwrap().contains("abc"));
    }

    #[test]
    fn test_sample_lists_capped_counts_exact() {
        let mut progress = ImportProgress::new(0);
        for i in 0..250 {
            progress.error(format!("error {i}"), Some(i), None, None);
            progress.warning(format!("warning {i}"), Some(i), None, None);
        }

        let summary = progress.summary();
        assert_eq!(summary.error, 250);
        assert_eq!(summary.warning, 250);
        assert_eq!(summary.errors.len(), ERROR_SAMPLE_CAP);
        assert_eq!(summary.warnings.len(), ERROR_SAMPLE_CAP);
    }

    #[test]
    fn test_warnings_do_not_count_as_processed() {
        let mut progress = ImportProgress::new(2);
        progress.warning("unknown column 'foo'", Some(2), Some("foo".to_string()), None);
        assert_eq!(progress.summary().total_processed, 0);
    }

    #[test]
    fn test_callback_sees_every_mutation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let mut progress = ImportProgress::new(2).with_callback(Box::new(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        }));

        progress.success();
        progress.error("bad", None, None, None);
        progress.warning("odd", None, None, None);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_panicking_callback_is_contained() {
        let mut progress = ImportProgress::new(1).with_callback(Box::new(|_| {
            panic!("callback blew up");
        }));

        progress.success();
        assert_eq!(progress.summary().success, 1);
    }

    #[test]
    fn test_retract_successes() {
        let mut progress = ImportProgress::new(5);
        for _ in 0..3 {
            progress.success();
        }
        progress.retract_successes(3);
        for _ in 0..3 {
            progress.error("batch commit failed", None, None, None);
        }

        let summary = progress.summary();
        assert_eq!(summary.success, 0);
        assert_eq!(summary.error, 3);
        assert_eq!(summary.total_processed, 3);
    }
}
