//! Batched, fault-tolerant row processing
//!
//! [`BatchRunner`] drives a row sequence through a strategy in fixed-size
//! transactional batches with two failure granularities: a bad row is
//! recorded and skipped without touching its siblings, while a failed batch
//! commit converts every row of that batch into an attributed error and the
//! run moves on to the next batch. Worst-case data loss on a storage failure
//! is therefore bounded to one batch, and the run always covers every row.

use crate::app::services::dialect::RowEntry;
use crate::app::services::progress::ImportProgress;
use crate::app::services::strategies::RowStrategy;
use crate::app::storage::{DomainOp, Storage};
use crate::Summary;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, error, warn};

/// Per-batch staging scope handed to row strategies
///
/// Strategies read through [`storage`](Self::storage) and stage their domain
/// mutations; the runner commits everything staged for the batch in one
/// transaction after the last row.
pub struct BatchContext<'a> {
    storage: &'a dyn Storage,
    staged: Vec<DomainOp>,
}

impl<'a> BatchContext<'a> {
    /// Open a staging scope over the storage layer
    pub fn new(storage: &'a dyn Storage) -> Self {
        Self {
            storage,
            staged: Vec::new(),
        }
    }

    /// Read-only storage access for lookups and stack pushes
    pub fn storage(&self) -> &dyn Storage {
        self.storage
    }

    /// Stage one domain mutation for the batch commit
    pub fn stage(&mut self, op: DomainOp) {
        self.staged.push(op);
    }

    fn take_staged(&mut self) -> Vec<DomainOp> {
        std::mem::take(&mut self.staged)
    }
}

/// Drives row-by-row processing in fixed-size transactional batches
pub struct BatchRunner<'a> {
    storage: &'a dyn Storage,
    batch_size: usize,
}

impl<'a> BatchRunner<'a> {
    /// Create a runner; a zero batch size is clamped to 1
    pub fn new(storage: &'a dyn Storage, batch_size: usize) -> Self {
        Self {
            storage,
            batch_size: batch_size.max(1),
        }
    }

    /// Process every row through the strategy, committing per batch.
    ///
    /// Invokes the strategy exactly once per parseable row, in file order,
    /// producing `ceil(n / batch_size)` batches. Returns the final summary.
    pub fn run(
        &self,
        rows: &[RowEntry],
        strategy: &dyn RowStrategy,
        progress: &mut ImportProgress,
    ) -> Summary {
        for (batch_index, batch) in rows.chunks(self.batch_size).enumerate() {
            let mut ctx = BatchContext::new(self.storage);
            let mut committed_rows: Vec<(usize, Option<String>)> = Vec::new();

            for entry in batch {
                let row = match &entry.result {
                    Ok(row) => row,
                    Err(parse_err) => {
                        progress.error(parse_err.to_string(), Some(entry.line), None, None);
                        continue;
                    }
                };

                let outcome = catch_unwind(AssertUnwindSafe(|| {
                    strategy.process(row, entry.line, &mut ctx, progress)
                }));

                match outcome {
                    Ok(Ok(())) => {
                        progress.success();
                        committed_rows.push((entry.line, Some(row.snippet())));
                    }
                    Ok(Err(err)) => {
                        progress.error(
                            err.to_string(),
                            Some(entry.line),
                            err.field().map(str::to_string),
                            Some(row.snippet()),
                        );
                    }
                    Err(_panic) => {
                        error!(line = entry.line, "row strategy panicked; row skipped");
                        progress.error(
                            "Unexpected internal error while processing row",
                            Some(entry.line),
                            None,
                            Some(row.snippet()),
                        );
                    }
                }
            }

            let staged = ctx.take_staged();
            let staged_count = staged.len();
            if let Err(storage_err) = self.storage.commit(staged) {
                // The whole batch is lost: demote its provisional successes
                // to errors attributing the storage failure.
                warn!(
                    batch = batch_index,
                    %storage_err,
                    "batch commit failed; recording every row of the batch as an error"
                );
                progress.retract_successes(committed_rows.len());
                for (line, snippet) in committed_rows.drain(..) {
                    progress.error(
                        format!("Batch commit failed: {storage_err}"),
                        Some(line),
                        None,
                        snippet,
                    );
                }
            } else {
                debug!(
                    batch = batch_index,
                    rows = batch.len(),
                    staged = staged_count,
                    "batch committed"
                );
            }
        }

        progress.summary()
    }
}
