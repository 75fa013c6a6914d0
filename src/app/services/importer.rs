//! End-to-end import orchestration
//!
//! Ties the pipeline together: decode bytes, sniff the dialect, then hand the
//! rows to the batch runner with the strategy for the requested import type.
//! File-level structural failures (empty file, no headers, unsupported
//! format) surface as a single-error [`Summary`] before any batch starts;
//! everything after that point is row- or batch-granular.

use crate::app::services::batch_runner::BatchRunner;
use crate::app::services::dialect::ParsedTable;
use crate::app::services::formats::{self, FileFormat};
use crate::app::services::progress::{ImportProgress, ProgressCallback, Summary};
use crate::app::services::strategies::{strategy_for, ImportKind};
use crate::app::storage::Storage;
use crate::config::IngestConfig;
use crate::Result;
use std::path::Path;
use tracing::{info, warn};

/// One-stop import entry point used by the CLI and the watch scanner
pub struct Importer<'a> {
    storage: &'a dyn Storage,
    config: IngestConfig,
}

impl<'a> Importer<'a> {
    pub fn new(storage: &'a dyn Storage, config: IngestConfig) -> Self {
        Self { storage, config }
    }

    /// Import raw CSV/TSV bytes of unknown encoding
    pub fn import_bytes(
        &self,
        bytes: &[u8],
        kind: ImportKind,
        callback: Option<ProgressCallback>,
    ) -> Summary {
        self.import_format(bytes, FileFormat::Csv, kind, callback)
    }

    /// Import bytes already dispatched to a format
    pub fn import_format(
        &self,
        bytes: &[u8],
        format: FileFormat,
        kind: ImportKind,
        callback: Option<ProgressCallback>,
    ) -> Summary {
        match formats::table_from_bytes(bytes, format) {
            Ok(table) => self.import_table(table, kind, callback),
            Err(err) => {
                warn!(%err, "import aborted before batching");
                failure_summary(&err)
            }
        }
    }

    /// Read a file and import it, dispatching on its extension
    pub fn import_path(
        &self,
        path: &Path,
        kind: ImportKind,
        callback: Option<ProgressCallback>,
    ) -> Result<Summary> {
        let format = match FileFormat::from_path(path) {
            Ok(format) => format,
            Err(err) => return Ok(failure_summary(&err)),
        };
        let bytes = std::fs::read(path)?;
        info!(path = %path.display(), ?format, %kind, "importing file");
        Ok(self.import_format(&bytes, format, kind, callback))
    }

    fn import_table(
        &self,
        table: ParsedTable,
        kind: ImportKind,
        callback: Option<ProgressCallback>,
    ) -> Summary {
        let strategy = strategy_for(kind, &self.config);
        let mut progress = ImportProgress::new(table.total_rows());
        if let Some(callback) = callback {
            progress = progress.with_callback(callback);
        }

        let runner = BatchRunner::new(self.storage, self.config.batch_size);
        let summary = runner.run(&table.rows, strategy.as_ref(), &mut progress);
        info!(
            success = summary.success,
            error = summary.error,
            total = summary.total_rows,
            "import finished"
        );
        summary
    }
}

// Structural failure: a summary with one error and nothing processed.
fn failure_summary(err: &crate::Error) -> Summary {
    let mut progress = ImportProgress::new(0);
    progress.error(err.to_string(), None, err.field().map(str::to_string), None);
    progress.summary()
}
