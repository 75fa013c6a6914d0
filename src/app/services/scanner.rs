//! Watched-folder ingestion
//!
//! A recurring task owned by the process lifecycle: every `interval` it walks
//! a folder, finds supported data files it has not imported yet, and runs
//! each through the importer. Files are tracked by path and modification
//! time, so an unchanged file imports exactly once and an overwritten file
//! imports again.

use crate::app::services::formats::FileFormat;
use crate::app::services::importer::Importer;
use crate::app::services::progress::Summary;
use crate::app::services::strategies::ImportKind;
use crate::app::storage::Storage;
use crate::config::IngestConfig;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Tracks which files in a folder have already been imported
pub struct FolderScanner {
    path: PathBuf,
    kind: ImportKind,
    seen: HashMap<PathBuf, SystemTime>,
}

impl FolderScanner {
    pub fn new(path: impl Into<PathBuf>, kind: ImportKind) -> Self {
        Self {
            path: path.into(),
            kind,
            seen: HashMap::new(),
        }
    }

    /// Walk the folder once and import every new or modified supported file
    pub fn scan(&mut self, importer: &Importer<'_>) -> Vec<(PathBuf, Summary)> {
        let mut imported = Vec::new();

        for entry in WalkDir::new(&self.path)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            if FileFormat::from_path(path).is_err() {
                continue;
            }

            let modified = entry
                .metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            if self.seen.get(path) == Some(&modified) {
                continue;
            }

            debug!(path = %path.display(), "importing discovered file");
            match importer.import_path(path, self.kind, None) {
                Ok(summary) => {
                    self.seen.insert(path.to_path_buf(), modified);
                    imported.push((path.to_path_buf(), summary));
                }
                Err(err) => {
                    warn!(path = %path.display(), %err, "discovered file could not be read");
                }
            }
        }
        imported
    }
}

/// Totals across one watch session
#[derive(Debug, Clone, Copy, Default)]
pub struct WatchReport {
    pub files_imported: usize,
    pub rows_succeeded: usize,
    pub rows_failed: usize,
}

/// A folder watched on a fixed interval for one import type
#[derive(Debug, Clone)]
pub struct WatchFolder {
    pub path: PathBuf,
    pub interval: Duration,
    pub kind: ImportKind,
}

impl WatchFolder {
    pub fn new(path: impl Into<PathBuf>, interval: Duration, kind: ImportKind) -> Self {
        Self {
            path: path.into(),
            interval,
            kind,
        }
    }

    /// Scan the folder on every interval tick until cancelled
    pub async fn run(
        &self,
        storage: &dyn Storage,
        config: IngestConfig,
        token: CancellationToken,
    ) -> WatchReport {
        let importer = Importer::new(storage, config);
        let mut scanner = FolderScanner::new(&self.path, self.kind);
        let mut report = WatchReport::default();
        let mut ticker = tokio::time::interval(self.interval);

        info!(
            path = %self.path.display(),
            interval_secs = self.interval.as_secs_f64(),
            kind = %self.kind,
            "watching folder"
        );
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    for (path, summary) in scanner.scan(&importer) {
                        info!(
                            path = %path.display(),
                            success = summary.success,
                            error = summary.error,
                            "watched file imported"
                        );
                        report.files_imported += 1;
                        report.rows_succeeded += summary.success;
                        report.rows_failed += summary.error;
                    }
                }
            }
        }

        info!(
            files = report.files_imported,
            rows = report.rows_succeeded,
            "watch session finished"
        );
        report
    }
}
