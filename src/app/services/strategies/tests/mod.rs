//! Tests for the per-import-type row strategies

use crate::app::services::batch_runner::BatchRunner;
use crate::app::services::dialect;
use crate::app::services::progress::ImportProgress;
use crate::app::storage::InMemoryStorage;
use crate::Summary;

pub mod climate_tests;
pub mod stations_tests;

/// Run a CSV snippet through one strategy against the given storage
pub fn run_csv(storage: &InMemoryStorage, strategy: &dyn super::RowStrategy, text: &str) -> Summary {
    let table = dialect::parse(text).unwrap();
    let mut progress = ImportProgress::new(table.total_rows());
    BatchRunner::new(storage, 100).run(&table.rows, strategy, &mut progress)
}
