//! Per-import-type row strategies
//!
//! Every import type maps one raw row to a validated domain mutation through
//! the single [`RowStrategy`] interface. The variant is selected once per
//! import from [`ImportKind`] via [`strategy_for`]; rows are never
//! re-dispatched individually.

use crate::app::services::batch_runner::BatchContext;
use crate::app::services::dialect::RawRow;
use crate::app::services::progress::ImportProgress;
use crate::config::IngestConfig;
use crate::{Error, Result};
use std::str::FromStr;

pub mod climate;
pub mod countries;
pub mod data_types;
pub mod fields;
pub mod stations;

#[cfg(test)]
pub mod tests;

pub use climate::{ClimateMode, ClimateStrategy};
pub use countries::CountriesStrategy;
pub use data_types::DataTypesStrategy;
pub use stations::StationsStrategy;

/// Converts one raw row into a domain mutation.
///
/// On success the strategy stages its mutations (or pushes to a stack) and
/// returns `Ok`; the runner does the success accounting. Recoverable
/// per-field issues are reported through `progress` as warnings. A returned
/// error fails this row only.
pub trait RowStrategy: Send + Sync {
    fn process(
        &self,
        row: &RawRow,
        line: usize,
        ctx: &mut BatchContext<'_>,
        progress: &mut ImportProgress,
    ) -> Result<()>;
}

/// Supported import types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    /// Weather station definitions, upsert keyed by name
    Stations,
    /// Climate readings written directly to storage
    ClimateData,
    /// Climate readings buffered on the resolved station's data stack
    ClimateDataStack,
    /// Weather data-type definitions
    WeatherDataTypes,
    /// Country definitions
    Countries,
}

impl ImportKind {
    /// All supported kinds, for help output
    pub fn all() -> [ImportKind; 5] {
        [
            ImportKind::Stations,
            ImportKind::ClimateData,
            ImportKind::ClimateDataStack,
            ImportKind::WeatherDataTypes,
            ImportKind::Countries,
        ]
    }

    /// Canonical lowercase name
    pub fn name(&self) -> &'static str {
        match self {
            ImportKind::Stations => "stations",
            ImportKind::ClimateData => "climate-data",
            ImportKind::ClimateDataStack => "climate-data-stack",
            ImportKind::WeatherDataTypes => "weather-data-types",
            ImportKind::Countries => "countries",
        }
    }
}

impl std::fmt::Display for ImportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ImportKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "stations" => Ok(ImportKind::Stations),
            "climate-data" => Ok(ImportKind::ClimateData),
            "climate-data-stack" => Ok(ImportKind::ClimateDataStack),
            "weather-data-types" => Ok(ImportKind::WeatherDataTypes),
            "countries" => Ok(ImportKind::Countries),
            other => Err(Error::configuration(format!(
                "unknown import kind '{other}' (expected one of: stations, climate-data, \
                 climate-data-stack, weather-data-types, countries)"
            ))),
        }
    }
}

/// Build the strategy for an import kind, selected once per import
pub fn strategy_for(kind: ImportKind, config: &IngestConfig) -> Box<dyn RowStrategy> {
    match kind {
        ImportKind::Stations => Box::new(StationsStrategy::new(config.update_existing)),
        ImportKind::ClimateData => Box::new(ClimateStrategy::new(ClimateMode::Direct)),
        ImportKind::ClimateDataStack => Box::new(ClimateStrategy::new(ClimateMode::Stack)),
        ImportKind::WeatherDataTypes => Box::new(DataTypesStrategy::new(config.update_existing)),
        ImportKind::Countries => Box::new(CountriesStrategy::new(config.update_existing)),
    }
}
