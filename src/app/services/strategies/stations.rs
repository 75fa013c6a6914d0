//! Station import strategy

use super::fields::{parse_f64, require};
use super::RowStrategy;
use crate::app::models::StationRecord;
use crate::app::services::batch_runner::BatchContext;
use crate::app::services::dialect::RawRow;
use crate::app::services::progress::ImportProgress;
use crate::app::storage::DomainOp;
use crate::constants::STATION_OPTIONAL_FIELDS;
use crate::Result;

/// Upserts weather stations keyed by name.
///
/// Requires `name`, `latitude`, `longitude`; bad coordinate numerics fail the
/// row. Recognized optional columns are captured as metadata; unrecognized
/// columns produce warnings and are dropped.
pub struct StationsStrategy {
    update_existing: bool,
}

impl StationsStrategy {
    pub fn new(update_existing: bool) -> Self {
        Self { update_existing }
    }
}

impl RowStrategy for StationsStrategy {
    fn process(
        &self,
        row: &RawRow,
        line: usize,
        ctx: &mut BatchContext<'_>,
        progress: &mut ImportProgress,
    ) -> Result<()> {
        let name = require(row, "name")?;
        let latitude = parse_f64("latitude", require(row, "latitude")?)?;
        let longitude = parse_f64("longitude", require(row, "longitude")?)?;

        let mut record = StationRecord::new(name, latitude, longitude)?;

        for (column, value) in row.iter() {
            let value = value.trim();
            if value.is_empty() || matches!(column, "name" | "latitude" | "longitude") {
                continue;
            }
            if STATION_OPTIONAL_FIELDS.contains(&column) {
                if column == "station_id" {
                    record.external_id = Some(value.to_string());
                }
                record.metadata.insert(column.to_string(), value.to_string());
            } else {
                progress.warning(
                    format!("Unknown column '{column}' ignored"),
                    Some(line),
                    Some(column.to_string()),
                    None,
                );
            }
        }

        if !self.update_existing
            && ctx.storage().find_station_by_name(&record.name)?.is_some()
        {
            progress.warning(
                format!("Station '{}' already exists, left unchanged", record.name),
                Some(line),
                None,
                Some(row.snippet()),
            );
            return Ok(());
        }

        ctx.stage(DomainOp::UpsertStation(record));
        Ok(())
    }
}
