//! Weather data-type import strategy

use super::fields::{parse_f64, require};
use super::RowStrategy;
use crate::app::models::DataTypeRecord;
use crate::app::services::batch_runner::BatchContext;
use crate::app::services::dialect::RawRow;
use crate::app::services::progress::ImportProgress;
use crate::app::storage::DomainOp;
use crate::Result;

/// Upserts weather data-type definitions keyed by name.
///
/// Only `name` is required; `min_value`/`max_value` parse failures (and an
/// inverted range) degrade to warnings with the values dropped.
pub struct DataTypesStrategy {
    update_existing: bool,
}

impl DataTypesStrategy {
    pub fn new(update_existing: bool) -> Self {
        Self { update_existing }
    }

    fn optional_number(
        row: &RawRow,
        field: &str,
        line: usize,
        progress: &mut ImportProgress,
    ) -> Option<f64> {
        let raw = row.get_non_empty(field)?;
        match parse_f64(field, raw) {
            Ok(value) => Some(value),
            Err(err) => {
                progress.warning(
                    err.to_string(),
                    Some(line),
                    Some(field.to_string()),
                    Some(row.snippet()),
                );
                None
            }
        }
    }
}

impl RowStrategy for DataTypesStrategy {
    fn process(
        &self,
        row: &RawRow,
        line: usize,
        ctx: &mut BatchContext<'_>,
        progress: &mut ImportProgress,
    ) -> Result<()> {
        let name = require(row, "name")?;

        let mut min_value = Self::optional_number(row, "min_value", line, progress);
        let mut max_value = Self::optional_number(row, "max_value", line, progress);
        if let (Some(min), Some(max)) = (min_value, max_value) {
            if min > max {
                progress.warning(
                    format!("min_value {min} exceeds max_value {max}; range dropped"),
                    Some(line),
                    Some("min_value".to_string()),
                    Some(row.snippet()),
                );
                min_value = None;
                max_value = None;
            }
        }

        let record = DataTypeRecord {
            name: name.to_string(),
            unit: row.get_non_empty("unit").map(str::to_string),
            description: row.get_non_empty("description").map(str::to_string),
            min_value,
            max_value,
        };

        if !self.update_existing && ctx.storage().data_type_exists(&record.name)? {
            progress.warning(
                format!("Data type '{}' already exists, left unchanged", record.name),
                Some(line),
                None,
                Some(row.snippet()),
            );
            return Ok(());
        }

        ctx.stage(DomainOp::UpsertDataType(record));
        Ok(())
    }
}
