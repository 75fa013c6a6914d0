//! Climate reading import strategy (direct and stack-buffered modes)

use super::fields::{parse_f64, require, require_first};
use super::RowStrategy;
use crate::app::models::{parse_datetime, ClimateMetrics, ReadingRecord};
use crate::app::services::batch_runner::BatchContext;
use crate::app::services::dialect::RawRow;
use crate::app::services::progress::ImportProgress;
use crate::app::storage::DomainOp;
use crate::constants::{METRIC_FIELDS, STATION_REFERENCE_FIELDS};
use crate::{Error, Result};
use serde_json::{json, Value};

/// Where a parsed reading goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClimateMode {
    /// Stage the reading for the batch commit
    Direct,
    /// Push the reading onto the resolved station's data stack
    Stack,
}

/// Converts one CSV row into a climate reading.
///
/// The station reference is the first present of `station_name`,
/// `station_id`, `station`; resolution tries external id, then name, then
/// numeric storage id. Metric columns are parsed individually: a bad numeric
/// degrades to a field warning, never a row failure.
pub struct ClimateStrategy {
    mode: ClimateMode,
}

impl ClimateStrategy {
    pub fn new(mode: ClimateMode) -> Self {
        Self { mode }
    }
}

impl RowStrategy for ClimateStrategy {
    fn process(
        &self,
        row: &RawRow,
        line: usize,
        ctx: &mut BatchContext<'_>,
        progress: &mut ImportProgress,
    ) -> Result<()> {
        let (_, reference) = require_first(row, STATION_REFERENCE_FIELDS)?;
        let station_id = ctx
            .storage()
            .resolve_station(reference)?
            .ok_or_else(|| Error::station_not_found(reference))?;

        let timestamp = parse_datetime("timestamp", require(row, "timestamp")?)?;

        let mut metrics = ClimateMetrics::default();
        for field in METRIC_FIELDS {
            let Some(raw) = row.get_non_empty(field) else {
                continue;
            };
            match parse_f64(field, raw) {
                Ok(value) => {
                    metrics.set(field, value);
                }
                Err(err) => {
                    progress.warning(
                        err.to_string(),
                        Some(line),
                        Some((*field).to_string()),
                        Some(row.snippet()),
                    );
                }
            }
        }

        if metrics.is_empty() {
            progress.warning(
                "Row carries no metric values",
                Some(line),
                None,
                Some(row.snippet()),
            );
        }

        match self.mode {
            ClimateMode::Direct => {
                ctx.stage(DomainOp::InsertReading(ReadingRecord::new(
                    station_id, timestamp, metrics,
                )));
            }
            ClimateMode::Stack => {
                let item = stack_item(timestamp, &metrics);
                let outcome = ctx.storage().stack_push(station_id, item)?;
                if !outcome.accepted {
                    let capacity = ctx.storage().stack_info(station_id)?.max_stack_size;
                    return Err(Error::StackFull { capacity });
                }
            }
        }
        Ok(())
    }
}

/// Assemble the JSON stack item for a parsed reading
fn stack_item(timestamp: chrono::DateTime<chrono::Utc>, metrics: &ClimateMetrics) -> Value {
    let mut object = serde_json::Map::new();
    object.insert("timestamp".to_string(), json!(timestamp.to_rfc3339()));
    for field in METRIC_FIELDS {
        if let Some(value) = metrics.get(field) {
            object.insert((*field).to_string(), json!(value));
        }
    }
    Value::Object(object)
}
