//! Interval-generated time series
//!
//! Expands a sparse set of device readings into one record per interval
//! boundary between `start_time` and `end_time`. Each metric carries its
//! last observed value forward across boundaries with no newer observation;
//! boundaries before the first observation stay empty. No averaging or
//! interpolation between observations.

use crate::app::models::{parse_datetime, ClimateMetrics, ReadingRecord};
use crate::constants::METRIC_FIELDS;
use crate::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tracing::debug;

/// Boundary parameters of one interval series message
#[derive(Debug, Clone)]
pub struct IntervalSpec {
    pub start_time: String,
    pub end_time: String,
    pub interval_seconds: i64,
}

/// Expansion result: one record per boundary, plus the count of source
/// readings that could not be parsed
pub struct Generated {
    pub records: Vec<ReadingRecord>,
    pub rejected: usize,
}

/// Expand sparse readings into boundary records for one device
pub fn generate(station_id: u64, spec: &IntervalSpec, readings: &[Value]) -> Result<Generated> {
    if spec.interval_seconds <= 0 {
        return Err(Error::validation("interval_seconds must be positive"));
    }
    let start = parse_datetime("start_time", &spec.start_time)?;
    let end = parse_datetime("end_time", &spec.end_time)?;
    if end < start {
        return Err(Error::validation("end_time precedes start_time"));
    }

    let mut observed: Vec<(DateTime<Utc>, ClimateMetrics)> = Vec::with_capacity(readings.len());
    let mut rejected = 0usize;
    for raw in readings {
        match parse_observation(raw) {
            Ok(parsed) => observed.push(parsed),
            Err(err) => {
                rejected += 1;
                debug!(%err, "interval source reading rejected");
            }
        }
    }
    observed.sort_by_key(|(timestamp, _)| *timestamp);

    let step = Duration::seconds(spec.interval_seconds);
    let mut records = Vec::new();
    let mut carry = ClimateMetrics::default();
    let mut next = 0usize;

    let mut boundary = start;
    while boundary <= end {
        // Fold in every observation up to and including this boundary.
        while next < observed.len() && observed[next].0 <= boundary {
            let mut merged = observed[next].1;
            merged.fill_missing_from(&carry);
            carry = merged;
            next += 1;
        }
        records.push(ReadingRecord::new(station_id, boundary, carry.clone()));
        boundary += step;
    }

    debug!(
        boundaries = records.len(),
        observations = observed.len(),
        rejected,
        "interval series expanded"
    );
    Ok(Generated { records, rejected })
}

fn parse_observation(raw: &Value) -> Result<(DateTime<Utc>, ClimateMetrics)> {
    let object = raw
        .as_object()
        .ok_or_else(|| Error::validation("interval reading is not an object"))?;
    let timestamp = object
        .get("timestamp")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::missing_field("timestamp"))?;
    let timestamp = parse_datetime("timestamp", timestamp)?;

    let mut metrics = ClimateMetrics::default();
    for name in METRIC_FIELDS {
        if let Some(value) = object.get(*name).and_then(Value::as_f64) {
            metrics.set(name, value);
        }
    }
    Ok((timestamp, metrics))
}
