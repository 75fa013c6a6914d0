//! Bounded per-entity buffering of not-yet-persisted readings
//!
//! Each station or field device owns one [`DataStack`]: a bounded, ordered
//! buffer of JSON reading objects. Readings are pushed as they arrive, peeked
//! and popped LIFO, and drained FIFO on flush so persisted records keep their
//! original push order. When auto-processing is enabled the stack flushes
//! itself synchronously as soon as its size reaches the configured threshold.

use crate::app::models::{parse_datetime, ClimateMetrics, ReadingRecord};
use crate::config::StackConfig;
use crate::constants::METRIC_FIELDS;
use crate::{Error, Result};
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::VecDeque;
use tracing::{debug, warn};

#[cfg(test)]
pub mod tests;

/// Result of a single push
#[derive(Debug, Clone, Default)]
pub struct PushOutcome {
    /// Whether the item was accepted (false means the stack was full and
    /// nothing was mutated)
    pub accepted: bool,

    /// Outcome of the auto-process flush, when one fired during this push
    pub flush: Option<FlushOutcome>,
}

/// Result of draining the buffer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FlushOutcome {
    /// Number of items removed from the buffer (always the pre-flush size)
    pub drained: usize,

    /// Number of items successfully converted and persisted
    pub persisted: usize,

    /// Number of items that failed conversion or persistence
    pub failed: usize,
}

/// Snapshot of a stack's state for status reporting
#[derive(Debug, Clone, Serialize)]
pub struct StackInfo {
    pub stack_size: usize,
    pub max_stack_size: usize,
    pub last_data_feed: Option<DateTime<Utc>>,
    pub auto_process: bool,
    pub process_threshold: usize,
    /// Most recently pushed item, if any
    pub latest_data: Option<Value>,
}

/// Bounded buffer of JSON reading objects owned by one station or device
///
/// Invariants: `len() <= max_size` always holds; a push against a full stack
/// is rejected without mutation; flush always empties the buffer completely,
/// regardless of individual item failures.
#[derive(Debug, Clone)]
pub struct DataStack {
    items: VecDeque<Value>,
    max_size: usize,
    auto_process: bool,
    process_threshold: usize,
    last_feed_at: Option<DateTime<Utc>>,
}

impl DataStack {
    /// Create an empty stack from configuration
    pub fn new(config: &StackConfig) -> Self {
        Self {
            items: VecDeque::new(),
            max_size: config.max_size,
            auto_process: config.auto_process,
            process_threshold: config.process_threshold.min(config.max_size),
            last_feed_at: None,
        }
    }

    /// Current number of buffered items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether the buffer is at capacity
    pub fn is_full(&self) -> bool {
        self.items.len() >= self.max_size
    }

    /// Push a reading onto the stack.
    ///
    /// Rejected (no mutation) when the stack is full. Otherwise the item is
    /// appended, `last_feed_at` is stamped, and, when auto-processing is
    /// enabled and the new size has reached the threshold, the stack flushes
    /// itself through `persist` before returning.
    pub fn push<F>(&mut self, item: Value, mut persist: F) -> PushOutcome
    where
        F: FnMut(&Value) -> std::result::Result<(), String>,
    {
        if self.is_full() {
            debug!(capacity = self.max_size, "push rejected: stack full");
            return PushOutcome {
                accepted: false,
                flush: None,
            };
        }

        self.items.push_back(item);
        self.last_feed_at = Some(Utc::now());

        let flush = if self.auto_process && self.items.len() >= self.process_threshold {
            Some(self.flush(&mut persist))
        } else {
            None
        };

        PushOutcome {
            accepted: true,
            flush,
        }
    }

    /// Most recently pushed item, without removing it
    pub fn peek(&self) -> Option<&Value> {
        self.items.back()
    }

    /// Remove and return the most recently pushed item
    pub fn pop(&mut self) -> Option<Value> {
        self.items.pop_back()
    }

    /// Drain the buffer, persisting items oldest-first.
    ///
    /// Conversion/persistence failures are logged and counted but never stop
    /// the drain; the buffer is always empty afterwards.
    pub fn flush<F>(&mut self, persist: &mut F) -> FlushOutcome
    where
        F: FnMut(&Value) -> std::result::Result<(), String>,
    {
        let drained = self.items.len();
        let mut persisted = 0usize;
        let mut failed = 0usize;

        while let Some(item) = self.items.pop_front() {
            match persist(&item) {
                Ok(()) => persisted += 1,
                Err(message) => {
                    failed += 1;
                    warn!(%message, "stack item failed to persist during flush");
                }
            }
        }

        debug!(drained, persisted, failed, "stack flushed");
        FlushOutcome {
            drained,
            persisted,
            failed,
        }
    }

    /// Empty the buffer without persisting anything
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Snapshot of the stack state
    pub fn info(&self) -> StackInfo {
        StackInfo {
            stack_size: self.items.len(),
            max_stack_size: self.max_size,
            last_data_feed: self.last_feed_at,
            auto_process: self.auto_process,
            process_threshold: self.process_threshold,
            latest_data: self.peek().cloned(),
        }
    }
}

/// Convert one buffered stack item into a persistable reading.
///
/// Items are JSON objects carrying a `timestamp` (string in a recognized
/// format, or numeric epoch seconds) plus any subset of the recognized metric
/// fields. This is the conversion contract flush relies on.
pub fn reading_from_item(station_id: u64, item: &Value) -> Result<ReadingRecord> {
    let object = item
        .as_object()
        .ok_or_else(|| Error::validation("stack item is not an object"))?;

    let timestamp = match object.get("timestamp") {
        Some(Value::String(raw)) => parse_item_timestamp(raw)?,
        Some(Value::Number(n)) => {
            let secs = n
                .as_i64()
                .ok_or_else(|| Error::invalid_date("timestamp", n.to_string()))?;
            Utc.timestamp_opt(secs, 0)
                .single()
                .ok_or_else(|| Error::invalid_date("timestamp", n.to_string()))?
        }
        _ => return Err(Error::missing_field("timestamp")),
    };

    let mut metrics = ClimateMetrics::default();
    for name in METRIC_FIELDS {
        if let Some(value) = object.get(*name).and_then(Value::as_f64) {
            metrics.set(name, value);
        }
    }

    Ok(ReadingRecord::new(station_id, timestamp, metrics))
}

/// Parse a stack-item timestamp string through the recognized format chain
pub fn parse_item_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    parse_datetime("timestamp", raw)
}
