//! Device telemetry sessions
//!
//! [`BatchIngestSession`] is the real-time counterpart of the file pipeline:
//! one session per device connection, messages handled sequentially. Four
//! payload shapes are accepted (a plain record batch, a gzip-compressed
//! batch, a chunked batch streamed across several messages, and an
//! interval-generated series) and all of them converge on the storage
//! layer's bulk reading insert. Per-record failures are counted in the ack
//! but never abort the batch, matching the file importer's policy.

use crate::app::services::data_stack::reading_from_item;
use crate::app::storage::Storage;
use crate::{Error, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::io::Read;
use tracing::{debug, warn};

pub mod interval;

#[cfg(test)]
pub mod tests;

pub use interval::IntervalSpec;

/// One inbound message on a telemetry connection
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TelemetryMessage {
    /// Single-shot batch: every record in one message
    Batch {
        device_id: String,
        records: Vec<Value>,
    },

    /// Base64-wrapped, gzip-compressed JSON array of records
    CompressedBatch { device_id: String, payload: String },

    /// Open a chunked batch; the client then streams indexed chunks
    BeginBatch {
        device_id: String,
        batch_id: String,
        total_chunks: usize,
    },

    /// One chunk of a previously opened batch
    BatchChunk {
        batch_id: String,
        chunk_index: usize,
        records: Vec<Value>,
    },

    /// Sparse readings expanded to one record per interval boundary
    IntervalSeries {
        device_id: String,
        start_time: String,
        end_time: String,
        interval_seconds: i64,
        readings: Vec<Value>,
    },
}

/// Session status reported back to the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AckStatus {
    /// Accepted, more input expected (chunked batches)
    Started,
    /// Batch fully handled
    Processed,
    /// Message rejected; the session stays usable
    Error,
}

/// Response to one telemetry message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ack {
    pub status: AckStatus,
    pub records_processed: usize,
    pub errors: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Ack {
    fn started(message: impl Into<String>) -> Self {
        Self {
            status: AckStatus::Started,
            records_processed: 0,
            errors: 0,
            message: Some(message.into()),
        }
    }

    fn processed(records_processed: usize, errors: usize) -> Self {
        Self {
            status: AckStatus::Processed,
            records_processed,
            errors,
            message: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: AckStatus::Error,
            records_processed: 0,
            errors: 0,
            message: Some(message.into()),
        }
    }
}

struct PendingBatch {
    device_id: String,
    total_chunks: usize,
    chunks: HashMap<usize, Vec<Value>>,
}

/// Sequential message handler for one device connection.
///
/// Sessions are independent of each other; the only shared state between
/// concurrent connections is the storage layer itself.
pub struct BatchIngestSession<'a> {
    storage: &'a dyn Storage,
    pending: HashMap<String, PendingBatch>,
}

impl<'a> BatchIngestSession<'a> {
    pub fn new(storage: &'a dyn Storage) -> Self {
        Self {
            storage,
            pending: HashMap::new(),
        }
    }

    /// Parse and handle one raw JSON message. A payload that does not parse
    /// as a known message shape yields an error ack and leaves the session
    /// usable for the next message.
    pub fn handle_raw(&mut self, raw: &str) -> Ack {
        match serde_json::from_str::<TelemetryMessage>(raw) {
            Ok(message) => self.handle(message),
            Err(err) => {
                warn!(%err, "unparseable telemetry message");
                Ack::error(format!("Invalid message: {err}"))
            }
        }
    }

    /// Handle one decoded message
    pub fn handle(&mut self, message: TelemetryMessage) -> Ack {
        match message {
            TelemetryMessage::Batch { device_id, records } => {
                self.ingest_records(&device_id, records)
            }
            TelemetryMessage::CompressedBatch { device_id, payload } => {
                match decompress_records(&payload) {
                    Ok(records) => self.ingest_records(&device_id, records),
                    Err(err) => Ack::error(err.to_string()),
                }
            }
            TelemetryMessage::BeginBatch {
                device_id,
                batch_id,
                total_chunks,
            } => self.begin_batch(device_id, batch_id, total_chunks),
            TelemetryMessage::BatchChunk {
                batch_id,
                chunk_index,
                records,
            } => self.accept_chunk(&batch_id, chunk_index, records),
            TelemetryMessage::IntervalSeries {
                device_id,
                start_time,
                end_time,
                interval_seconds,
                readings,
            } => {
                let spec = IntervalSpec {
                    start_time,
                    end_time,
                    interval_seconds,
                };
                self.ingest_interval(&device_id, spec, readings)
            }
        }
    }

    fn begin_batch(&mut self, device_id: String, batch_id: String, total_chunks: usize) -> Ack {
        if total_chunks == 0 {
            return Ack::error("total_chunks must be at least 1");
        }
        debug!(%batch_id, total_chunks, "chunked batch opened");
        self.pending.insert(
            batch_id.clone(),
            PendingBatch {
                device_id,
                total_chunks,
                chunks: HashMap::new(),
            },
        );
        Ack::started(format!("Batch {batch_id} opened"))
    }

    fn accept_chunk(&mut self, batch_id: &str, chunk_index: usize, records: Vec<Value>) -> Ack {
        let Some(pending) = self.pending.get_mut(batch_id) else {
            return Ack::error(format!("Unknown batch id: {batch_id}"));
        };
        if chunk_index >= pending.total_chunks {
            return Ack::error(format!(
                "Chunk index {chunk_index} out of range for batch {batch_id}"
            ));
        }

        pending.chunks.insert(chunk_index, records);
        if pending.chunks.len() < pending.total_chunks {
            return Ack::started(format!(
                "Received {}/{} chunks",
                pending.chunks.len(),
                pending.total_chunks
            ));
        }

        // All chunks present: reassemble in index order and process.
        let Some(mut pending) = self.pending.remove(batch_id) else {
            return Ack::error(format!("Unknown batch id: {batch_id}"));
        };
        let mut records = Vec::new();
        for index in 0..pending.total_chunks {
            if let Some(chunk) = pending.chunks.remove(&index) {
                records.extend(chunk);
            }
        }
        debug!(%batch_id, records = records.len(), "chunked batch complete");
        self.ingest_records(&pending.device_id, records)
    }

    fn ingest_records(&self, device_id: &str, records: Vec<Value>) -> Ack {
        let station_id = match self.resolve(device_id) {
            Ok(id) => id,
            Err(err) => return Ack::error(err.to_string()),
        };

        let mut readings = Vec::with_capacity(records.len());
        let mut errors = 0usize;
        for record in &records {
            match reading_from_item(station_id, record) {
                Ok(reading) => readings.push(reading),
                Err(err) => {
                    errors += 1;
                    debug!(%err, "telemetry record rejected");
                }
            }
        }

        match self.storage.insert_readings(readings) {
            Ok(inserted) => Ack::processed(inserted, errors),
            Err(err) => Ack::error(err.to_string()),
        }
    }

    fn ingest_interval(&self, device_id: &str, spec: IntervalSpec, readings: Vec<Value>) -> Ack {
        let station_id = match self.resolve(device_id) {
            Ok(id) => id,
            Err(err) => return Ack::error(err.to_string()),
        };

        let generated = match interval::generate(station_id, &spec, &readings) {
            Ok(generated) => generated,
            Err(err) => return Ack::error(err.to_string()),
        };

        let errors = generated.rejected;
        match self.storage.insert_readings(generated.records) {
            Ok(inserted) => Ack::processed(inserted, errors),
            Err(err) => Ack::error(err.to_string()),
        }
    }

    fn resolve(&self, device_id: &str) -> Result<u64> {
        self.storage
            .resolve_device(device_id)?
            .ok_or_else(|| Error::device_not_found(device_id))
    }
}

/// Decode a base64 + gzip record payload into its JSON record array
fn decompress_records(payload: &str) -> Result<Vec<Value>> {
    let compressed = BASE64
        .decode(payload.trim())
        .map_err(|e| Error::decode(format!("Payload is not valid base64: {e}")))?;

    let mut json = String::new();
    GzDecoder::new(compressed.as_slice())
        .read_to_string(&mut json)
        .map_err(|e| Error::decode(format!("Payload is not valid gzip: {e}")))?;

    let records: Vec<Value> = serde_json::from_str(&json)
        .map_err(|e| Error::validation(format!("Decompressed payload is not a record array: {e}")))?;
    Ok(records)
}
