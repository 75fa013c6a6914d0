//! Climate Ingest Library
//!
//! A Rust library for ingesting tabular climate observation data from uploaded
//! files and device telemetry into a research-data portal's storage layer.
//!
//! This library provides tools for:
//! - Detecting the byte encoding of uploaded files with a confidence-scored
//!   fallback chain
//! - Sniffing CSV dialects and parsing rows defensively, one error per row
//! - Driving row-by-row processing in fixed-size transactional batches with
//!   partial-failure isolation
//! - Converting raw rows into typed domain records through per-import-type
//!   strategies (stations, climate readings, data types, countries)
//! - Buffering live readings in bounded per-station stacks with
//!   auto-flush-on-threshold
//! - Handling device telemetry sessions: single-shot, compressed, chunked and
//!   interval-generated batches

pub mod config;
pub mod constants;

// Core application modules
pub mod app {
    pub mod models;
    pub mod storage;
    pub mod services {
        pub mod batch_runner;
        pub mod data_stack;
        pub mod dialect;
        pub mod encoding;
        pub mod formats;
        pub mod importer;
        pub mod progress;
        pub mod scanner;
        pub mod strategies;
        pub mod telemetry;
    }
}

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use app::models::{ClimateMetrics, CountryRecord, DataTypeRecord, ReadingRecord, StationRecord};
pub use app::services::importer::Importer;
pub use app::services::progress::{ImportProgress, Summary};
pub use app::storage::{InMemoryStorage, Storage, StorageError};
pub use config::IngestConfig;

/// Result type alias for ingestion operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy for the ingestion pipeline
///
/// Row-level variants (`MissingRequiredField`, `InvalidNumeric`, `InvalidDate`,
/// `EntityNotFound`, `MalformedRow`, `StackFull`) are caught per row and turned
/// into progress entries; `Storage` failures are caught per batch; only the
/// file-level variants (`EmptyFile`, `NoHeaders`) abort an import before any
/// batch starts. `Decode` failures on telemetry payloads yield an error ack.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Uploaded file decoded to an empty string
    #[error("File is empty")]
    EmptyFile,

    /// Header row yielded no field names
    #[error("No column headers found in file")]
    NoHeaders,

    /// A single row could not be parsed (column-count mismatch, bad quoting)
    #[error("Malformed row at line {line}: {message}")]
    MalformedRow { line: usize, message: String },

    /// A required column is missing or empty
    #[error("Missing required field '{field}'")]
    MissingRequiredField { field: String },

    /// A numeric column failed to parse
    #[error("Invalid numeric value for '{field}': '{value}'")]
    InvalidNumeric { field: String, value: String },

    /// A date/time column failed to parse
    #[error("Invalid date/time value for '{field}': '{value}'")]
    InvalidDate { field: String, value: String },

    /// A referenced station/device/entity could not be resolved
    #[error("{kind} not found: '{reference}'")]
    EntityNotFound { kind: String, reference: String },

    /// A data stack rejected a push because it is at capacity
    #[error("Data stack is full (capacity {capacity})")]
    StackFull { capacity: usize },

    /// Byte content could not be decoded (base64 or gzip envelope)
    #[error("Unable to decode content: {message}")]
    Decode { message: String },

    /// Telemetry payload failed shape validation
    #[error("Invalid telemetry payload: {message}")]
    Validation { message: String },

    /// Storage layer failure (batch commit, lookup, bulk insert)
    #[error("Storage error: {0}")]
    Storage(#[from] app::storage::StorageError),

    /// Unsupported or unrecognized file format
    #[error("Unsupported file format: {extension}")]
    UnsupportedFormat { extension: String },

    /// Spreadsheet reading error
    #[error("Spreadsheet error: {message}")]
    Spreadsheet { message: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reader failure outside row scope
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON parse failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a malformed-row error with line context
    pub fn malformed_row(line: usize, message: impl Into<String>) -> Self {
        Self::MalformedRow {
            line,
            message: message.into(),
        }
    }

    /// Create a missing-required-field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingRequiredField {
            field: field.into(),
        }
    }

    /// Create an invalid-numeric error
    pub fn invalid_numeric(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidNumeric {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create an invalid-date error
    pub fn invalid_date(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidDate {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a station-not-found error
    pub fn station_not_found(reference: impl Into<String>) -> Self {
        Self::EntityNotFound {
            kind: "Station".to_string(),
            reference: reference.into(),
        }
    }

    /// Create a device-not-found error
    pub fn device_not_found(reference: impl Into<String>) -> Self {
        Self::EntityNotFound {
            kind: "Device".to_string(),
            reference: reference.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create a telemetry validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a spreadsheet error
    pub fn spreadsheet(message: impl Into<String>) -> Self {
        Self::Spreadsheet {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// The field name this error is attributed to, when it has one
    ///
    /// Used to populate the `field` slot of progress error records.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::MissingRequiredField { field }
            | Self::InvalidNumeric { field, .. }
            | Self::InvalidDate { field, .. } => Some(field),
            _ => None,
        }
    }
}
