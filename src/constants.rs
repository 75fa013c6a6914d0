//! Application constants for the ingestion pipeline
//!
//! This module contains configuration defaults, fallback tables, and field
//! mappings used throughout the import and telemetry paths.

// =============================================================================
// Batch Processing
// =============================================================================

/// Default number of rows committed per transactional batch
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Maximum number of error/warning samples retained in a progress report.
/// Counts stay exact past the cap; only the sample lists are truncated.
pub const ERROR_SAMPLE_CAP: usize = 100;

// =============================================================================
// Encoding Detection
// =============================================================================

/// Minimum statistical-detector confidence before the fallback chain is used
pub const ENCODING_CONFIDENCE_THRESHOLD: f32 = 0.7;

/// Ordered candidate encodings tried when statistical detection is inconclusive
pub const FALLBACK_ENCODINGS: &[&str] =
    &["utf-8", "latin1", "iso-8859-1", "windows-1252", "utf-16"];

/// Number of leading bytes trial-decoded per fallback candidate
pub const ENCODING_SAMPLE_BYTES: usize = 1000;

/// Encoding assumed when every candidate fails
pub const DEFAULT_ENCODING: &str = "utf-8";

// =============================================================================
// CSV Dialect Sniffing
// =============================================================================

/// Number of leading characters examined when sniffing the dialect
pub const SNIFF_WINDOW_CHARS: usize = 1024;

/// Candidate field delimiters, most common first
pub const CANDIDATE_DELIMITERS: &[u8] = &[b',', b';', b'\t', b'|'];

/// Default delimiter when sniffing is inconclusive
pub const DEFAULT_DELIMITER: u8 = b',';

// =============================================================================
// Climate Metric Fields
// =============================================================================

/// Recognized climate/field metric column names, in canonical order
pub const METRIC_FIELDS: &[&str] = &[
    "temperature",
    "humidity",
    "precipitation",
    "wind_speed",
    "wind_direction",
    "barometric_pressure",
    "cloud_cover",
    "soil_moisture",
    "water_level",
    "uv_index",
    "air_quality_index",
];

/// Station reference columns for climate imports, in resolution priority order
pub const STATION_REFERENCE_FIELDS: &[&str] = &["station_name", "station_id", "station"];

/// Optional station columns captured as metadata rather than warned about
pub const STATION_OPTIONAL_FIELDS: &[&str] =
    &["station_id", "description", "elevation", "country", "active"];

// =============================================================================
// Value Parsing
// =============================================================================

/// Strings accepted as boolean true, compared case-insensitively
pub const TRUTHY_VALUES: &[&str] = &["true", "yes", "1", "t", "y"];

/// Datetime formats attempted in order when parsing timestamp columns
pub const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y",
];

// =============================================================================
// Data Stack Defaults
// =============================================================================

/// Default stack capacity for a newly created station/device buffer
pub const DEFAULT_STACK_MAX_SIZE: usize = 500;

/// Default auto-process threshold (only honored when auto-process is enabled)
pub const DEFAULT_STACK_THRESHOLD: usize = 100;

// =============================================================================
// File Format Dispatch
// =============================================================================

/// Number of rows sampled when previewing tabular uploads
pub const PREVIEW_SAMPLE_ROWS: usize = 5;

/// Check whether a string is in the permissive truthy set
pub fn is_truthy(value: &str) -> bool {
    let lowered = value.trim().to_ascii_lowercase();
    TRUTHY_VALUES.contains(&lowered.as_str())
}
