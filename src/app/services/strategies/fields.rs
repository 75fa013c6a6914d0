//! Shared field access and parsing helpers for row strategies

use crate::app::services::dialect::RawRow;
use crate::constants::is_truthy;
use crate::{Error, Result};

/// Get a required field, trimmed; missing or empty fails the row
pub fn require<'a>(row: &'a RawRow, field: &str) -> Result<&'a str> {
    row.get_non_empty(field)
        .ok_or_else(|| Error::missing_field(field))
}

/// Get the first present field from a priority-ordered list.
///
/// Returns the winning field name alongside its value so errors can be
/// attributed precisely.
pub fn require_first<'a>(row: &'a RawRow, fields: &[&'static str]) -> Result<(&'static str, &'a str)> {
    for &field in fields {
        if let Some(value) = row.get_non_empty(field) {
            return Ok((field, value));
        }
    }
    Err(Error::missing_field(fields.join("|")))
}

/// Parse a numeric field value
pub fn parse_f64(field: &str, raw: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| Error::invalid_numeric(field, raw.trim()))
}

/// Parse a boolean via the permissive truthy set; absence and any
/// non-truthy value read as false
pub fn parse_flag(row: &RawRow, field: &str) -> bool {
    row.get_non_empty(field).map(is_truthy).unwrap_or(false)
}
