//! File-format dispatch and upload preview
//!
//! Uploads are dispatched on filename extension: CSV/TSV text runs the full
//! encoding + dialect pipeline, JSON is parsed structurally (a record array,
//! or a variable table pivoted into rows), Excel workbooks are read with
//! `calamine`, and NetCDF degrades gracefully to a notice since no scientific
//! library is linked into this build. JSON and Excel content converges on the
//! same [`ParsedTable`] shape the CSV path produces, so every format imports
//! through the same batch runner.

use crate::app::services::dialect::{self, ParsedTable, RawRow, RowEntry};
use crate::app::services::encoding;
use crate::constants::PREVIEW_SAMPLE_ROWS;
use crate::{Error, Result};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Supported upload formats, keyed by filename extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// `.csv` / `.txt`: encoding detection + dialect sniffing
    Csv,
    /// `.json`: record array or variable-table document
    Json,
    /// `.xls` / `.xlsx`: first worksheet read as a table
    Excel,
    /// `.nc` / `.netcdf`: metadata contract, degraded in this build
    NetCdf,
}

impl FileFormat {
    /// Dispatch on a filename's extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match extension.as_str() {
            "csv" | "txt" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "xls" | "xlsx" => Ok(Self::Excel),
            "nc" | "netcdf" => Ok(Self::NetCdf),
            _ => Err(Error::UnsupportedFormat { extension }),
        }
    }
}

/// First rows of an upload, for the pre-import inspection screen
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilePreview {
    /// Tabular content: header plus up to the first five data rows
    Table {
        fieldnames: Vec<String>,
        rows: Vec<Vec<String>>,
        total_rows: usize,
    },
    /// Scientific formats this build cannot decode
    Unavailable { message: String },
}

/// Produce rows for the batch runner from an upload in any supported format
pub fn table_from_bytes(bytes: &[u8], format: FileFormat) -> Result<ParsedTable> {
    match format {
        FileFormat::Csv => dialect::parse(&encoding::decode(bytes)),
        FileFormat::Json => table_from_json(bytes),
        FileFormat::Excel => table_from_excel(bytes),
        FileFormat::NetCdf => Err(Error::UnsupportedFormat {
            extension: "netcdf (no scientific library in this build)".to_string(),
        }),
    }
}

/// Sample an upload for display without importing it
pub fn preview(bytes: &[u8], format: FileFormat) -> Result<FilePreview> {
    if format == FileFormat::NetCdf {
        return Ok(FilePreview::Unavailable {
            message: "NetCDF metadata extraction requires a scientific library \
                      that is not linked into this build"
                .to_string(),
        });
    }

    let table = table_from_bytes(bytes, format)?;
    let rows = table
        .rows
        .iter()
        .filter_map(|entry| entry.result.as_ref().ok())
        .take(PREVIEW_SAMPLE_ROWS)
        .map(|row| row.iter().map(|(_, v)| v.to_string()).collect())
        .collect();
    Ok(FilePreview::Table {
        fieldnames: table.fieldnames.clone(),
        rows,
        total_rows: table.total_rows(),
    })
}

/// Parse a JSON upload into header-keyed rows.
///
/// Two document shapes are recognized: a plain array of record objects, and
/// the variable-table form `{metadata?, variables?, data: {var: {times,
/// values}}}`, which is pivoted into one row per distinct timestamp with one
/// column per variable.
pub fn table_from_json(bytes: &[u8]) -> Result<ParsedTable> {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(Error::EmptyFile);
    }
    let document: Value = serde_json::from_slice(bytes)?;

    match &document {
        Value::Array(records) => table_from_records(records),
        Value::Object(object) => match object.get("data") {
            Some(Value::Object(data)) => table_from_variables(data),
            _ => Err(Error::validation(
                "JSON document is neither a record array nor a variable table",
            )),
        },
        _ => Err(Error::validation(
            "JSON document is neither a record array nor a variable table",
        )),
    }
}

fn table_from_records(records: &[Value]) -> Result<ParsedTable> {
    // Column order: first appearance across all records.
    let mut fieldnames: Vec<String> = Vec::new();
    for record in records {
        let object = record
            .as_object()
            .ok_or_else(|| Error::validation("record array entry is not an object"))?;
        for key in object.keys() {
            if !fieldnames.iter().any(|f| f == key) {
                fieldnames.push(key.clone());
            }
        }
    }
    if fieldnames.is_empty() {
        return Err(Error::NoHeaders);
    }

    let columns: Arc<[String]> = fieldnames.clone().into();
    let rows = records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let values = columns
                .iter()
                .map(|name| record.get(name).map(render_cell).unwrap_or_default())
                .collect();
            RowEntry {
                // Record ordinal; JSON has no meaningful physical lines.
                line: index + 1,
                result: Ok(RawRow::new(Arc::clone(&columns), values)),
            }
        })
        .collect();

    debug!(records = records.len(), "parsed JSON record array");
    Ok(ParsedTable { fieldnames, rows })
}

fn table_from_variables(data: &serde_json::Map<String, Value>) -> Result<ParsedTable> {
    let mut fieldnames = vec!["timestamp".to_string()];
    let mut series: Vec<(&String, &Vec<Value>, &Vec<Value>)> = Vec::new();
    let mut timestamps: BTreeSet<String> = BTreeSet::new();

    for (variable, entry) in data {
        let object = entry
            .as_object()
            .ok_or_else(|| Error::validation(format!("variable {variable} is not an object")))?;
        let times = object
            .get("times")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::validation(format!("variable {variable} has no times array")))?;
        let values = object
            .get("values")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::validation(format!("variable {variable} has no values array")))?;
        if times.len() != values.len() {
            return Err(Error::validation(format!(
                "variable {variable}: {} times but {} values",
                times.len(),
                values.len()
            )));
        }

        for time in times {
            timestamps.insert(render_cell(time));
        }
        fieldnames.push(variable.clone());
        series.push((variable, times, values));
    }
    if series.is_empty() {
        return Err(Error::NoHeaders);
    }

    let columns: Arc<[String]> = fieldnames.clone().into();
    let rows = timestamps
        .iter()
        .enumerate()
        .map(|(index, timestamp)| {
            let mut values = vec![timestamp.clone()];
            for (_, times, cells) in &series {
                let cell = times
                    .iter()
                    .position(|t| render_cell(t) == *timestamp)
                    .map(|i| render_cell(&cells[i]))
                    .unwrap_or_default();
                values.push(cell);
            }
            RowEntry {
                line: index + 1,
                result: Ok(RawRow::new(Arc::clone(&columns), values)),
            }
        })
        .collect();

    debug!(
        variables = series.len(),
        timestamps = timestamps.len(),
        "pivoted JSON variable table"
    );
    Ok(ParsedTable { fieldnames, rows })
}

fn table_from_excel(bytes: &[u8]) -> Result<ParsedTable> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| Error::spreadsheet(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| Error::spreadsheet("workbook has no worksheets"))?
        .map_err(|e| Error::spreadsheet(e.to_string()))?;

    let mut rows_iter = range.rows();
    let fieldnames: Vec<String> = rows_iter
        .next()
        .map(|header| header.iter().map(render_excel_cell).collect())
        .unwrap_or_default();
    if fieldnames.iter().all(|f| f.trim().is_empty()) {
        return Err(Error::NoHeaders);
    }

    let columns: Arc<[String]> = fieldnames.clone().into();
    let rows = rows_iter
        .enumerate()
        .map(|(index, cells)| RowEntry {
            // Worksheet row number: header is row 1.
            line: index + 2,
            result: Ok(RawRow::new(
                Arc::clone(&columns),
                cells.iter().map(render_excel_cell).collect(),
            )),
        })
        .collect();

    Ok(ParsedTable { fieldnames, rows })
}

// Scalars render without JSON quoting so "12.5" and 12.5 import identically.
fn render_cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn render_excel_cell(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_dispatch() {
        assert_eq!(FileFormat::from_path(Path::new("a.csv")).unwrap(), FileFormat::Csv);
        assert_eq!(FileFormat::from_path(Path::new("a.TXT")).unwrap(), FileFormat::Csv);
        assert_eq!(FileFormat::from_path(Path::new("a.json")).unwrap(), FileFormat::Json);
        assert_eq!(FileFormat::from_path(Path::new("a.xlsx")).unwrap(), FileFormat::Excel);
        assert_eq!(FileFormat::from_path(Path::new("a.nc")).unwrap(), FileFormat::NetCdf);
        assert!(FileFormat::from_path(Path::new("a.parquet")).is_err());
    }

    #[test]
    fn test_json_record_array() {
        let bytes = br#"[
            {"name": "Station A", "latitude": 37.7, "longitude": -122.4},
            {"name": "Station B", "latitude": 40.0, "longitude": -105.0, "elevation": 1600}
        ]"#;
        let table = table_from_json(bytes).unwrap();

        assert_eq!(
            table.fieldnames,
            vec!["name", "latitude", "longitude", "elevation"]
        );
        assert_eq!(table.total_rows(), 2);

        let first = table.rows[0].result.as_ref().unwrap();
        assert_eq!(first.get("name"), Some("Station A"));
        assert_eq!(first.get("latitude"), Some("37.7"));
        assert_eq!(first.get("elevation"), Some(""));
    }

    #[test]
    fn test_json_variable_table_pivots_per_timestamp() {
        let bytes = br#"{
            "metadata": {"source": "sensor"},
            "data": {
                "temperature": {
                    "times": ["2024-01-01T00:00:00Z", "2024-01-01T01:00:00Z"],
                    "values": [10.0, 11.0]
                },
                "humidity": {
                    "times": ["2024-01-01T01:00:00Z"],
                    "values": [60.0]
                }
            }
        }"#;
        let table = table_from_json(bytes).unwrap();

        assert_eq!(table.fieldnames[0], "timestamp");
        assert_eq!(table.total_rows(), 2); // one row per distinct timestamp

        let second = table.rows[1].result.as_ref().unwrap();
        assert_eq!(second.get("temperature"), Some("11.0"));
        assert_eq!(second.get("humidity"), Some("60.0"));

        let first = table.rows[0].result.as_ref().unwrap();
        assert_eq!(first.get("humidity"), Some("")); // no value at that time
    }

    #[test]
    fn test_json_shape_errors() {
        assert!(matches!(table_from_json(b"  "), Err(Error::EmptyFile)));
        assert!(table_from_json(b"42").is_err());
        assert!(table_from_json(br#"{"notdata": {}}"#).is_err());
        assert!(matches!(table_from_json(b"[]"), Err(Error::NoHeaders)));
    }

    #[test]
    fn test_mismatched_series_lengths_rejected() {
        let bytes = br#"{"data": {"temperature": {"times": ["2024-01-01"], "values": [1.0, 2.0]}}}"#;
        assert!(table_from_json(bytes).is_err());
    }

    #[test]
    fn test_csv_preview_samples_first_rows() {
        let mut csv = String::from("name,latitude,longitude\n");
        for i in 0..10 {
            csv.push_str(&format!("Station {i},0.0,0.0\n"));
        }
        let preview = preview(csv.as_bytes(), FileFormat::Csv).unwrap();

        match preview {
            FilePreview::Table {
                fieldnames,
                rows,
                total_rows,
            } => {
                assert_eq!(fieldnames, vec!["name", "latitude", "longitude"]);
                assert_eq!(rows.len(), PREVIEW_SAMPLE_ROWS);
                assert_eq!(rows[0][0], "Station 0");
                assert_eq!(total_rows, 10);
            }
            other => panic!("expected table preview, got {other:?}"),
        }
    }

    #[test]
    fn test_netcdf_preview_degrades() {
        let preview = preview(&[0u8; 16], FileFormat::NetCdf).unwrap();
        assert!(matches!(preview, FilePreview::Unavailable { .. }));
    }
}
