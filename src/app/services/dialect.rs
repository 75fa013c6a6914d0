//! CSV dialect sniffing and defensive row parsing
//!
//! Turns decoded text into an ordered sequence of header-keyed rows. The
//! delimiter is sniffed over a leading window of the content; individual
//! malformed rows are carried as per-row errors so the batch runner can record
//! them without aborting the file.

use crate::constants::{CANDIDATE_DELIMITERS, DEFAULT_DELIMITER, SNIFF_WINDOW_CHARS};
use crate::{Error, Result};
use std::sync::Arc;
use tracing::debug;

/// One raw CSV row: header name -> raw string value, in column order
#[derive(Debug, Clone)]
pub struct RawRow {
    columns: Arc<[String]>,
    values: Vec<String>,
}

impl RawRow {
    /// Build a row from the shared header and its values
    pub fn new(columns: Arc<[String]>, values: Vec<String>) -> Self {
        Self { columns, values }
    }

    /// Raw value for a header name; None when the column is absent.
    /// Trailing missing cells in a short row read as None.
    pub fn get(&self, name: &str) -> Option<&str> {
        let index = self.columns.iter().position(|c| c == name)?;
        self.values.get(index).map(String::as_str)
    }

    /// Trimmed, non-empty value for a header name
    pub fn get_non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).map(str::trim).filter(|v| !v.is_empty())
    }

    /// Column names in file order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Iterate (header, value) pairs in column order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns
            .iter()
            .zip(self.values.iter())
            .map(|(c, v)| (c.as_str(), v.as_str()))
    }

    /// Compact single-line rendering used in error records
    pub fn snippet(&self) -> String {
        let mut joined = self.values.join(",");
        if joined.len() > 120 {
            joined.truncate(117);
            joined.push_str("...");
        }
        joined
    }
}

/// One parsed data row with its physical line number.
/// Malformed rows are kept in place as errors rather than dropped.
#[derive(Debug)]
pub struct RowEntry {
    /// 1-based physical line number in the source file
    pub line: usize,
    pub result: Result<RawRow>,
}

/// Output of dialect parsing: ordered field names plus all data rows
#[derive(Debug)]
pub struct ParsedTable {
    pub fieldnames: Vec<String>,
    pub rows: Vec<RowEntry>,
}

impl ParsedTable {
    /// Total number of data rows, malformed ones included
    pub fn total_rows(&self) -> usize {
        self.rows.len()
    }
}

/// Sniff the field delimiter over the leading window of the content.
///
/// The candidate with the highest count in the header line wins; ties and
/// absence fall back to comma.
pub fn sniff_delimiter(text: &str) -> u8 {
    let window: String = text.chars().take(SNIFF_WINDOW_CHARS).collect();
    let header_line = window.lines().next().unwrap_or("");

    let mut best = DEFAULT_DELIMITER;
    let mut best_count = 0usize;
    for &candidate in CANDIDATE_DELIMITERS {
        let count = header_line.bytes().filter(|&b| b == candidate).count();
        if count > best_count {
            best = candidate;
            best_count = count;
        }
    }
    best
}

/// Parse decoded text into header-keyed rows.
///
/// Fails with [`Error::EmptyFile`] on empty input and [`Error::NoHeaders`]
/// when the header row yields no field names. Individual row failures are
/// carried in the returned entries.
pub fn parse(text: &str) -> Result<ParsedTable> {
    if text.trim().is_empty() {
        return Err(Error::EmptyFile);
    }

    let delimiter = sniff_delimiter(text);
    debug!(delimiter = %(delimiter as char), "sniffed CSV dialect");

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(false)
        .trim(csv::Trim::None)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(Error::NoHeaders);
    }
    // Empty header cells keep their position so every value stays under its
    // real column; they get a positional placeholder name instead.
    let fieldnames: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(index, h)| {
            let trimmed = h.trim();
            if trimmed.is_empty() {
                format!("column_{}", index + 1)
            } else {
                trimmed.to_string()
            }
        })
        .collect();

    let columns: Arc<[String]> = fieldnames.clone().into();
    let mut rows = Vec::new();
    let mut records = reader.into_records();
    loop {
        // Position is taken before the read so the line number points at the
        // start of the (possibly multi-line) record.
        let line = records.reader().position().line() as usize;
        match records.next() {
            Some(Ok(record)) => {
                let values: Vec<String> = record.iter().map(|v| v.to_string()).collect();
                rows.push(RowEntry {
                    line,
                    result: Ok(RawRow::new(Arc::clone(&columns), values)),
                });
            }
            Some(Err(err)) => {
                let line = match err.kind() {
                    csv::ErrorKind::UnequalLengths { pos, .. } => pos
                        .as_ref()
                        .map(|p| p.line() as usize)
                        .unwrap_or(line),
                    _ => line,
                };
                rows.push(RowEntry {
                    line,
                    result: Err(Error::malformed_row(line, err.to_string())),
                });
            }
            None => break,
        }
    }

    debug!(
        fields = fieldnames.len(),
        rows = rows.len(),
        "parsed tabular content"
    );
    Ok(ParsedTable { fieldnames, rows })
}
