//! CSV batch parsing.
//!
//! Handles header validation and row-by-row decoding of a batch file into
//! [`RequestFields`]. Malformed rows are reported and skipped; they never
//! fail the whole batch.

use serde::Serialize;
use thiserror::Error;

use acctbatch_core::RequestFields;

/// Columns every batch file must carry.
pub const REQUIRED_COLUMNS: &[&str] = &[
    "AccountName",
    "AccountEmail",
    "SSOUserEmail",
    "SSOUserFirstName",
    "SSOUserLastName",
    "OrgUnit",
];

/// Token used in the batch file for a value that was not supplied.
pub const MISSING_VALUE: &str = "None";

/// UTF-8 BOM bytes.
const UTF8_BOM: &str = "\u{feff}";

/// Errors that reject a whole batch.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("batch file is empty")]
    Empty,

    #[error("failed to read batch header: {0}")]
    Header(String),

    #[error("batch header is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

/// A decoded data row.
#[derive(Debug, Clone)]
pub struct BatchRow {
    /// 1-based line number (header = 1, first data row = 2).
    pub line_number: usize,
    pub fields: RequestFields,
}

/// A row that could not be decoded.
#[derive(Debug, Clone, Serialize)]
pub struct RowError {
    pub line_number: usize,
    pub message: String,
}

/// Result of parsing a complete batch.
#[derive(Debug, Default)]
pub struct ParsedBatch {
    pub rows: Vec<BatchRow>,
    pub errors: Vec<RowError>,
}

impl ParsedBatch {
    /// Total data rows seen, decoded or not.
    #[must_use]
    pub fn total_rows(&self) -> usize {
        self.rows.len() + self.errors.len()
    }
}

/// Parse batch file contents.
pub fn parse_batch(content: &str) -> Result<ParsedBatch, BatchError> {
    let content = content.strip_prefix(UTF8_BOM).unwrap_or(content);
    if content.trim().is_empty() {
        return Err(BatchError::Empty);
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| BatchError::Header(e.to_string()))?
        .clone();

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .map(str::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(BatchError::MissingColumns(missing));
    }

    let mut batch = ParsedBatch::default();

    for (idx, result) in reader.deserialize::<RequestFields>().enumerate() {
        let line_number = idx + 2;
        match result {
            Ok(fields) => batch.rows.push(BatchRow {
                line_number,
                fields,
            }),
            Err(e) => batch.errors.push(RowError {
                line_number,
                message: format!("Failed to parse batch row: {e}"),
            }),
        }
    }

    Ok(batch)
}
