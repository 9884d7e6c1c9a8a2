#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Flexible-schema CSV parsing for record collection exports.
//!
//! Parses a Discogs-style CSV export (or any CSV with recognizable column
//! names) into an ordered list of [`RecordEntry`] values. Column names are
//! matched case-insensitively against synonym lists (see [`columns`]), and
//! every row goes through the same cleaning rules as the Discogs API
//! fetcher (see [`fields`]).
//!
//! Rows without an artist or title are dropped silently. The only hard
//! failure is input that is not delimited text at all.

pub mod columns;
pub mod fields;

pub use columns::{ColumnMapping, Field};
pub use fields::{RawRecord, clean_artist_name, normalize_record, normalize_year};

use crate_digger_collection_models::RecordEntry;

/// UTF-8 byte order mark written by some spreadsheet exports.
const UTF8_BOM: &str = "\u{feff}";

/// Errors that can occur while normalizing a CSV upload.
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    /// The input is not text (invalid UTF-8 or binary data).
    #[error("CSV is not valid text: {message}")]
    Decode {
        /// Description of what went wrong.
        message: String,
    },

    /// The CSV reader rejected the input.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// The result of parsing a CSV, with the details of how columns resolved.
#[derive(Debug, Clone)]
pub struct CsvInspection {
    /// Trimmed header row.
    pub headers: Vec<String>,
    /// Resolved column for each field.
    pub mapping: ColumnMapping,
    /// Number of data rows read (excluding the header).
    pub row_count: usize,
    /// Rows that produced a valid entry, in file order.
    pub entries: Vec<RecordEntry>,
}

impl CsvInspection {
    /// Number of rows dropped for missing artist or title.
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.row_count - self.entries.len()
    }
}

/// Parses raw CSV bytes into record entries.
///
/// # Errors
///
/// Returns [`NormalizeError`] if the bytes cannot be decoded as delimited
/// text.
pub fn parse_csv(bytes: &[u8]) -> Result<Vec<RecordEntry>, NormalizeError> {
    inspect_csv(bytes).map(|inspection| inspection.entries)
}

/// Parses raw CSV bytes and reports how the columns were resolved.
///
/// # Errors
///
/// Returns [`NormalizeError`] if the bytes cannot be decoded as delimited
/// text.
pub fn inspect_csv(bytes: &[u8]) -> Result<CsvInspection, NormalizeError> {
    let text = decode(bytes)?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_owned())
        .collect();

    let mapping = ColumnMapping::resolve(&headers);
    log::debug!("Resolved CSV columns {mapping:?} from headers {headers:?}");

    if !mapping.has_required() {
        log::warn!("CSV has no recognizable artist and title columns; every row will be dropped");
    }

    let mut entries = Vec::new();
    let mut row_count = 0usize;

    for result in reader.records() {
        let record = result?;
        row_count += 1;

        let cell = |field: Field| {
            mapping
                .column(field)
                .and_then(|i| record.get(i))
                .unwrap_or("")
                .to_owned()
        };

        let raw = RawRecord {
            artist: cell(Field::Artist),
            title: cell(Field::Title),
            year: cell(Field::Year),
            genre: cell(Field::Genre),
            label: cell(Field::Label),
            format: cell(Field::Format),
        };

        match normalize_record(&raw) {
            Some(entry) => entries.push(entry),
            None => log::trace!("Dropping CSV row {row_count}: missing artist or title"),
        }
    }

    log::info!(
        "Parsed {} record entries from {row_count} CSV rows ({} dropped)",
        entries.len(),
        row_count - entries.len(),
    );

    Ok(CsvInspection {
        headers,
        mapping,
        row_count,
        entries,
    })
}

/// Decodes the upload as UTF-8 text, rejecting binary data.
fn decode(bytes: &[u8]) -> Result<&str, NormalizeError> {
    let text = std::str::from_utf8(bytes).map_err(|e| NormalizeError::Decode {
        message: e.to_string(),
    })?;

    if text.contains('\0') {
        return Err(NormalizeError::Decode {
            message: "input contains NUL bytes".to_owned(),
        });
    }

    Ok(text.strip_prefix(UTF8_BOM).unwrap_or(text))
}
