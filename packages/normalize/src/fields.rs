//! Field-level normalization shared by every collection source.
//!
//! CSV rows and Discogs API items both land in a [`RawRecord`] first and go
//! through [`normalize_record`], so the two sources produce identical
//! [`RecordEntry`] values for identical data.

use crate_digger_collection_models::RecordEntry;

/// Untrusted field values read from a source, before cleaning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    /// Artist name as the source spells it.
    pub artist: String,
    /// Album title.
    pub title: String,
    /// Year or full release date.
    pub year: String,
    /// Genre, possibly several joined by commas.
    pub genre: String,
    /// Record label.
    pub label: String,
    /// Media format.
    pub format: String,
}

/// Cleans a raw record into a [`RecordEntry`].
///
/// Returns `None` when the artist or title is empty after cleaning; such
/// rows are dropped silently by every caller.
#[must_use]
pub fn normalize_record(raw: &RawRecord) -> Option<RecordEntry> {
    let artist = clean_artist_name(&raw.artist);

    RecordEntry::new(&artist, &raw.title).map(|entry| {
        entry
            .with_year(&normalize_year(&raw.year))
            .with_genre(&raw.genre)
            .with_label(&raw.label)
            .with_format(&raw.format)
    })
}

/// Strips Discogs naming artifacts from an artist name.
///
/// Discogs disambiguates artists sharing a name with a numeric suffix
/// (`"Nirvana (2)"`) and marks name variations with a trailing asterisk
/// (`"Prince*"`). Neither is part of the artist's actual name.
#[must_use]
pub fn clean_artist_name(name: &str) -> String {
    let mut name = name.trim();

    if let Some(stripped) = name.strip_suffix('*') {
        name = stripped.trim_end();
    }

    if let Some(open) = name.rfind(" (")
        && let Some(inner) = name[open + 2..].strip_suffix(')')
        && !inner.is_empty()
        && inner.bytes().all(|b| b.is_ascii_digit())
    {
        name = name[..open].trim_end();
    }

    name.to_owned()
}

/// Reduces a year or release date to a plain year string.
///
/// `"0"` and blank values mean unknown and become empty. A value starting
/// with a four-digit year followed by a date separator (`"1977-05-01"`) is
/// cut to the year. Anything else is kept as-is after trimming.
#[must_use]
pub fn normalize_year(raw: &str) -> String {
    let year = raw.trim();

    if year.is_empty() || year == "0" {
        return String::new();
    }

    let bytes = year.as_bytes();
    if bytes.len() > 4
        && bytes[..4].iter().all(u8::is_ascii_digit)
        && matches!(bytes[4], b'-' | b'/' | b'.')
    {
        return year[..4].to_owned();
    }

    year.to_owned()
}
