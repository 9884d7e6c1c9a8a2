#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Uniform record collection types shared by every crate digger component.
//!
//! Both collection sources (uploaded CSV exports and the live Discogs API)
//! produce [`RecordEntry`] values. The summarizer turns a list of entries
//! into a [`CollectionReport`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Genre used when a source does not provide one.
pub const DEFAULT_GENRE: &str = "Unknown";

/// One album in a collection, independent of where it came from.
///
/// Fields are private so that every entry upholds the invariant that
/// `artist` and `title` are non-empty. Use [`RecordEntry::new`] to build one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordEntry {
    artist: String,
    title: String,
    year: String,
    genre: String,
    label: String,
    format: String,
}

impl RecordEntry {
    /// Creates an entry from an artist and title.
    ///
    /// Both values are trimmed. Returns `None` if either is empty after
    /// trimming.
    #[must_use]
    pub fn new(artist: &str, title: &str) -> Option<Self> {
        let artist = artist.trim();
        let title = title.trim();

        if artist.is_empty() || title.is_empty() {
            return None;
        }

        Some(Self {
            artist: artist.to_owned(),
            title: title.to_owned(),
            year: String::new(),
            genre: DEFAULT_GENRE.to_owned(),
            label: String::new(),
            format: String::new(),
        })
    }

    /// Sets the release year. Blank values leave the year unknown.
    #[must_use]
    pub fn with_year(mut self, year: &str) -> Self {
        year.trim().clone_into(&mut self.year);
        self
    }

    /// Sets the genre. Blank values fall back to [`DEFAULT_GENRE`].
    #[must_use]
    pub fn with_genre(mut self, genre: &str) -> Self {
        let genre = genre.trim();
        self.genre = if genre.is_empty() {
            DEFAULT_GENRE.to_owned()
        } else {
            genre.to_owned()
        };
        self
    }

    /// Sets the record label.
    #[must_use]
    pub fn with_label(mut self, label: &str) -> Self {
        label.trim().clone_into(&mut self.label);
        self
    }

    /// Sets the physical or digital format (e.g. `"Vinyl, LP"`).
    #[must_use]
    pub fn with_format(mut self, format: &str) -> Self {
        format.trim().clone_into(&mut self.format);
        self
    }

    /// Artist name. Never empty.
    #[must_use]
    pub fn artist(&self) -> &str {
        &self.artist
    }

    /// Album title. Never empty.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Release year, or an empty string if unknown.
    #[must_use]
    pub fn year(&self) -> &str {
        &self.year
    }

    /// Genre, [`DEFAULT_GENRE`] if unknown.
    #[must_use]
    pub fn genre(&self) -> &str {
        &self.genre
    }

    /// Record label, or an empty string if unknown.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Format, or an empty string if unknown.
    #[must_use]
    pub fn format(&self) -> &str {
        &self.format
    }
}

/// Where a collection was read from.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CollectionSource {
    /// An uploaded CSV export.
    Csv,
    /// The authenticated user's Discogs collection.
    Discogs,
}

/// The generated narrative report for one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionReport {
    /// Free-form text returned by the LLM, stored verbatim.
    pub narrative_text: String,
    /// Number of entries actually sent to the LLM.
    pub sample_size: usize,
    /// Size of the full collection before sampling.
    pub total_count: usize,
    /// Which source the collection came from.
    pub source: CollectionSource,
    /// When the report was generated.
    pub generated_at: DateTime<Utc>,
}
