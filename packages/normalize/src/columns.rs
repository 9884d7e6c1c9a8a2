//! Column header resolution.
//!
//! CSV exports name their columns inconsistently (`Album` vs `Title`,
//! `Released` vs `Year`, upper vs lower case). Each target field has an
//! ordered list of header synonyms; the first synonym present in the header
//! row wins. Resolution happens once per parse.

use strum_macros::{AsRefStr, Display, EnumIter};

/// A [`crate_digger_collection_models::RecordEntry`] field that can be read
/// from a CSV column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Field {
    /// Artist name.
    Artist,
    /// Album title.
    Title,
    /// Release year or date.
    Year,
    /// Genre or style.
    Genre,
    /// Record label.
    Label,
    /// Media format.
    Format,
}

impl Field {
    /// Header synonyms for this field, lowercase, in priority order.
    #[must_use]
    pub const fn synonyms(self) -> &'static [&'static str] {
        match self {
            Self::Artist => &["artist", "artists", "album artist"],
            Self::Title => &["album", "title", "release title", "release"],
            Self::Year => &["year", "released", "release year"],
            Self::Genre => &["genre", "genres", "style", "styles"],
            Self::Label => &["label", "labels", "record label"],
            Self::Format => &["format", "formats", "media"],
        }
    }
}

/// Column index resolved for each field, `None` when the CSV has no
/// recognizable column for it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMapping {
    /// Column holding the artist.
    pub artist: Option<usize>,
    /// Column holding the album title.
    pub title: Option<usize>,
    /// Column holding the year.
    pub year: Option<usize>,
    /// Column holding the genre.
    pub genre: Option<usize>,
    /// Column holding the label.
    pub label: Option<usize>,
    /// Column holding the format.
    pub format: Option<usize>,
}

impl ColumnMapping {
    /// Resolves the header row against every field's synonym list.
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace.
    #[must_use]
    pub fn resolve<S: AsRef<str>>(headers: &[S]) -> Self {
        let normalized: Vec<String> = headers
            .iter()
            .map(|h| h.as_ref().trim().to_lowercase())
            .collect();

        let find = |field: Field| {
            field
                .synonyms()
                .iter()
                .find_map(|syn| normalized.iter().position(|h| h == syn))
        };

        Self {
            artist: find(Field::Artist),
            title: find(Field::Title),
            year: find(Field::Year),
            genre: find(Field::Genre),
            label: find(Field::Label),
            format: find(Field::Format),
        }
    }

    /// Returns the resolved column for `field`.
    #[must_use]
    pub const fn column(&self, field: Field) -> Option<usize> {
        match field {
            Field::Artist => self.artist,
            Field::Title => self.title,
            Field::Year => self.year,
            Field::Genre => self.genre,
            Field::Label => self.label,
            Field::Format => self.format,
        }
    }

    /// Whether both required fields (artist and title) have a column.
    ///
    /// When this is `false` every row will be dropped.
    #[must_use]
    pub const fn has_required(&self) -> bool {
        self.artist.is_some() && self.title.is_some()
    }
}
