//! Sampling and prompt construction.

use std::fmt::Write as _;

use crate_digger_collection_models::{DEFAULT_GENRE, RecordEntry};

/// Maximum number of entries sent to the LLM.
pub const SAMPLE_LIMIT: usize = 100;

/// System prompt framing every summarization call.
pub const SYSTEM_PROMPT: &str = "You are a knowledgeable music critic and record collection \
analyst. Provide thoughtful, specific insights about record collections and always answer \
with a single JSON object.";

/// Returns the first [`SAMPLE_LIMIT`] entries, in their original order.
#[must_use]
pub fn sample(entries: &[RecordEntry]) -> &[RecordEntry] {
    &entries[..entries.len().min(SAMPLE_LIMIT)]
}

/// Serializes one entry as `Artist - Title (Year) [Genre] {Label} <Format>`.
///
/// Unknown fields are left out along with their brackets.
///
/// # Panics
///
/// * Never in practice; writing to a `String` cannot fail.
#[must_use]
pub fn format_entry(entry: &RecordEntry) -> String {
    let mut line = format!("{} - {}", entry.artist(), entry.title());

    if !entry.year().is_empty() {
        write!(line, " ({})", entry.year()).unwrap();
    }
    if entry.genre() != DEFAULT_GENRE {
        write!(line, " [{}]", entry.genre()).unwrap();
    }
    if !entry.label().is_empty() {
        write!(line, " {{{}}}", entry.label()).unwrap();
    }
    if !entry.format().is_empty() {
        write!(line, " <{}>", entry.format()).unwrap();
    }

    line
}

/// Builds the user prompt for a sample drawn from a collection of
/// `total_count` entries.
///
/// # Panics
///
/// * Never in practice; writing to a `String` cannot fail.
#[must_use]
pub fn build_prompt(sample: &[RecordEntry], total_count: usize) -> String {
    let mut prompt = String::from(
        "Analyze the following record collection and describe it the way a friend who \
         works in a great record store would.\n\n",
    );

    if sample.len() < total_count {
        writeln!(
            prompt,
            "Collection ({total_count} albums, showing the first {}):",
            sample.len()
        )
        .unwrap();
    } else {
        writeln!(prompt, "Collection ({total_count} albums):").unwrap();
    }

    for entry in sample {
        prompt.push_str(&format_entry(entry));
        prompt.push('\n');
    }

    prompt.push_str(
        r#"
Respond with a JSON object with exactly these keys:
{
  "vibe_summary": "One paragraph on the collection's overall vibe and point of view",
  "strengths": ["3 to 5 specific strengths of the collection"],
  "improvements": ["2 to 3 areas where the collection could grow"],
  "recommendations": ["Exactly 5 albums as \"Artist - Album\", none already in the collection"]
}

Be specific and insightful. Reference particular artists, genres, labels or eras when relevant."#,
    );

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(n: usize) -> Vec<RecordEntry> {
        (0..n)
            .map(|i| RecordEntry::new(&format!("Artist {i}"), &format!("Album {i}")).unwrap())
            .collect()
    }

    #[test]
    fn sample_of_exactly_the_limit() {
        let all = entries(100);
        assert_eq!(sample(&all).len(), 100);
    }

    #[test]
    fn sample_keeps_first_hundred_in_order() {
        let all = entries(150);
        let sampled = sample(&all);
        assert_eq!(sampled.len(), 100);
        assert_eq!(sampled, &all[..100]);
        assert_eq!(sampled[99].title(), "Album 99");
    }

    #[test]
    fn small_and_empty_collections() {
        assert_eq!(sample(&entries(3)).len(), 3);
        assert!(sample(&[]).is_empty());
    }

    #[test]
    fn formats_every_field() {
        let entry = RecordEntry::new("Can", "Ege Bamyasi")
            .unwrap()
            .with_year("1972")
            .with_genre("Rock")
            .with_label("United Artists")
            .with_format("Vinyl, LP");
        assert_eq!(
            format_entry(&entry),
            "Can - Ege Bamyasi (1972) [Rock] {United Artists} <Vinyl, LP>"
        );
    }

    #[test]
    fn omits_unknown_fields() {
        let entry = RecordEntry::new("Can", "Future Days").unwrap();
        assert_eq!(format_entry(&entry), "Can - Future Days");

        let entry = entry.with_format("CD");
        assert_eq!(format_entry(&entry), "Can - Future Days <CD>");
    }

    #[test]
    fn prompt_mentions_totals_and_lists_sample() {
        let all = entries(150);
        let prompt = build_prompt(sample(&all), all.len());
        assert!(prompt.contains("Collection (150 albums, showing the first 100):"));
        assert!(prompt.contains("Artist 0 - Album 0\n"));
        assert!(prompt.contains("Artist 99 - Album 99\n"));
        assert!(!prompt.contains("Album 100"));
        assert!(prompt.contains("\"recommendations\""));
        assert!(prompt.contains("Exactly 5 albums"));
    }

    #[test]
    fn prompt_for_full_collection() {
        let all = entries(3);
        let prompt = build_prompt(&all, 3);
        assert!(prompt.contains("Collection (3 albums):"));
    }
}
