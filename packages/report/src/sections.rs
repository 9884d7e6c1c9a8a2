//! Best-effort structured view of a narrative.
//!
//! The narrative is stored exactly as the LLM returned it. When it happens
//! to be the JSON object the prompt asks for, [`ReportSections::parse`]
//! pulls out the individual sections for display.

use serde::{Deserialize, Serialize};

/// The sections a report narrative is asked to contain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSections {
    /// Overall vibe and point of view.
    pub vibe_summary: String,
    /// What the collection does well.
    pub strengths: Vec<String>,
    /// Where it could grow.
    pub improvements: Vec<String>,
    /// Albums to look for next.
    pub recommendations: Vec<String>,
}

/// A section the model may return as one paragraph or as a list.
#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrList {
    Text(String),
    List(Vec<String>),
}

impl From<TextOrList> for Vec<String> {
    fn from(value: TextOrList) -> Self {
        match value {
            TextOrList::Text(text) => vec![text],
            TextOrList::List(list) => list,
        }
        .into_iter()
        .map(|item| item.trim().to_owned())
        .filter(|item| !item.is_empty())
        .collect()
    }
}

#[derive(Deserialize)]
struct RawSections {
    vibe_summary: Option<String>,
    strengths: Option<TextOrList>,
    improvements: Option<TextOrList>,
    recommendations: Option<TextOrList>,
}

impl ReportSections {
    /// Parses a narrative into sections.
    ///
    /// Accepts the bare JSON object, optionally wrapped in a Markdown code
    /// fence. Returns `None` when the narrative is not such an object or
    /// has no vibe summary.
    #[must_use]
    pub fn parse(narrative: &str) -> Option<Self> {
        let raw: RawSections = serde_json::from_str(strip_code_fence(narrative)).ok()?;

        let vibe_summary = raw.vibe_summary?.trim().to_owned();
        if vibe_summary.is_empty() {
            return None;
        }

        Some(Self {
            vibe_summary,
            strengths: raw.strengths.map(Into::into).unwrap_or_default(),
            improvements: raw.improvements.map(Into::into).unwrap_or_default(),
            recommendations: raw.recommendations.map(Into::into).unwrap_or_default(),
        })
    }
}

fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
