#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the crate digger server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the report types to allow independent evolution of the API
//! contract.

use chrono::{DateTime, Utc};
use crate_digger_collection_models::{CollectionReport, CollectionSource};
use serde::{Deserialize, Serialize};

/// Response for the health check endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
}

/// Error body returned by every failing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable message.
    pub error: String,
}

impl ApiError {
    /// Creates an error body.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Where the current session stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSession {
    /// Whether the session is logged in with Discogs.
    pub authenticated: bool,
    /// Whether a Discogs login was started but not completed.
    pub login_pending: bool,
    /// Discogs username, when logged in.
    pub username: Option<String>,
    /// Whether a report is available for this session.
    pub has_report: bool,
}

/// Structured sections of a report, when the narrative could be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiReportSections {
    /// Overall vibe and point of view.
    pub vibe_summary: String,
    /// What the collection does well.
    pub strengths: Vec<String>,
    /// Where it could grow.
    pub improvements: Vec<String>,
    /// Albums to look for next.
    pub recommendations: Vec<String>,
}

/// A generated report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiReport {
    /// Narrative exactly as the LLM returned it.
    pub narrative_text: String,
    /// Entries sent to the LLM.
    pub sample_size: usize,
    /// Entries in the whole collection.
    pub total_count: usize,
    /// Where the collection came from.
    pub source: CollectionSource,
    /// When the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Parsed sections, if the narrative was structured.
    pub sections: Option<ApiReportSections>,
}

impl ApiReport {
    /// Wraps a stored report with its parsed sections.
    #[must_use]
    pub fn new(report: CollectionReport, sections: Option<ApiReportSections>) -> Self {
        Self {
            narrative_text: report.narrative_text,
            sample_size: report.sample_size,
            total_count: report.total_count,
            source: report.source,
            generated_at: report.generated_at,
            sections,
        }
    }
}

/// Query parameters for `POST /api/upload`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadParams {
    /// Name of the uploaded file, used to check the extension.
    pub filename: Option<String>,
}

/// Query parameters Discogs appends to the OAuth callback.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    /// The request token being authorized.
    pub oauth_token: Option<String>,
    /// Verifier proving the user approved the request.
    pub oauth_verifier: Option<String>,
    /// Present instead of the above when the user declined.
    pub denied: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_serializes_camel_case() {
        let report = CollectionReport {
            narrative_text: "{}".to_owned(),
            sample_size: 100,
            total_count: 150,
            source: CollectionSource::Discogs,
            generated_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        };
        let json = serde_json::to_value(ApiReport::new(report, None)).unwrap();
        assert_eq!(json["narrativeText"], "{}");
        assert_eq!(json["sampleSize"], 100);
        assert_eq!(json["totalCount"], 150);
        assert_eq!(json["source"], "DISCOGS");
        assert!(json["sections"].is_null());
    }

    #[test]
    fn session_serializes_camel_case() {
        let json = serde_json::to_value(ApiSession {
            authenticated: true,
            login_pending: false,
            username: Some("digger".to_owned()),
            has_report: false,
        })
        .unwrap();
        assert_eq!(json["hasReport"], false);
        assert_eq!(json["loginPending"], false);
        assert_eq!(json["username"], "digger");
    }
}
