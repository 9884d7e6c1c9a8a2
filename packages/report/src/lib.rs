#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Collection report generation.
//!
//! Samples a normalized collection, asks an LLM for a narrative about it,
//! and wraps the answer in a [`CollectionReport`]. The two pipelines,
//! [`generate_from_csv`] and [`generate_from_discogs`], tie the collection
//! sources to the summarizer and fold every component error into
//! [`ReportError`].

pub mod prompt;
pub mod sections;

pub use prompt::{SAMPLE_LIMIT, SYSTEM_PROMPT, build_prompt, format_entry, sample};
pub use sections::ReportSections;

use chrono::Utc;
use crate_digger_ai::{AiError, CompletionRequest, LlmProvider};
use crate_digger_collection_models::{CollectionReport, CollectionSource, RecordEntry};
use crate_digger_discogs::{DiscogsClient, DiscogsError};
use crate_digger_discogs_models::OAuthSessionState;
use crate_digger_normalize::NormalizeError;

/// Token bound for a report completion.
pub const REPORT_MAX_TOKENS: u32 = 1500;

/// Sampling temperature for report completions.
pub const REPORT_TEMPERATURE: f32 = 0.7;

/// Why a summary could not be produced.
#[derive(Debug, thiserror::Error)]
pub enum SummarizationError {
    /// There was nothing to summarize.
    #[error("collection has no usable entries")]
    EmptySample,

    /// The LLM call failed or returned nothing.
    #[error(transparent)]
    Provider(#[from] AiError),
}

/// Every way report generation can fail.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// The uploaded CSV could not be decoded.
    #[error("could not read CSV: {0}")]
    Parse(#[from] NormalizeError),

    /// The Discogs login failed or arrived out of order.
    #[error("authentication failed: {message}")]
    OAuth {
        /// Description of what went wrong.
        message: String,
    },

    /// The operation needs a Discogs login.
    #[error("log in with Discogs first")]
    AuthRequired,

    /// The Discogs collection could not be fetched.
    #[error("failed to fetch collection: {message}")]
    Fetch {
        /// Description of what went wrong.
        message: String,
    },

    /// The LLM could not produce a report.
    #[error("failed to generate report: {0}")]
    Summarization(#[from] SummarizationError),

    /// Required configuration is missing.
    #[error("configuration error: {message}")]
    Config {
        /// Description of what went wrong.
        message: String,
    },
}

impl From<DiscogsError> for ReportError {
    fn from(e: DiscogsError) -> Self {
        match e {
            DiscogsError::OAuth { message } => Self::OAuth { message },
            DiscogsError::NoPendingAuthentication => Self::OAuth {
                message: "no pending authentication".to_owned(),
            },
            DiscogsError::AuthRequired => Self::AuthRequired,
            DiscogsError::Fetch { message } => Self::Fetch { message },
            DiscogsError::Config { message } => Self::Config { message },
        }
    }
}

impl From<AiError> for ReportError {
    fn from(e: AiError) -> Self {
        match e {
            AiError::Config { message } => Self::Config { message },
            other => Self::Summarization(SummarizationError::Provider(other)),
        }
    }
}

/// Summarizes a collection with a single LLM call.
///
/// Only the first [`SAMPLE_LIMIT`] entries are sent; `total_count` in the
/// report is the size of the whole collection. The narrative is stored
/// exactly as returned.
///
/// # Errors
///
/// * [`SummarizationError::EmptySample`] if `entries` is empty. The
///   provider is not called.
/// * [`SummarizationError::Provider`] if the call fails or the completion
///   is blank.
pub async fn summarize(
    provider: &dyn LlmProvider,
    entries: &[RecordEntry],
    source: CollectionSource,
) -> Result<CollectionReport, SummarizationError> {
    let sampled = sample(entries);
    if sampled.is_empty() {
        return Err(SummarizationError::EmptySample);
    }

    let request = CompletionRequest::new(SYSTEM_PROMPT, build_prompt(sampled, entries.len()))
        .with_max_tokens(REPORT_MAX_TOKENS)
        .with_temperature(REPORT_TEMPERATURE)
        .with_json_output(true);

    log::info!(
        "Summarizing {} of {} entries with {}",
        sampled.len(),
        entries.len(),
        provider.model()
    );

    let narrative_text = provider.complete(&request).await?;
    if narrative_text.trim().is_empty() {
        return Err(SummarizationError::Provider(AiError::EmptyCompletion));
    }

    Ok(CollectionReport {
        narrative_text,
        sample_size: sampled.len(),
        total_count: entries.len(),
        source,
        generated_at: Utc::now(),
    })
}

/// Generates a report from raw CSV bytes.
///
/// # Errors
///
/// * [`ReportError::Parse`] if the bytes are not delimited text.
/// * [`ReportError::Summarization`] if no row survived normalization or
///   the LLM call failed.
pub async fn generate_from_csv(
    provider: &dyn LlmProvider,
    bytes: &[u8],
) -> Result<CollectionReport, ReportError> {
    let entries = crate_digger_normalize::parse_csv(bytes)?;
    log::info!("CSV upload normalized to {} entries", entries.len());

    Ok(summarize(provider, &entries, CollectionSource::Csv).await?)
}

/// Generates a report from the authenticated user's Discogs collection.
///
/// A username resolved while fetching is stored into `state`.
///
/// # Errors
///
/// * [`ReportError::AuthRequired`] if `state` has no access token.
/// * [`ReportError::Fetch`] if any collection page fails.
/// * [`ReportError::Summarization`] if the collection is empty or the LLM
///   call failed.
pub async fn generate_from_discogs(
    provider: &dyn LlmProvider,
    client: &DiscogsClient,
    state: &mut OAuthSessionState,
) -> Result<CollectionReport, ReportError> {
    let entries = client.fetch_collection(state).await?;

    Ok(summarize(provider, &entries, CollectionSource::Discogs).await?)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    use crate_digger_discogs::{
        Clock, ConsumerCredentials, DiscogsConfig, HttpRequest, HttpResponse, Transport,
        TransportError,
    };
    use crate_digger_discogs_models::TokenPair;

    use super::*;

    /// Provider that records requests and answers from a script.
    struct MockProvider {
        reply: Result<String, String>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl MockProvider {
        fn answering(text: &str) -> Self {
            Self {
                reply: Ok(text.to_owned()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                reply: Err(message.to_owned()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<CompletionRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl LlmProvider for MockProvider {
        fn model(&self) -> &str {
            "mock"
        }

        async fn complete(&self, request: &CompletionRequest) -> Result<String, AiError> {
            self.requests.lock().unwrap().push(request.clone());
            self.reply.clone().map_err(|message| AiError::Provider { message })
        }
    }

    struct ScriptedTransport(Mutex<VecDeque<HttpResponse>>);

    #[async_trait::async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.0.lock().unwrap().pop_front().ok_or_else(|| TransportError {
                message: "unexpected request".to_owned(),
            })
        }
    }

    struct NoWaitClock;

    #[async_trait::async_trait]
    impl Clock for NoWaitClock {
        fn now(&self) -> Instant {
            Instant::now()
        }

        async fn sleep(&self, _duration: Duration) {}
    }

    fn discogs(pages: Vec<String>) -> DiscogsClient {
        let responses = pages
            .into_iter()
            .map(|body| HttpResponse { status: 200, body })
            .collect();
        DiscogsClient::with_transport(
            DiscogsConfig::new(ConsumerCredentials::new("k", "s"), "http://cb"),
            Arc::new(ScriptedTransport(Mutex::new(responses))),
            Arc::new(NoWaitClock),
        )
    }

    fn page(page: u32, pages: u32, per_page: u32) -> String {
        let releases: Vec<_> = (0..per_page)
            .map(|i| {
                let n = (page - 1) * per_page + i;
                serde_json::json!({
                    "id": n,
                    "basic_information": {
                        "title": format!("Album {n}"),
                        "artists": [{ "name": format!("Artist {n}") }],
                    }
                })
            })
            .collect();
        let next = (page < pages).then_some("https://api.discogs.com/next");
        serde_json::json!({
            "pagination": {
                "page": page, "pages": pages, "per_page": per_page,
                "items": pages * per_page, "urls": { "next": next }
            },
            "releases": releases
        })
        .to_string()
    }

    fn authenticated() -> OAuthSessionState {
        let mut state = OAuthSessionState::default();
        state.complete(TokenPair::new("a", "b"), Some("digger".to_owned()));
        state
    }

    #[tokio::test]
    async fn csv_with_one_blank_artist() {
        let provider = MockProvider::answering(r#"{"vibe_summary": "Motorik."}"#);
        let csv = "Artist,Title,Year\n\
                   Neu!,Neu!,1972\n\
                   ,Hallogallo,1971\n\
                   Harmonia,Musik von Harmonia,1974\n\
                   Cluster,Zuckerzeit,1974\n";

        let report = generate_from_csv(&provider, csv.as_bytes()).await.unwrap();

        assert_eq!(report.total_count, 3);
        assert_eq!(report.sample_size, 3);
        assert_eq!(report.source, CollectionSource::Csv);
        assert_eq!(report.narrative_text, r#"{"vibe_summary": "Motorik."}"#);

        let calls = provider.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].prompt.contains("Collection (3 albums):"));
        assert!(calls[0].prompt.contains("Harmonia - Musik von Harmonia (1974)"));
        assert!(!calls[0].prompt.contains("Hallogallo"));
        assert_eq!(calls[0].max_tokens, 1500);
        assert!(calls[0].json_output);
        assert_eq!(calls[0].system, SYSTEM_PROMPT);
    }

    #[tokio::test]
    async fn large_collection_is_sampled() {
        let provider = MockProvider::answering("ok");
        let entries: Vec<_> = (0..150)
            .map(|i| RecordEntry::new(&format!("A{i}"), &format!("T{i}")).unwrap())
            .collect();

        let report = summarize(&provider, &entries, CollectionSource::Csv)
            .await
            .unwrap();
        assert_eq!((report.sample_size, report.total_count), (100, 150));
        assert!(provider.calls()[0].prompt.contains("A99 - T99"));
        assert!(!provider.calls()[0].prompt.contains("A100 - T100"));
    }

    #[tokio::test]
    async fn empty_collection_never_reaches_the_provider() {
        let provider = MockProvider::answering("unused");
        let err = summarize(&provider, &[], CollectionSource::Csv)
            .await
            .unwrap_err();
        assert!(matches!(err, SummarizationError::EmptySample));
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn unrecognized_csv_is_a_summarization_error() {
        let provider = MockProvider::answering("unused");
        let err = generate_from_csv(&provider, b"foo,bar\n1,2\n")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ReportError::Summarization(SummarizationError::EmptySample)
        ));
    }

    #[tokio::test]
    async fn binary_upload_is_a_parse_error() {
        let provider = MockProvider::answering("unused");
        let err = generate_from_csv(&provider, &[0xff, 0xfe, 0x00, 0x01])
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::Parse(_)));
    }

    #[tokio::test]
    async fn provider_failure_is_a_summarization_error() {
        let provider = MockProvider::failing("rate limited");
        let err = generate_from_csv(&provider, b"Artist,Title\nCan,Soon Over Babaluma\n")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ReportError::Summarization(SummarizationError::Provider(_))
        ));
    }

    #[tokio::test]
    async fn blank_completion_is_rejected() {
        let provider = MockProvider::answering("   ");
        let entries = [RecordEntry::new("Can", "Tago Mago").unwrap()];
        let err = summarize(&provider, &entries, CollectionSource::Csv)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SummarizationError::Provider(AiError::EmptyCompletion)
        ));
    }

    #[tokio::test]
    async fn discogs_two_pages_of_fifty() {
        let provider = MockProvider::answering("ok");
        let client = discogs(vec![page(1, 2, 50), page(2, 2, 50)]);

        let report = generate_from_discogs(&provider, &client, &mut authenticated())
            .await
            .unwrap();
        assert_eq!(report.total_count, 100);
        assert_eq!(report.sample_size, 100);
        assert_eq!(report.source, CollectionSource::Discogs);
    }

    #[tokio::test]
    async fn discogs_requires_login() {
        let provider = MockProvider::answering("ok");
        let client = discogs(vec![]);
        let err = generate_from_discogs(&provider, &client, &mut OAuthSessionState::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::AuthRequired));
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn discogs_fetch_failure_skips_summarization() {
        let provider = MockProvider::answering("ok");
        let client = discogs(vec![page(1, 2, 5), "not json".to_owned()]);
        let err = generate_from_discogs(&provider, &client, &mut authenticated())
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::Fetch { .. }));
        assert!(provider.calls().is_empty());
    }

    #[test]
    fn discogs_errors_map_to_report_errors() {
        assert!(matches!(
            ReportError::from(DiscogsError::NoPendingAuthentication),
            ReportError::OAuth { .. }
        ));
        assert!(matches!(
            ReportError::from(DiscogsError::Config {
                message: "x".to_owned()
            }),
            ReportError::Config { .. }
        ));
        assert!(matches!(
            ReportError::from(AiError::Config {
                message: "x".to_owned()
            }),
            ReportError::Config { .. }
        ));
    }
}
