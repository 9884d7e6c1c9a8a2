//! HTTP transport seam for Discogs requests.
//!
//! The OAuth handshake and collection fetcher only build [`HttpRequest`]
//! values and read [`HttpResponse`] values; [`ReqwestTransport`] performs
//! the actual I/O.

use std::time::Duration;

use strum_macros::{AsRefStr, Display};

/// Per-request timeout for Discogs calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP method used by Discogs requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
}

/// A fully signed request ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Request method.
    pub method: Method,
    /// Absolute URL including query string.
    pub url: String,
    /// Headers to send, including `Authorization`.
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    /// Returns the value of the named header, matched case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Status and body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body as text.
    pub body: String,
}

impl HttpResponse {
    /// Whether the status is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// The first 200 characters of the body, for error messages.
    #[must_use]
    pub fn body_preview(&self) -> String {
        self.body.chars().take(200).collect()
    }
}

/// A request could not be completed at the network level.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    /// Description of what went wrong.
    pub message: String,
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        Self {
            message: e.to_string(),
        }
    }
}

/// Sends HTTP requests on behalf of the Discogs client.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Sends one request and returns its status and body.
    ///
    /// Non-2xx statuses are returned as responses, not errors.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the request could not be completed.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// [`Transport`] backed by a shared [`reqwest::Client`].
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport that identifies itself with `user_agent`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the HTTP client cannot be built.
    pub fn new(user_agent: &str) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self
                .client
                .post(&request.url)
                .header("Content-Type", "application/x-www-form-urlencoded"),
        };

        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }

        log::trace!("{} {}", request.method, request.url);

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(HttpResponse { status, body })
    }
}
