#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Discogs API client.
//!
//! Drives the three-leg OAuth1 login ([`oauth`]) and pages through a
//! user's collection ([`collection`]) at no more than four requests per
//! second. All HTTP goes through a [`Transport`] and all waiting through a
//! [`Clock`], so the client can be exercised without a network.

pub mod collection;
pub mod oauth;
pub mod pacing;
pub mod signing;
pub mod transport;

use std::sync::Arc;
use std::time::Duration;

use crate_digger_discogs_models::{SignatureMethod, TokenPair};

pub use collection::release_to_raw;
pub use oauth::logout;
pub use pacing::{Clock, MIN_REQUEST_INTERVAL, Pacer, TokioClock, pacing_delay};
pub use transport::{HttpRequest, HttpResponse, Method, ReqwestTransport, Transport, TransportError};

/// Base URL of the Discogs REST API.
pub const DEFAULT_API_BASE: &str = "https://api.discogs.com";

/// Base URL of the Discogs website, where users authorize applications.
pub const DEFAULT_WEB_BASE: &str = "https://www.discogs.com";

/// Releases requested per collection page (the API maximum).
pub const DEFAULT_PER_PAGE: u32 = 100;

/// Collection pages fetched before giving up.
pub const DEFAULT_MAX_PAGES: u32 = 200;

/// User agent sent when `DISCOGS_USER_AGENT` is not set.
pub const DEFAULT_USER_AGENT: &str = concat!("CrateDigger/", env!("CARGO_PKG_VERSION"));

/// Errors that can occur while talking to Discogs.
#[derive(Debug, thiserror::Error)]
pub enum DiscogsError {
    /// A step of the OAuth handshake failed.
    #[error("OAuth error: {message}")]
    OAuth {
        /// Description of what went wrong.
        message: String,
    },

    /// The callback arrived without a login having been started.
    #[error("OAuth error: no pending authentication")]
    NoPendingAuthentication,

    /// The operation needs an access token and the session has none.
    #[error("not authenticated with Discogs")]
    AuthRequired,

    /// A collection page could not be fetched or decoded.
    #[error("failed to fetch collection: {message}")]
    Fetch {
        /// Description of what went wrong.
        message: String,
    },

    /// Client configuration is missing or invalid.
    #[error("Discogs configuration error: {message}")]
    Config {
        /// Description of what went wrong.
        message: String,
    },
}

/// Application (consumer) credentials issued by Discogs.
#[derive(Clone, PartialEq, Eq)]
pub struct ConsumerCredentials {
    /// Consumer key.
    pub key: String,
    /// Consumer secret.
    pub secret: String,
}

impl ConsumerCredentials {
    /// Creates consumer credentials.
    #[must_use]
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
        }
    }
}

impl std::fmt::Debug for ConsumerCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsumerCredentials")
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Settings for a [`DiscogsClient`].
#[derive(Debug, Clone)]
pub struct DiscogsConfig {
    /// Application credentials.
    pub consumer: ConsumerCredentials,
    /// Where Discogs redirects the user after authorization.
    pub callback_url: String,
    /// How requests are signed.
    pub signature_method: SignatureMethod,
    /// `User-Agent` sent with every request.
    pub user_agent: String,
    /// API base URL, without a trailing slash.
    pub api_base: String,
    /// Website base URL, without a trailing slash.
    pub web_base: String,
    /// Releases per collection page.
    pub per_page: u32,
    /// Maximum number of collection pages per fetch.
    pub max_pages: u32,
    /// Minimum spacing between requests.
    pub min_request_interval: Duration,
}

impl DiscogsConfig {
    /// Creates a configuration with the production endpoints and defaults.
    #[must_use]
    pub fn new(consumer: ConsumerCredentials, callback_url: impl Into<String>) -> Self {
        Self {
            consumer,
            callback_url: callback_url.into(),
            signature_method: SignatureMethod::default(),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            api_base: DEFAULT_API_BASE.to_owned(),
            web_base: DEFAULT_WEB_BASE.to_owned(),
            per_page: DEFAULT_PER_PAGE,
            max_pages: DEFAULT_MAX_PAGES,
            min_request_interval: MIN_REQUEST_INTERVAL,
        }
    }

    /// Reads the configuration from environment variables.
    ///
    /// `DISCOGS_CONSUMER_KEY` and `DISCOGS_CONSUMER_SECRET` are required.
    /// `DISCOGS_CALLBACK_URL` falls back to `default_callback_url`.
    /// `DISCOGS_SIGNATURE_METHOD` (`PLAINTEXT` or `HMAC-SHA1`) and
    /// `DISCOGS_USER_AGENT` are optional.
    ///
    /// # Errors
    ///
    /// Returns [`DiscogsError::Config`] if a required variable is missing or
    /// the signature method is not recognized.
    pub fn from_env(default_callback_url: &str) -> Result<Self, DiscogsError> {
        let key = required_env("DISCOGS_CONSUMER_KEY")?;
        let secret = required_env("DISCOGS_CONSUMER_SECRET")?;
        let callback_url = std::env::var("DISCOGS_CALLBACK_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| default_callback_url.to_owned());

        let mut config = Self::new(ConsumerCredentials::new(key, secret), callback_url);

        if let Ok(method) = std::env::var("DISCOGS_SIGNATURE_METHOD")
            && !method.trim().is_empty()
        {
            config.signature_method =
                method
                    .trim()
                    .parse()
                    .map_err(|_| DiscogsError::Config {
                        message: format!(
                            "DISCOGS_SIGNATURE_METHOD must be PLAINTEXT or HMAC-SHA1, got '{method}'"
                        ),
                    })?;
        }

        if let Ok(user_agent) = std::env::var("DISCOGS_USER_AGENT")
            && !user_agent.trim().is_empty()
        {
            config.user_agent = user_agent.trim().to_owned();
        }

        Ok(config)
    }

    /// URL the user is sent to in order to authorize a request token.
    #[must_use]
    pub fn authorize_url(&self, request_token: &str) -> String {
        format!(
            "{}/oauth/authorize?oauth_token={}",
            self.web_base,
            signing::percent_encode(request_token)
        )
    }
}

fn required_env(name: &str) -> Result<String, DiscogsError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| DiscogsError::Config {
            message: format!("{name} is not set"),
        })
}

/// Signed, paced access to the Discogs API.
#[derive(Clone)]
pub struct DiscogsClient {
    config: DiscogsConfig,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for DiscogsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscogsClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DiscogsClient {
    /// Creates a client that talks to Discogs over HTTPS.
    ///
    /// # Errors
    ///
    /// Returns [`DiscogsError::Config`] if the HTTP client cannot be built.
    pub fn new(config: DiscogsConfig) -> Result<Self, DiscogsError> {
        let transport =
            ReqwestTransport::new(&config.user_agent).map_err(|e| DiscogsError::Config {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self::with_transport(
            config,
            Arc::new(transport),
            Arc::new(TokioClock),
        ))
    }

    /// Creates a client with an explicit transport and clock.
    #[must_use]
    pub fn with_transport(
        config: DiscogsConfig,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            transport,
            clock,
        }
    }

    /// The client configuration.
    #[must_use]
    pub const fn config(&self) -> &DiscogsConfig {
        &self.config
    }

    /// Signs and sends a request, returning the body of a 2xx response.
    ///
    /// Failures are returned as a plain message; callers wrap it in the
    /// error kind that fits the step they are performing.
    async fn send_signed(
        &self,
        method: Method,
        url: &str,
        token: Option<&TokenPair>,
        extra: &[(&str, &str)],
    ) -> Result<String, String> {
        let authorization = signing::authorization_header(&signing::SigningInput {
            method,
            url,
            consumer: &self.config.consumer,
            token,
            extra,
            signature_method: self.config.signature_method,
        })
        .map_err(|e| e.to_string())?;

        let request = HttpRequest {
            method,
            url: url.to_owned(),
            headers: vec![
                ("Authorization".to_owned(), authorization),
                ("User-Agent".to_owned(), self.config.user_agent.clone()),
            ],
        };

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| format!("{method} {url}: {e}"))?;

        if !response.is_success() {
            return Err(format!(
                "{method} {url} returned {}: {}",
                response.status,
                response.body_preview()
            ));
        }

        Ok(response.body)
    }
}
