#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! OAuth session state and Discogs API wire types.
//!
//! [`OAuthSessionState`] tracks one user's progress through the three-leg
//! OAuth1 handshake. The remaining types mirror the JSON bodies returned by
//! the Discogs identity and collection endpoints.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// An OAuth token and its shared secret.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// Public token value.
    pub token: String,
    /// Secret used when signing requests with this token.
    pub secret: String,
}

impl TokenPair {
    /// Creates a token pair.
    #[must_use]
    pub fn new(token: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            secret: secret.into(),
        }
    }
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("token", &self.token)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Where a session stands in the OAuth1 handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
pub enum OAuthPhase {
    /// No handshake in progress and no access token.
    Unauthenticated,
    /// Redirected to the provider, waiting for the callback.
    RequestTokenObtained,
    /// Holding an access token.
    Authenticated,
}

/// Per-session OAuth progression.
///
/// The access token is present if and only if the session is authenticated.
/// The request token only lives between the redirect to the provider and
/// the callback, and is removed as soon as it is exchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthSessionState {
    request_token: Option<TokenPair>,
    access_token: Option<TokenPair>,
    username: Option<String>,
}

impl OAuthSessionState {
    /// Current handshake phase.
    #[must_use]
    pub const fn phase(&self) -> OAuthPhase {
        if self.access_token.is_some() {
            OAuthPhase::Authenticated
        } else if self.request_token.is_some() {
            OAuthPhase::RequestTokenObtained
        } else {
            OAuthPhase::Unauthenticated
        }
    }

    /// Whether the session holds an access token.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// The pending request token, if a login is in progress.
    #[must_use]
    pub const fn request_token(&self) -> Option<&TokenPair> {
        self.request_token.as_ref()
    }

    /// The access token, if authenticated.
    #[must_use]
    pub const fn access_token(&self) -> Option<&TokenPair> {
        self.access_token.as_ref()
    }

    /// The resolved Discogs username, if known.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Records a freshly issued request token, replacing any previous
    /// handshake or login.
    pub fn begin(&mut self, request_token: TokenPair) {
        *self = Self {
            request_token: Some(request_token),
            access_token: None,
            username: None,
        };
    }

    /// Removes and returns the pending request token.
    ///
    /// Request tokens are single-use: after this call the session no longer
    /// has a pending login, whether or not the exchange succeeds.
    pub fn take_request_token(&mut self) -> Option<TokenPair> {
        self.request_token.take()
    }

    /// Stores the access token obtained from the exchange.
    pub fn complete(&mut self, access_token: TokenPair, username: Option<String>) {
        self.request_token = None;
        self.access_token = Some(access_token);
        self.username = username;
    }

    /// Records the username once it has been resolved.
    pub fn set_username(&mut self, username: String) {
        self.username = Some(username);
    }

    /// Drops every token and the username.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// How OAuth1 requests are signed.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, AsRefStr,
)]
pub enum SignatureMethod {
    /// Consumer and token secrets sent directly; requires HTTPS.
    #[default]
    #[strum(serialize = "PLAINTEXT", ascii_case_insensitive)]
    Plaintext,
    /// RFC 5849 HMAC-SHA1 signature over the request base string.
    #[strum(serialize = "HMAC-SHA1", ascii_case_insensitive)]
    HmacSha1,
}

/// Body of `GET /oauth/identity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Discogs user ID.
    pub id: u64,
    /// Discogs username.
    pub username: String,
    /// API URL of the user's profile.
    #[serde(default)]
    pub resource_url: Option<String>,
    /// Name of the application the token was issued to.
    #[serde(default)]
    pub consumer_name: Option<String>,
}

/// One page of `GET /users/{username}/collection/folders/{folder}/releases`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionPage {
    /// Pagination cursor.
    pub pagination: Pagination,
    /// Releases on this page.
    #[serde(default)]
    pub releases: Vec<CollectionRelease>,
}

/// Pagination block shared by Discogs list endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// One-based page number.
    pub page: u32,
    /// Total number of pages.
    pub pages: u32,
    /// Items per page.
    pub per_page: u32,
    /// Total number of items.
    pub items: u64,
    /// Links to neighbouring pages.
    #[serde(default)]
    pub urls: PaginationUrls,
}

/// Neighbouring page links. `next` is absent on the last page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationUrls {
    /// First page.
    #[serde(default)]
    pub first: Option<String>,
    /// Previous page.
    #[serde(default)]
    pub prev: Option<String>,
    /// Next page.
    #[serde(default)]
    pub next: Option<String>,
    /// Last page.
    #[serde(default)]
    pub last: Option<String>,
}

/// A release instance in a user's collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionRelease {
    /// Release ID.
    pub id: u64,
    /// Folder the instance lives in.
    #[serde(default)]
    pub folder_id: Option<u64>,
    /// User rating (0 when unrated).
    #[serde(default)]
    pub rating: Option<u8>,
    /// Release metadata.
    pub basic_information: BasicInformation,
}

/// Release metadata embedded in collection items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicInformation {
    /// Release title.
    #[serde(default)]
    pub title: String,
    /// Release year, `0` when unknown.
    #[serde(default)]
    pub year: Option<u32>,
    /// Credited artists.
    #[serde(default)]
    pub artists: Vec<ArtistCredit>,
    /// Labels.
    #[serde(default)]
    pub labels: Vec<LabelCredit>,
    /// Formats (e.g. `Vinyl` with descriptions `LP`, `Album`).
    #[serde(default)]
    pub formats: Vec<ReleaseFormat>,
    /// Broad genres.
    #[serde(default)]
    pub genres: Vec<String>,
    /// Finer-grained styles.
    #[serde(default)]
    pub styles: Vec<String>,
}

/// An artist credit on a release.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistCredit {
    /// Canonical artist name, possibly with a `" (N)"` disambiguator.
    pub name: String,
    /// Name variation used on this release, empty if none.
    #[serde(default)]
    pub anv: String,
    /// Join phrase to the next credit (e.g. `"&"`, `"Featuring"`).
    #[serde(default)]
    pub join: String,
}

/// A label credit on a release.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCredit {
    /// Label name.
    pub name: String,
    /// Catalog number.
    #[serde(default)]
    pub catno: String,
}

/// A format entry on a release.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseFormat {
    /// Format name (e.g. `"Vinyl"`, `"CD"`).
    pub name: String,
    /// Number of items of this format.
    #[serde(default)]
    pub qty: String,
    /// Descriptions (e.g. `"LP"`, `"Album"`).
    #[serde(default)]
    pub descriptions: Vec<String>,
}
