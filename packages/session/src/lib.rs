#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Per-session state: the OAuth handshake progress and the last report.
//!
//! Sessions are keyed by an opaque [`SessionId`] carried in a cookie.
//! Nothing is persisted; a restart forgets every session.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};
use crate_digger_collection_models::CollectionReport;
use crate_digger_discogs_models::OAuthSessionState;
use uuid::Uuid;

/// Idle time after which a session is forgotten, when not configured.
pub const DEFAULT_IDLE_MINUTES: i64 = 24 * 60;

/// Opaque session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generates a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// The string is not a session identifier.
#[derive(Debug, thiserror::Error)]
#[error("invalid session id")]
pub struct InvalidSessionId;

impl FromStr for SessionId {
    type Err = InvalidSessionId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self).map_err(|_| InvalidSessionId)
    }
}

/// Everything stored for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionData {
    /// Discogs handshake progress.
    pub oauth: OAuthSessionState,
    /// The most recently generated report.
    pub report: Option<CollectionReport>,
    /// Last time the session was read or written.
    pub last_seen: DateTime<Utc>,
}

impl SessionData {
    /// An empty, unauthenticated session.
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            oauth: OAuthSessionState::default(),
            report: None,
            last_seen: now,
        }
    }
}

/// Storage for session state.
///
/// Writes to the same session are last-writer-wins.
pub trait SessionStore: Send + Sync {
    /// Returns the stored data, or an empty session if there is none.
    fn load(&self, id: SessionId) -> SessionData;

    /// Replaces the stored data.
    fn save(&self, id: SessionId, data: SessionData);

    /// Stores `report` as the session's latest report, keeping its OAuth
    /// state.
    fn put_report(&self, id: SessionId, report: CollectionReport);

    /// The session's latest report.
    fn get_report(&self, id: SessionId) -> Option<CollectionReport>;

    /// Forgets the session entirely.
    fn remove(&self, id: SessionId);
}

/// In-process [`SessionStore`].
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: Mutex<BTreeMap<SessionId, SessionData>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_sessions<T>(&self, f: impl FnOnce(&mut BTreeMap<SessionId, SessionData>) -> T) -> T {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut sessions)
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.with_sessions(|sessions| sessions.len())
    }

    /// Whether no session is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evicts sessions idle for longer than `max_idle`. Returns how many
    /// were removed.
    pub fn prune_idle(&self, max_idle: TimeDelta) -> usize {
        self.prune_seen_before(Utc::now() - max_idle)
    }

    /// Evicts sessions last seen before `cutoff`.
    pub fn prune_seen_before(&self, cutoff: DateTime<Utc>) -> usize {
        let removed = self.with_sessions(|sessions| {
            let before = sessions.len();
            sessions.retain(|_, data| data.last_seen >= cutoff);
            before - sessions.len()
        });

        if removed > 0 {
            log::debug!("Pruned {removed} idle sessions");
        }

        removed
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self, id: SessionId) -> SessionData {
        let now = Utc::now();
        self.with_sessions(|sessions| match sessions.get_mut(&id) {
            Some(data) => {
                data.last_seen = now;
                data.clone()
            }
            None => SessionData::new(now),
        })
    }

    fn save(&self, id: SessionId, mut data: SessionData) {
        data.last_seen = Utc::now();
        self.with_sessions(|sessions| {
            sessions.insert(id, data);
        });
    }

    fn put_report(&self, id: SessionId, report: CollectionReport) {
        let now = Utc::now();
        self.with_sessions(|sessions| {
            let data = sessions.entry(id).or_insert_with(|| SessionData::new(now));
            data.report = Some(report);
            data.last_seen = now;
        });
    }

    fn get_report(&self, id: SessionId) -> Option<CollectionReport> {
        self.with_sessions(|sessions| sessions.get(&id).and_then(|data| data.report.clone()))
    }

    fn remove(&self, id: SessionId) {
        self.with_sessions(|sessions| {
            sessions.remove(&id);
        });
    }
}
