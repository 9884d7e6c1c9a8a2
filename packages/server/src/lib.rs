#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web server for crate digger collection reports.
//!
//! Serves the Discogs login flow under `/auth`, the report API under
//! `/api`, and the static frontend at `/`. Each browser gets a session
//! cookie; its OAuth state and latest report live in a
//! [`MemorySessionStore`].

mod handlers;
pub mod interactive;
mod session;

use std::sync::Arc;
use std::time::Duration;

use actix_files::Files;
use actix_web::{App, HttpServer, middleware, web};
use chrono::TimeDelta;
use crate_digger_ai::{AiError, LlmProvider};
use crate_digger_discogs::{DiscogsClient, DiscogsConfig, DiscogsError};
use crate_digger_session::{DEFAULT_IDLE_MINUTES, MemorySessionStore, SessionStore};

/// Largest accepted CSV upload.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// How often idle sessions are swept.
const SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Errors that stop the server from starting.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Required configuration is missing or invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of what went wrong.
        message: String,
    },

    /// The HTTP server failed to bind or run.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<DiscogsError> for ServerError {
    fn from(e: DiscogsError) -> Self {
        Self::Config {
            message: e.to_string(),
        }
    }
}

impl From<AiError> for ServerError {
    fn from(e: AiError) -> Self {
        Self::Config {
            message: e.to_string(),
        }
    }
}

/// Listener and session settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: String,
    /// Port to listen on.
    pub port: u16,
    /// Directory holding the frontend.
    pub static_dir: String,
    /// Idle time after which a session is forgotten.
    pub session_idle: TimeDelta,
}

impl ServerConfig {
    /// Resolves settings from a variable lookup, falling back to defaults
    /// for anything missing or unparsable.
    #[must_use]
    pub fn resolve(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| "127.0.0.1".to_string());
        let port: u16 = lookup("PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);
        let static_dir = lookup("STATIC_DIR").unwrap_or_else(|| "app/dist".to_string());
        let idle_minutes: i64 = lookup("SESSION_IDLE_MINUTES")
            .and_then(|m| m.parse().ok())
            .filter(|m| *m > 0)
            .unwrap_or(DEFAULT_IDLE_MINUTES);

        Self {
            bind_addr,
            port,
            static_dir,
            session_idle: TimeDelta::try_minutes(idle_minutes)
                .unwrap_or_else(|| TimeDelta::minutes(DEFAULT_IDLE_MINUTES)),
        }
    }

    /// Reads settings from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::resolve(|name| std::env::var(name).ok())
    }

    /// Callback URL used when `DISCOGS_CALLBACK_URL` is not set.
    #[must_use]
    pub fn default_callback_url(&self) -> String {
        format!(
            "http://{}:{}/auth/discogs/callback",
            self.bind_addr, self.port
        )
    }
}

/// Shared application state.
pub struct AppState {
    /// Per-session OAuth state and reports.
    pub store: Arc<dyn SessionStore>,
    /// Discogs API client.
    pub discogs: DiscogsClient,
    /// LLM used to write reports.
    pub provider: Arc<dyn LlmProvider>,
}

/// Registers every route except the static frontend.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::PayloadConfig::new(MAX_UPLOAD_BYTES))
        .service(
            web::scope("/auth")
                .route("/discogs/login", web::get().to(handlers::login))
                .route("/discogs/callback", web::get().to(handlers::callback))
                .route("/logout", web::post().to(handlers::logout)),
        )
        .service(
            web::scope("/api")
                .route("/health", web::get().to(handlers::health))
                .route("/session", web::get().to(handlers::session_status))
                .route("/generate-report", web::post().to(handlers::generate_report))
                .route("/upload", web::post().to(handlers::upload))
                .route("/report", web::get().to(handlers::report)),
        );
}

/// Starts the crate digger server.
///
/// Reads the listener, Discogs and LLM configuration from the environment,
/// then runs the Actix-Web HTTP server until it is shut down. This is a
/// regular async function; the caller provides the runtime (e.g. via
/// `#[actix_web::main]`) and initializes logging.
///
/// # Errors
///
/// * [`ServerError::Config`] if the Discogs consumer credentials or the
///   LLM credentials are missing.
/// * [`ServerError::Io`] if the server fails to bind or encounters a
///   runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> Result<(), ServerError> {
    let config = ServerConfig::from_env();

    log::info!("Loading Discogs configuration...");
    let discogs = DiscogsClient::new(DiscogsConfig::from_env(&config.default_callback_url())?)?;
    log::info!(
        "Discogs callback URL: {} (signing with {})",
        discogs.config().callback_url,
        discogs.config().signature_method
    );

    log::info!("Loading AI provider...");
    let provider: Arc<dyn LlmProvider> = Arc::from(crate_digger_ai::create_provider_from_env()?);

    let sessions = Arc::new(MemorySessionStore::new());
    spawn_idle_sweep(sessions.clone(), config.session_idle);

    let state = web::Data::new(AppState {
        store: sessions,
        discogs,
        provider,
    });

    log::info!("Starting server on {}:{}", config.bind_addr, config.port);

    let static_dir = config.static_dir.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
            // Serve frontend static files
            .service(Files::new("/", &static_dir).index_file("index.html"))
    })
    .bind((config.bind_addr.as_str(), config.port))?
    .run()
    .await?;

    Ok(())
}

fn spawn_idle_sweep(sessions: Arc<MemorySessionStore>, max_idle: TimeDelta) {
    actix_rt::spawn(async move {
        let mut interval = actix_rt::time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let removed = sessions.prune_idle(max_idle);
            if removed > 0 {
                log::info!("Expired {removed} idle sessions");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults() {
        let config = ServerConfig::resolve(lookup(&[]));
        assert_eq!(config.bind_addr, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.static_dir, "app/dist");
        assert_eq!(config.session_idle, TimeDelta::minutes(1440));
        assert_eq!(
            config.default_callback_url(),
            "http://127.0.0.1:8080/auth/discogs/callback"
        );
    }

    #[test]
    fn overrides_and_bad_values() {
        let config = ServerConfig::resolve(lookup(&[
            ("BIND_ADDR", "0.0.0.0"),
            ("PORT", "not-a-port"),
            ("SESSION_IDLE_MINUTES", "30"),
        ]));
        assert_eq!(config.bind_addr, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.session_idle, TimeDelta::minutes(30));

        let config = ServerConfig::resolve(lookup(&[("SESSION_IDLE_MINUTES", "-5")]));
        assert_eq!(config.session_idle, TimeDelta::minutes(DEFAULT_IDLE_MINUTES));
    }
}
