//! Interactive mode for the server.
//!
//! Prompts for the listener settings and any missing Discogs credentials
//! before starting the server.

use dialoguer::{Confirm, Input};

use crate::ServerError;

/// Runs the server in interactive mode, prompting for configuration.
///
/// Asks for a bind address and port, and for the Discogs consumer key and
/// secret when they are not already set. The answers are exported as
/// environment variables (`BIND_ADDR`, `PORT`, `DISCOGS_CONSUMER_KEY`,
/// `DISCOGS_CONSUMER_SECRET`) before delegating to [`super::run_server`].
///
/// # Errors
///
/// Returns whatever [`super::run_server`] returns.
#[allow(clippy::future_not_send)]
pub async fn run() -> Result<(), ServerError> {
    println!("Crate Digger Server");
    println!();

    let bind_addr: String = Input::new()
        .with_prompt("Bind address")
        .default("127.0.0.1".to_string())
        .interact_text()
        .unwrap_or_else(|_| "127.0.0.1".to_string());

    let port_str: String = Input::new()
        .with_prompt("Port")
        .default("8080".to_string())
        .interact_text()
        .unwrap_or_else(|_| "8080".to_string());

    let consumer_key = missing_var("DISCOGS_CONSUMER_KEY").then(|| {
        Input::<String>::new()
            .with_prompt("Discogs consumer key")
            .interact_text()
            .unwrap_or_default()
    });

    let consumer_secret = missing_var("DISCOGS_CONSUMER_SECRET").then(|| {
        Input::<String>::new()
            .with_prompt("Discogs consumer secret")
            .interact_text()
            .unwrap_or_default()
    });

    // SAFETY: We are single-threaded at this point (before server starts) and
    // these variables are only read once during server initialisation.
    unsafe {
        std::env::set_var("BIND_ADDR", &bind_addr);
        std::env::set_var("PORT", &port_str);
        if let Some(key) = &consumer_key {
            std::env::set_var("DISCOGS_CONSUMER_KEY", key);
        }
        if let Some(secret) = &consumer_secret {
            std::env::set_var("DISCOGS_CONSUMER_SECRET", secret);
        }
    }

    if !Confirm::new()
        .with_prompt(format!("Start server on {bind_addr}:{port_str}?"))
        .default(true)
        .interact()
        .unwrap_or(true)
    {
        println!("Cancelled.");
        return Ok(());
    }

    super::run_server().await
}

fn missing_var(name: &str) -> bool {
    std::env::var(name)
        .ok()
        .is_none_or(|value| value.trim().is_empty())
}
