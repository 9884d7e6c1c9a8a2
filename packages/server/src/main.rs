#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Standalone entry point for the crate digger server.

#[actix_web::main]
async fn main() -> Result<(), crate_digger_server::ServerError> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    crate_digger_server::run_server().await
}
