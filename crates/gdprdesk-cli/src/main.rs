//! gdprdesk - a command-line console for a GDPR compliance back-office.
//!
//! Signs in against the back-office REST API, keeps the session token on
//! disk or in the OS keychain, and lists data subjects, requests and
//! workflows.

mod commands;

use std::io;

use anyhow::Result;
use gdprdesk_core::config::Config;
use gdprdesk_core::{connect, ApiError, AuthState};
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{run, Command};

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

/// A 401 on a command that started signed in. The response step has
/// already dropped the stored token by the time the error gets here.
fn session_expired(error: &anyhow::Error, before: AuthState) -> bool {
    before == AuthState::Authenticated
        && error
            .downcast_ref::<ApiError>()
            .is_some_and(ApiError::is_unauthorized)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = Command::parse(&args)?;
    if command == Command::Help {
        println!("{}", commands::USAGE);
        return Ok(());
    }

    let mut config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        }
    };
    let api_url = config.api_url();
    info!(api_url = %api_url, "gdprdesk starting");

    let store = connect(&api_url, config.token_store()?)?;
    let state = store.initialize().await;
    debug!(?state, "Session initialized");

    if let Err(e) = run(command, &store, &mut config).await {
        match e.downcast_ref::<ApiError>() {
            Some(api) => eprintln!("Error: {}", api.user_message()),
            None => eprintln!("Error: {}", e),
        }
        if session_expired(&e, state) {
            eprintln!("Session expired. Run `gdprdesk login` to sign in again.");
        }
        std::process::exit(1);
    }
    Ok(())
}
