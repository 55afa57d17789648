//! Core library for gdprdesk.
//!
//! Provides the authenticated client for a GDPR compliance back-office API:
//! the request pipeline that attaches the session token and reacts to 401s,
//! the session lifecycle (startup validation, login, logout), durable token
//! storage, and the models exchanged with the server.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError};
pub use auth::{AuthError, AuthState, Session, SessionHandle, SessionStore, TokenStore};
pub use config::Config;

use anyhow::Result;
use std::sync::Arc;

/// Wire up the session accessor, API client and session store.
///
/// This is the application root's one place to build the auth stack; the
/// returned store hands out the shared `SessionHandle` and `ApiClient`.
pub fn connect(base_url: &str, tokens: Arc<dyn TokenStore>) -> Result<SessionStore> {
    let session = SessionHandle::new(tokens);
    let api = ApiClient::new(base_url, session)?;
    Ok(SessionStore::new(api))
}
