//! Authentication module for the session lifecycle.
//!
//! This module provides:
//! - `TokenStore`: durable storage for the session token (file, keychain, memory)
//! - `SessionHandle`: shared accessor for the token and the in-memory session
//! - `SessionStore`: startup validation, login and logout
//!
//! The token is the only persisted value. Any 401 from the server clears it.

pub mod session;
pub mod store;
pub mod token;

pub use session::{AuthState, Session, SessionHandle};
pub use store::{AuthError, SessionStore};
pub use token::{FileTokenStore, KeyringTokenStore, MemoryTokenStore, TokenStore, TOKEN_KEY};
