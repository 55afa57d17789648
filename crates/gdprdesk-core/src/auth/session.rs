use std::sync::Arc;

use anyhow::{bail, Result};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::models::UserSummary;

use super::TokenStore;

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// Startup validation has not finished yet
    Loading,
    Anonymous,
    Authenticated,
}

/// The client's belief about who is signed in.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: Option<String>,
    pub user: Option<UserSummary>,
    pub is_authenticated: bool,
    pub loading: bool,
}

impl Session {
    fn loading() -> Self {
        Self {
            token: None,
            user: None,
            is_authenticated: false,
            loading: true,
        }
    }

    pub fn state(&self) -> AuthState {
        if self.loading {
            AuthState::Loading
        } else if self.is_authenticated {
            AuthState::Authenticated
        } else {
            AuthState::Anonymous
        }
    }
}

struct Inner {
    store: Arc<dyn TokenStore>,
    tx: watch::Sender<Session>,
}

/// Shared accessor for the session.
///
/// Owns the durable token store and the in-memory session. The API client
/// reads the token through it and invalidates through it; anything that
/// needs auth status subscribes to it. Clone is cheap.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<Inner>,
}

impl SessionHandle {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        let (tx, _rx) = watch::channel(Session::loading());
        Self {
            inner: Arc::new(Inner { store, tx }),
        }
    }

    /// Token currently in durable storage.
    ///
    /// Storage failures are logged and read as "no token" so that request
    /// preparation never fails.
    pub fn token(&self) -> Option<String> {
        match self.inner.store.load() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Failed to read stored token");
                None
            }
        }
    }

    pub fn snapshot(&self) -> Session {
        self.inner.tx.borrow().clone()
    }

    pub fn state(&self) -> AuthState {
        self.inner.tx.borrow().state()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.tx.borrow().is_authenticated
    }

    pub fn user(&self) -> Option<UserSummary> {
        self.inner.tx.borrow().user.clone()
    }

    /// Receive every session change from now on.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.tx.subscribe()
    }

    /// Drop the session after the server rejected the token.
    ///
    /// Clears durable storage and the in-memory flag. Invalidating an
    /// already-cleared session changes nothing and notifies nobody.
    pub fn invalidate(&self) {
        if let Err(e) = self.inner.store.clear() {
            warn!(error = %e, "Failed to clear stored token");
        }
        let changed = self.inner.tx.send_if_modified(|s| {
            if s.token.is_none() && s.user.is_none() && !s.is_authenticated {
                return false;
            }
            s.token = None;
            s.user = None;
            s.is_authenticated = false;
            true
        });
        if changed {
            warn!("Session invalidated by server");
        } else {
            debug!("Session already cleared");
        }
    }

    /// Persist `token` and mark the session authenticated.
    ///
    /// Fails if the token was cleared again before the session could be
    /// marked, e.g. by a logout running at the same time.
    pub(crate) fn establish(&self, token: &str, user: Option<UserSummary>) -> Result<()> {
        self.inner.store.save(token)?;
        if !self.accept(token, user) {
            bail!("Session was cleared while signing in");
        }
        Ok(())
    }

    /// Mark `token` as accepted by the server.
    ///
    /// Only takes effect while `token` is still the stored one; storage is
    /// re-read under the session lock. Returns whether the session changed.
    pub(crate) fn accept(&self, token: &str, user: Option<UserSummary>) -> bool {
        let store = &self.inner.store;
        self.inner.tx.send_if_modified(|s| match store.load() {
            Ok(Some(current)) if current == token => {
                s.token = Some(current);
                s.user = user;
                s.is_authenticated = true;
                true
            }
            Ok(_) => false,
            Err(e) => {
                warn!(error = %e, "Failed to read stored token");
                false
            }
        })
    }

    /// Clear storage and in-memory state unconditionally.
    pub(crate) fn reset(&self) -> Result<()> {
        let cleared = self.inner.store.clear();
        self.inner.tx.send_if_modified(|s| {
            let changed = s.token.is_some() || s.user.is_some() || s.is_authenticated;
            s.token = None;
            s.user = None;
            s.is_authenticated = false;
            changed
        });
        cleared
    }

    /// Leave the Loading state. Returns false if it was already left.
    pub(crate) fn finish_loading(&self) -> bool {
        self.inner.tx.send_if_modified(|s| std::mem::replace(&mut s.loading, false))
    }

    pub(crate) fn load_stored(&self) -> Result<Option<String>> {
        self.inner.store.load()
    }
}
