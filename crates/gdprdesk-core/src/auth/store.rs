use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::models::{LoginRequest, LoginResponse};

use super::{AuthState, Session, SessionHandle};

const LOGIN_PATH: &str = "auth/login/";
const LOGOUT_PATH: &str = "auth/logout/";

#[derive(Error, Debug)]
pub enum AuthError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Login succeeded but the server returned no token")]
    MissingToken,

    #[error("Failed to persist token: {0}")]
    Storage(#[from] anyhow::Error),
}

impl AuthError {
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Api(e) => e.user_message(),
            AuthError::MissingToken => {
                "The server did not issue a session token. Please try again.".to_string()
            }
            AuthError::Storage(_) => "Could not save the session on this device.".to_string(),
        }
    }
}

/// Session lifecycle commands: startup validation, login and logout.
///
/// State lives in the `SessionHandle` shared with the API client, so a 401 on
/// any call is visible here too.
#[derive(Clone)]
pub struct SessionStore {
    api: ApiClient,
}

impl SessionStore {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn handle(&self) -> &SessionHandle {
        self.api.session()
    }

    pub fn snapshot(&self) -> Session {
        self.handle().snapshot()
    }

    pub fn state(&self) -> AuthState {
        self.handle().state()
    }

    /// Resolve the startup session.
    ///
    /// With no stored token the session becomes anonymous without touching
    /// the network. A stored token is validated against `users/me/`; any
    /// failure discards it. Loading is always cleared at the end. Only the
    /// first call does anything.
    pub async fn initialize(&self) -> AuthState {
        let handle = self.handle();
        if handle.state() != AuthState::Loading {
            debug!("Session already initialized");
            return handle.state();
        }

        match handle.load_stored() {
            Ok(Some(token)) => {
                debug!("Stored token found, validating");
                match self.api.current_user().await {
                    Ok(user) => {
                        let name = user.display_name();
                        if handle.accept(&token, Some(user)) {
                            info!(user = %name, "Stored session is valid");
                        } else {
                            // Cleared or replaced while the check was in flight
                            debug!("Stored token changed during validation, keeping current session");
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Stored token rejected, discarding");
                        if let Err(e) = handle.reset() {
                            warn!(error = %e, "Failed to clear stored token");
                        }
                    }
                }
            }
            Ok(None) => debug!("No stored token"),
            Err(e) => {
                warn!(error = %e, "Failed to read stored token, discarding");
                if let Err(e) = handle.reset() {
                    warn!(error = %e, "Failed to clear stored token");
                }
            }
        }

        handle.finish_loading();
        handle.state()
    }

    /// Exchange credentials for a token.
    ///
    /// Errors from the server come back unchanged and leave the session as it
    /// was. A success response without a token is treated as a failure.
    pub async fn login(&self, identifier: &str, secret: &str) -> Result<Session, AuthError> {
        let body = LoginRequest {
            username: identifier,
            password: secret,
        };
        let response: LoginResponse = self.api.post(LOGIN_PATH, &body).await?;

        let token = match response.key {
            Some(key) if !key.is_empty() => key,
            _ => {
                warn!("Login response carried no token");
                return Err(AuthError::MissingToken);
            }
        };

        self.handle().establish(&token, response.user)?;
        // A login that races startup validation settles the session
        self.handle().finish_loading();
        info!("Login successful");
        Ok(self.snapshot())
    }

    /// Sign out. Local credentials are always dropped, even when the server
    /// cannot be reached.
    pub async fn logout(&self) {
        match self.api.post_empty::<serde_json::Value>(LOGOUT_PATH).await {
            Ok(_) => debug!("Server-side logout succeeded"),
            Err(e) => warn!(error = %e, "Logout request failed"),
        }
        if let Err(e) = self.handle().reset() {
            warn!(error = %e, "Failed to clear stored token");
        }
        self.handle().finish_loading();
        info!("Logged out");
    }
}
