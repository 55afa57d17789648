use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ResourceId;

/// The signed-in user, as returned by `users/me/` and by login.
///
/// Only `id` is relied upon; unknown fields are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: ResourceId,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub organization: Option<ResourceId>,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub is_data_processor: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserSummary {
    /// Full name if the server sent one, otherwise the login identifier.
    pub fn display_name(&self) -> String {
        let first = self.first_name.as_deref().unwrap_or("").trim();
        let last = self.last_name.as_deref().unwrap_or("").trim();
        let full = format!("{} {}", first, last).trim().to_string();
        if !full.is_empty() {
            return full;
        }
        self.email
            .clone()
            .or_else(|| self.username.clone())
            .unwrap_or_else(|| self.id.to_string())
    }
}

/// Body of `POST auth/login/`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Body returned by a successful `POST auth/login/`.
///
/// Both fields are optional on the wire; a missing `key` is rejected by the
/// session store, not here.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub user: Option<UserSummary>,
}
