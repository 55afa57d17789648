use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {body}")]
    BadRequest { body: String },

    #[error("Unauthorized - token may be expired")]
    Unauthorized { body: String },

    #[error("Access denied: {body}")]
    AccessDenied { body: String },

    #[error("Resource not found: {body}")]
    NotFound { body: String },

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error ({status}): {body}")]
    Server { status: StatusCode, body: String },

    #[error("Unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Shown when an error body carries nothing a person can act on
const GENERIC_ERROR_MESSAGE: &str = "An error occurred. Please try again.";

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let body = Self::truncate_body(body);
        match status.as_u16() {
            400 => ApiError::BadRequest { body },
            401 => ApiError::Unauthorized { body },
            403 => ApiError::AccessDenied { body },
            404 => ApiError::NotFound { body },
            429 => ApiError::RateLimited,
            500..=599 => ApiError::Server { status, body },
            _ => ApiError::Status { status, body },
        }
    }

    /// HTTP status of the response, if one was received at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::BadRequest { .. } => Some(StatusCode::BAD_REQUEST),
            ApiError::Unauthorized { .. } => Some(StatusCode::UNAUTHORIZED),
            ApiError::AccessDenied { .. } => Some(StatusCode::FORBIDDEN),
            ApiError::NotFound { .. } => Some(StatusCode::NOT_FOUND),
            ApiError::RateLimited => Some(StatusCode::TOO_MANY_REQUESTS),
            ApiError::Server { status, .. } | ApiError::Status { status, .. } => Some(*status),
            ApiError::Network(e) => e.status(),
            ApiError::InvalidResponse(_) | ApiError::InvalidRequest(_) => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    /// Raw (possibly truncated) error body returned by the server.
    pub fn body(&self) -> Option<&str> {
        match self {
            ApiError::BadRequest { body }
            | ApiError::Unauthorized { body }
            | ApiError::AccessDenied { body }
            | ApiError::NotFound { body }
            | ApiError::Server { body, .. }
            | ApiError::Status { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Error body parsed as JSON, when the server sent JSON.
    pub fn json_body(&self) -> Option<Value> {
        self.body().and_then(|b| serde_json::from_str(b).ok())
    }

    /// One-line message for a person, built from a REST-framework error body.
    ///
    /// `non_field_errors` wins, then `detail`, then every `field: messages`
    /// pair. Errors without a usable body fall back to a generic message.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Network(e) if e.is_timeout() => {
                return "Connection timed out. Please try again.".to_string();
            }
            ApiError::Network(_) => {
                return "Unable to connect to server. Check your connection.".to_string();
            }
            _ => {}
        }

        match self.json_body() {
            Some(Value::Object(map)) => {
                if let Some(errors) = map.get("non_field_errors") {
                    return join_messages(errors, ", ");
                }
                if let Some(detail) = map.get("detail") {
                    return join_messages(detail, ", ");
                }
                if map.is_empty() {
                    return GENERIC_ERROR_MESSAGE.to_string();
                }
                map.iter()
                    .map(|(field, value)| format!("{}: {}", field, join_messages(value, ", ")))
                    .collect::<Vec<_>>()
                    .join("; ")
            }
            _ => GENERIC_ERROR_MESSAGE.to_string(),
        }
    }
}

fn join_messages(value: &Value, sep: &str) -> String {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|v| join_messages(v, sep))
            .collect::<Vec<_>>()
            .join(sep),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_mapping() {
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_REQUEST, "{}"),
            ApiError::BadRequest { .. }
        ));
        assert!(ApiError::from_status(StatusCode::UNAUTHORIZED, "").is_unauthorized());
        assert!(matches!(
            ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, ""),
            ApiError::RateLimited
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_GATEWAY, "upstream"),
            ApiError::Server { .. }
        ));
        assert_eq!(
            ApiError::from_status(StatusCode::CONFLICT, "").status(),
            Some(StatusCode::CONFLICT)
        );
    }

    #[test]
    fn test_truncate_body() {
        let long = "x".repeat(MAX_ERROR_BODY_LENGTH + 20);
        let err = ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, &long);
        let body = err.body().unwrap();
        assert!(body.starts_with(&"x".repeat(MAX_ERROR_BODY_LENGTH)));
        assert!(body.ends_with("(truncated, 520 total bytes)"));
    }

    #[test]
    fn test_user_message_non_field_errors() {
        let err = ApiError::from_status(
            StatusCode::BAD_REQUEST,
            r#"{"non_field_errors": ["Invalid credentials", "Account locked"]}"#,
        );
        assert_eq!(err.user_message(), "Invalid credentials, Account locked");
    }

    #[test]
    fn test_user_message_detail() {
        let err = ApiError::from_status(
            StatusCode::FORBIDDEN,
            r#"{"detail": "You do not have permission to perform this action."}"#,
        );
        assert_eq!(
            err.user_message(),
            "You do not have permission to perform this action."
        );
    }

    #[test]
    fn test_user_message_field_errors() {
        let err = ApiError::from_status(
            StatusCode::BAD_REQUEST,
            r#"{"email": ["Enter a valid email address."], "password": "This field is required."}"#,
        );
        assert_eq!(
            err.user_message(),
            "email: Enter a valid email address.; password: This field is required."
        );
    }

    #[test]
    fn test_user_message_fallback() {
        let err = ApiError::from_status(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert_eq!(err.user_message(), GENERIC_ERROR_MESSAGE);
        assert_eq!(
            ApiError::InvalidResponse("oops".into()).user_message(),
            GENERIC_ERROR_MESSAGE
        );
    }
}
