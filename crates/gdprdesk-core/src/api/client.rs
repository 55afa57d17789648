//! HTTP pipeline for the compliance back-office REST API.
//!
//! Every call goes through the same two steps: `prepare` attaches the stored
//! token, `check_response` observes the outcome and drops the session on a
//! 401. Endpoint wrappers live in `endpoints.rs`.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{header, Client, Method};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::SessionHandle;

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Base URL used when nothing is configured
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api/";

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Authorization scheme the server expects. Not `Bearer`.
const AUTH_SCHEME: &str = "Token";

/// A request before authentication is attached.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<Value>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            query: None,
            body: None,
        }
    }

    pub fn get(path: &str) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: &str) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn with_query<Q: Serialize + ?Sized>(mut self, query: &Q) -> Result<Self, ApiError> {
        self.query = Some(
            serde_json::to_value(query).map_err(|e| ApiError::InvalidRequest(e.to_string()))?,
        );
        Ok(self)
    }

    pub fn with_json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        self.body = Some(
            serde_json::to_value(body).map_err(|e| ApiError::InvalidRequest(e.to_string()))?,
        );
        Ok(self)
    }
}

/// API client for the compliance back-office.
/// Clone is cheap - reqwest::Client and SessionHandle are both Arc inside.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: SessionHandle,
}

impl ApiClient {
    /// Create a new API client rooted at `base_url`
    pub fn new(base_url: &str, session: SessionHandle) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// Join the base URL and a path with exactly one slash between them,
    /// so `users/me/` and `/users/me/` land on the same URL.
    pub fn endpoint_url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    fn auth_headers(&self) -> header::HeaderMap {
        let mut headers = header::HeaderMap::new();
        if let Some(token) = self.session.token() {
            match header::HeaderValue::from_str(&format!("{} {}", AUTH_SCHEME, token)) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    headers.insert(header::AUTHORIZATION, value);
                }
                Err(_) => warn!("Stored token is not a valid header value, sending unauthenticated"),
            }
        }
        headers
    }

    /// Build the outgoing request with the stored token attached. Never fails.
    pub fn prepare(&self, request: &ApiRequest) -> reqwest::RequestBuilder {
        let url = self.endpoint_url(&request.path);
        let headers = self.auth_headers();
        debug!(
            method = %request.method,
            url = %url,
            authenticated = headers.contains_key(header::AUTHORIZATION),
            "Sending request"
        );

        let mut builder = self.client.request(request.method.clone(), &url).headers(headers);
        if let Some(ref query) = request.query {
            builder = builder.query(query);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }
        builder
    }

    /// Observe a response. Success passes through; a 401 drops the session
    /// before the error is returned. Nothing is retried or swallowed.
    async fn check_response(
        &self,
        url: &str,
        result: std::result::Result<reqwest::Response, reqwest::Error>,
    ) -> Result<reqwest::Response, ApiError> {
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                warn!(url = url, error = %e, "Request failed without a response");
                return Err(ApiError::Network(e));
            }
        };

        let status = response.status();
        if status.is_success() {
            debug!(url = url, status = status.as_u16(), "Response received");
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        warn!(url = url, status = status.as_u16(), "API error response");
        if status == reqwest::StatusCode::UNAUTHORIZED {
            self.session.invalidate();
        }
        Err(ApiError::from_status(status, &body))
    }

    /// Run a request through the pipeline and decode the JSON body.
    /// An empty body decodes as JSON `null`.
    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let url = self.endpoint_url(&request.path);
        let result = self.prepare(&request).send().await;
        let response = self.check_response(&url, result).await?;

        let text = response.text().await?;
        let text = if text.trim().is_empty() { "null" } else { text.as_str() };
        serde_json::from_str(text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", url, e))
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(ApiRequest::get(path)).await
    }

    pub async fn get_with_query<T: DeserializeOwned, Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<T, ApiError> {
        self.send(ApiRequest::get(path).with_query(query)?).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.send(ApiRequest::post(path).with_json(body)?).await
    }

    /// POST without a body, for action endpoints.
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(ApiRequest::post(path)).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.send(ApiRequest::new(Method::PUT, path).with_json(body)?).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send::<Value>(ApiRequest::new(Method::DELETE, path))
            .await
            .map(|_| ())
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
