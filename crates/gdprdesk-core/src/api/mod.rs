//! REST API client module for the compliance back-office.
//!
//! This module provides the `ApiClient` for communicating with the server
//! and typed wrappers for the data subject, consent, request, workflow and
//! document endpoints.
//!
//! The API uses DRF token authentication: `Authorization: Token <key>`.

pub mod client;
pub mod endpoints;
pub mod error;

pub use client::{ApiClient, ApiRequest, DEFAULT_API_URL};
pub use error::ApiError;
