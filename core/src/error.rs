//! Error types for the Learnify API client.
//!
//! # Design
//! Every failure a call can hit maps to exactly one variant. Configuration
//! and session errors are raised before anything touches the network; `Api`
//! carries whatever the server said about a status >= 400; `Validation`
//! covers 2xx bodies that do not match the requested shape.

use thiserror::Error;

/// Errors returned by `LearnifyClient` operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing token for an authenticated call, an update with nothing to
    /// update, or an invalid configuration value.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A request was attempted outside `LearnifyClient::open` / `scoped`.
    #[error("session not initialized: open a session with `LearnifyClient::open` or `LearnifyClient::scoped`")]
    SessionNotActive,

    /// The server answered with a status code >= 400.
    #[error("API error {status_code}: {message}")]
    Api { status_code: u16, message: String },

    /// A successful response body did not match the expected schema.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The HTTP round-trip itself failed (DNS, connect, I/O).
    #[error("transport error: {0}")]
    Transport(String),
}

impl ApiError {
    /// HTTP status code for `Api` errors.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Api { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }

    /// True when the error was raised before any request left the client.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            ApiError::Configuration(_) | ApiError::SessionNotActive | ApiError::Serialization(_)
        )
    }
}
