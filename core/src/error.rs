//! Error types for the picfeed client core.
//!
//! # Design
//! `NotFound` gets a dedicated variant because callers distinguish "this
//! user does not exist yet" from "the server returned an unexpected status"
//! (the create-user-if-missing flow depends on it). All other non-success
//! responses land in `HttpError` with the raw status and body.
//!
//! None of these errors reach the UI directly: the data manager logs them
//! and converts them to empty or absent results.

use thiserror::Error;

/// Errors returned by `PicClient` build and parse methods.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server returned 404.
    #[error("resource not found")]
    NotFound,

    /// The server returned a status other than the expected one and not 404.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),
}

/// Errors raised by a `Transport` while executing a request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The request never produced a response (connection refused, DNS, TLS...).
    #[error("transport failed: {0}")]
    Failed(String),

    /// The transport was shut down before the request completed.
    #[error("transport closed")]
    Closed,
}

/// Errors raised while loading a `ClientConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("missing base request URL for {mode} mode")]
    MissingBaseUrl { mode: &'static str },
}
