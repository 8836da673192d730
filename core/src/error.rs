//! Error type for service calls.
//!
//! # Design
//! Pre-flight failures (`NoHostsAvailable`, `MissingRequiredParameter`,
//! `MissingPathArgument`) are raised before any bytes hit the network, so
//! callers can tell "nothing was sent" apart from a transport failure.
//! Transport errors wrap `ureq::Error` transparently and are never retried
//! or rewritten here.

use thiserror::Error;

/// Errors returned by host selection, request assembly and dispatch.
#[derive(Debug, Error)]
pub enum CallError {
    /// The service exposed an empty host list. No request was attempted.
    #[error("no hosts available for service `{service}`")]
    NoHostsAvailable { service: String },

    /// Required parameters were absent from both the endpoint defaults and
    /// the call-site overrides. No request was attempted.
    #[error("endpoint `{endpoint}` is missing required parameter(s): {}", .missing.join(", "))]
    MissingRequiredParameter {
        endpoint: String,
        missing: Vec<String>,
    },

    /// A `{placeholder}` in the endpoint path had no matching argument.
    #[error("no value supplied for path placeholder `{0}`")]
    MissingPathArgument(String),

    /// The request could not be expressed to the transport (bad header
    /// name or value, malformed URL).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No adapter is mounted for the URL, usually because the session was
    /// already closed.
    #[error("no adapter mounted for `{0}`")]
    NoAdapter(String),

    /// The transport failed: connection, TLS, DNS or timeout.
    #[error(transparent)]
    Transport(#[from] ureq::Error),

    /// Reading the response body failed.
    #[error("response body read failed: {0}")]
    Body(#[source] std::io::Error),

    /// The response encoding label is not one this crate can decode.
    #[error("unsupported encoding `{0}`")]
    UnsupportedEncoding(String),

    /// The body was not valid in the declared encoding.
    #[error("response body is not valid {0}")]
    Decode(String),

    /// A JSON request body could not be serialized.
    #[error("request serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CallError {
    /// True for errors raised before any network I/O was attempted.
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            CallError::NoHostsAvailable { .. }
                | CallError::MissingRequiredParameter { .. }
                | CallError::MissingPathArgument(_)
                | CallError::InvalidRequest(_)
                | CallError::NoAdapter(_)
        )
    }
}
