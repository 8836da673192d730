//! Plain-data value types shared by the assembler, session and dispatcher.
//!
//! # Design
//! Maps are `BTreeMap` so merged headers and encoded query strings come out
//! in a stable order, which keeps logs and tests deterministic. Keys are
//! compared case-sensitively; merging follows "later source wins".

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Header name to value.
pub type Headers = BTreeMap<String, String>;

/// Query or form parameter name to value.
pub type Params = BTreeMap<String, String>;

/// Cookie name to value.
pub type Cookies = BTreeMap<String, String>;

/// Values for `{placeholder}` segments of an endpoint path.
pub type PathArgs = BTreeMap<String, String>;

/// Credentials attached to a request as an `Authorization` header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum Auth {
    Basic {
        username: String,
        password: Option<String>,
    },
    Bearer(String),
}

impl Auth {
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Auth::Basic {
            username: username.into(),
            password: Some(password.into()),
        }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Auth::Bearer(token.into())
    }

    /// Render the `Authorization` header value.
    pub fn header_value(&self) -> String {
        use base64::Engine as _;

        match self {
            Auth::Basic { username, password } => {
                let credentials = match password {
                    Some(p) => format!("{username}:{p}"),
                    None => format!("{username}:"),
                };
                let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
                format!("Basic {encoded}")
            }
            Auth::Bearer(token) => format!("Bearer {token}"),
        }
    }
}

/// A non-JSON request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestData {
    /// Sent as `application/x-www-form-urlencoded`.
    Form(Params),
    /// Sent verbatim; the caller picks the content type.
    Raw(Vec<u8>),
}

impl From<&str> for RequestData {
    fn from(value: &str) -> Self {
        RequestData::Raw(value.as_bytes().to_vec())
    }
}

impl From<String> for RequestData {
    fn from(value: String) -> Self {
        RequestData::Raw(value.into_bytes())
    }
}

impl From<Vec<u8>> for RequestData {
    fn from(value: Vec<u8>) -> Self {
        RequestData::Raw(value)
    }
}

impl From<Params> for RequestData {
    fn from(value: Params) -> Self {
        RequestData::Form(value)
    }
}
