//! # Transport Boundary
//!
//! Everything this crate knows about talking to the identity service goes
//! through the [`Transport`] trait. The session manager and the ceremonies
//! build [`ApiRequest`] values and hand them over; the transport performs the
//! HTTP exchange and either returns the decoded JSON body or a structured
//! [`TransportError`].
//!
//! ## Submodules
//! - `endpoints`: the REST surface of the identity service
//! - `http`: the `reqwest`-backed implementation used in production
//!
//! Retry and backoff policy, if any, belong to implementations of this trait.

pub mod endpoints;
pub mod http;

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

pub use http::HttpTransport;

/// HTTP verbs used by the identity service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        };
        f.write_str(verb)
    }
}

/// A single request to the identity service.
///
/// `path` is relative to the configured base URL (e.g. `/auth/sessions`).
/// `bearer` carries the access token for requests made on behalf of the
/// current user.
#[derive(Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub bearer: Option<String>,
}

impl ApiRequest {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            bearer: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Attach the access token, if there is one.
    pub fn bearer(mut self, token: Option<&str>) -> Self {
        self.bearer = token.map(str::to_string);
        self
    }
}

// Bodies carry passwords and assertions and the bearer is a live token,
// so neither is printed.
impl fmt::Debug for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("has_body", &self.body.is_some())
            .field("authenticated", &self.bearer.is_some())
            .finish()
    }
}

/// Failure raised by a [`Transport`].
///
/// This type never leaves the crate's public operations; it is turned into
/// an `AuthError` by `error::normalize_transport`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    /// The server answered with a non-2xx status.
    /// `body` is the decoded JSON body, or `Value::Null` if it was empty.
    #[error("HTTP {status}")]
    Status { status: u16, body: Value },

    /// No response was received (connection, TLS, timeout).
    #[error("Request failed: {0}")]
    Request(String),

    /// A 2xx response whose body was not valid JSON.
    #[error("Malformed response body: {0}")]
    Decode(String),
}

/// Performs authenticated HTTP requests against the identity service.
///
/// A successful exchange yields the decoded JSON body, or `Value::Null` for
/// an empty body.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<Value, TransportError>;
}
