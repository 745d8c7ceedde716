//! # Error Handling
//!
//! This module defines the single error taxonomy returned by every public
//! operation, and the normalisation functions that build it from the errors
//! raised by external collaborators (the transport and the authenticator).
//!
//! ## Taxonomy
//! - `Network`: transport failure or non-2xx response
//! - `InvalidState`: operation invoked without its preconditions
//! - `CeremonyAborted`: the authenticator declined or the user cancelled
//! - `CeremonyProtocol`: the server answered without an expected field,
//!   or explicitly signalled that verification failed
//! - `BenignReenrollment`: the "already registered" signal of the
//!   registration ceremony, reported alongside a success
//!
//! No transport or authenticator error type crosses a public operation.
//! Callers always get an `AuthError`, and every `AuthError` carries an
//! opaque [`ErrorDetail`] suitable for display or logging.

use crate::transport::TransportError;
use crate::webauthn::authenticator::AuthenticatorError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use thiserror::Error;

/// Code raised when an authenticator is enrolled a second time.
pub const PREVIOUSLY_REGISTERED: &str = "ERROR_AUTHENTICATOR_PREVIOUSLY_REGISTERED";

/// Detail text used when a ceremony's verification step is rejected.
pub const NOT_VERIFIED: &str = "Not verified!";

/// Opaque error payload, usually the JSON body the server sent back.
///
/// The payload is kept as-is so callers can render whatever the identity
/// service produced. [`ErrorDetail::text`] extracts a human-readable line:
/// a bare string, the `detail` field, or the `message` field, in that order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorDetail(Value);

impl ErrorDetail {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Build a detail payload shaped like the server's own `{ "detail": ... }`.
    pub fn message(message: impl Into<String>) -> Self {
        Self(json!({ "detail": message.into() }))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Machine-readable `code` field, if the payload carries one.
    pub fn code(&self) -> Option<&str> {
        self.0.get("code").and_then(Value::as_str)
    }

    /// Human-readable rendering of the payload.
    pub fn text(&self) -> String {
        match &self.0 {
            Value::Null => "unknown error".to_string(),
            Value::String(s) => s.clone(),
            Value::Object(map) => match map.get("detail").or_else(|| map.get("message")) {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => self.0.to_string(),
            },
            other => other.to_string(),
        }
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

/// The closed error taxonomy shared by the session manager and the ceremonies.
///
/// ## Construction
/// Variants are public so callers can match on them, but inside the crate
/// they are only built through the `normalize_*` functions and the small
/// constructors at the bottom of this module.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthError {
    /// Transport failure or non-2xx response.
    ///
    /// `status` is `None` when no response was received at all
    /// (connection refused, timeout, DNS failure).
    #[error("Network error: {detail}")]
    Network {
        status: Option<u16>,
        detail: ErrorDetail,
    },

    /// Operation invoked without its preconditions
    /// (no current session, missing user id or email).
    #[error("Invalid state: {0}")]
    InvalidState(ErrorDetail),

    /// The authenticator declined or the user cancelled.
    /// Not a server-side rejection.
    #[error("Ceremony aborted: {0}")]
    CeremonyAborted(ErrorDetail),

    /// Server response missing an expected field, or explicitly
    /// signalling non-verification.
    #[error("Ceremony protocol error: {0}")]
    CeremonyProtocol(ErrorDetail),

    /// The authenticator was already enrolled. Informational only.
    #[error("Authenticator already registered: {0}")]
    BenignReenrollment(ErrorDetail),
}

/// Discriminant of [`AuthError`], handy for assertions and metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthErrorKind {
    Network,
    InvalidState,
    CeremonyAborted,
    CeremonyProtocol,
    BenignReenrollment,
}

impl AuthError {
    pub fn kind(&self) -> AuthErrorKind {
        match self {
            AuthError::Network { .. } => AuthErrorKind::Network,
            AuthError::InvalidState(_) => AuthErrorKind::InvalidState,
            AuthError::CeremonyAborted(_) => AuthErrorKind::CeremonyAborted,
            AuthError::CeremonyProtocol(_) => AuthErrorKind::CeremonyProtocol,
            AuthError::BenignReenrollment(_) => AuthErrorKind::BenignReenrollment,
        }
    }

    /// The opaque payload to show to the user or write to logs.
    pub fn detail(&self) -> &ErrorDetail {
        match self {
            AuthError::Network { detail, .. } => detail,
            AuthError::InvalidState(detail)
            | AuthError::CeremonyAborted(detail)
            | AuthError::CeremonyProtocol(detail)
            | AuthError::BenignReenrollment(detail) => detail,
        }
    }

    /// Stable error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::Network { .. } => "AUTH_NETWORK",
            AuthError::InvalidState(_) => "AUTH_INVALID_STATE",
            AuthError::CeremonyAborted(_) => "AUTH_CEREMONY_ABORTED",
            AuthError::CeremonyProtocol(_) => "AUTH_CEREMONY_PROTOCOL",
            AuthError::BenignReenrollment(_) => "AUTH_BENIGN_REENROLLMENT",
        }
    }

    /// HTTP status of the failed response, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            AuthError::Network { status, .. } => *status,
            _ => None,
        }
    }

    /// `false` only for the informational re-enrollment signal.
    pub fn is_failure(&self) -> bool {
        !matches!(self, AuthError::BenignReenrollment(_))
    }
}

/// Result pair returned by every public operation.
///
/// `Ok(value)` is the `(value, null)` shape and `Err(error)` is `(null, error)`.
pub type AuthResult<T> = Result<T, AuthError>;

/// Map a transport failure into the taxonomy.
///
/// Every transport failure is a network error, with the server's body kept
/// as the detail when present. A body carrying a machine-readable `code`
/// keeps it; only the registration ceremony gives one of those codes a
/// meaning of its own (see [`reclassify_reenrollment`]).
pub fn normalize_transport(err: TransportError) -> AuthError {
    match err {
        TransportError::Status { status, body } => {
            let detail = if body.is_null() {
                ErrorDetail::message(format!("HTTP {}", status))
            } else {
                ErrorDetail::new(body)
            };

            AuthError::Network {
                status: Some(status),
                detail,
            }
        }
        TransportError::Request(message) => AuthError::Network {
            status: None,
            detail: ErrorDetail::message(message),
        },
        TransportError::Decode(message) => AuthError::Network {
            status: None,
            detail: ErrorDetail::message(format!("Malformed response: {}", message)),
        },
    }
}

/// Map an authenticator rejection into the taxonomy.
///
/// The authenticator's `code` is kept in the detail so the registration
/// ceremony can recognise the "previously registered" signal.
pub fn normalize_authenticator(err: AuthenticatorError) -> AuthError {
    AuthError::CeremonyAborted(ErrorDetail::new(json!({
        "detail": err.message,
        "code": err.code,
    })))
}

/// Registration only: turn a failure carrying the "previously registered"
/// code into `BenignReenrollment`.
///
/// Applies to network errors (the server rejected the attestation) and
/// aborted ceremonies (the authenticator refused to enroll twice). Any
/// other error is returned unchanged.
pub fn reclassify_reenrollment(err: AuthError) -> AuthError {
    match err {
        AuthError::Network { ref detail, .. } | AuthError::CeremonyAborted(ref detail)
            if detail.code() == Some(PREVIOUSLY_REGISTERED) =>
        {
            AuthError::BenignReenrollment(detail.clone())
        }
        other => other,
    }
}

/// A 2xx response whose body could not be read as the expected shape.
pub fn normalize_malformed_response(what: &str, err: serde_json::Error) -> AuthError {
    AuthError::CeremonyProtocol(ErrorDetail::message(format!(
        "Malformed {} response: {}",
        what, err
    )))
}

pub(crate) fn invalid_state(message: &str) -> AuthError {
    AuthError::InvalidState(ErrorDetail::message(message))
}

pub(crate) fn protocol_error(message: &str) -> AuthError {
    AuthError::CeremonyProtocol(ErrorDetail::message(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_text_prefers_detail_field() {
        let detail = ErrorDetail::new(json!({ "detail": "Invalid credentials", "message": "x" }));
        assert_eq!(detail.text(), "Invalid credentials");

        let detail = ErrorDetail::new(json!({ "message": "Try again" }));
        assert_eq!(detail.text(), "Try again");

        let detail = ErrorDetail::new(json!("plain text"));
        assert_eq!(detail.text(), "plain text");

        let detail = ErrorDetail::new(json!({ "detail": [{ "loc": ["body"], "msg": "missing" }] }));
        assert!(detail.text().contains("missing"));
    }

    #[test]
    fn test_status_error_keeps_server_body() {
        let err = normalize_transport(TransportError::Status {
            status: 401,
            body: json!({ "detail": "Invalid refresh token" }),
        });

        assert_eq!(err.kind(), AuthErrorKind::Network);
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.detail().text(), "Invalid refresh token");
        assert_eq!(err.code(), "AUTH_NETWORK");
        assert_eq!(err.to_string(), "Network error: Invalid refresh token");
    }

    #[test]
    fn test_status_error_without_body() {
        let err = normalize_transport(TransportError::Status {
            status: 502,
            body: Value::Null,
        });
        assert_eq!(err.detail().text(), "HTTP 502");
    }

    #[test]
    fn test_request_failure_has_no_status() {
        let err = normalize_transport(TransportError::Request("connection refused".into()));
        assert_eq!(err.kind(), AuthErrorKind::Network);
        assert_eq!(err.status(), None);
        assert_eq!(err.detail().text(), "connection refused");
    }

    #[test]
    fn test_reenrollment_code_from_server_stays_network() {
        let err = normalize_transport(TransportError::Status {
            status: 409,
            body: json!({ "code": PREVIOUSLY_REGISTERED, "detail": "already there" }),
        });
        assert_eq!(err.kind(), AuthErrorKind::Network);
        assert_eq!(err.status(), Some(409));
        assert!(err.is_failure());
        assert_eq!(err.detail().code(), Some(PREVIOUSLY_REGISTERED));
    }

    #[test]
    fn test_authenticator_errors_are_aborts() {
        let err = normalize_authenticator(AuthenticatorError::new("user cancelled"));
        assert_eq!(err.kind(), AuthErrorKind::CeremonyAborted);
        assert_eq!(err.detail().text(), "user cancelled");
        assert!(err.is_failure());

        let err = normalize_authenticator(
            AuthenticatorError::new("already enrolled").with_code(PREVIOUSLY_REGISTERED),
        );
        assert_eq!(err.kind(), AuthErrorKind::CeremonyAborted);
        assert_eq!(err.detail().code(), Some(PREVIOUSLY_REGISTERED));
    }

    #[test]
    fn test_reclassify_reenrollment() {
        let from_server = normalize_transport(TransportError::Status {
            status: 400,
            body: json!({ "code": PREVIOUSLY_REGISTERED }),
        });
        let err = reclassify_reenrollment(from_server);
        assert_eq!(err.kind(), AuthErrorKind::BenignReenrollment);
        assert!(!err.is_failure());

        let from_authenticator = normalize_authenticator(
            AuthenticatorError::new("already enrolled").with_code(PREVIOUSLY_REGISTERED),
        );
        assert_eq!(
            reclassify_reenrollment(from_authenticator).kind(),
            AuthErrorKind::BenignReenrollment
        );

        let cancelled = normalize_authenticator(AuthenticatorError::new("user cancelled"));
        assert_eq!(reclassify_reenrollment(cancelled.clone()), cancelled);

        let protocol = protocol_error(NOT_VERIFIED);
        assert_eq!(reclassify_reenrollment(protocol.clone()), protocol);
    }

    #[test]
    fn test_malformed_response_is_protocol_error() {
        let json_err = serde_json::from_str::<Value>("not json").unwrap_err();
        let err = normalize_malformed_response("session", json_err);
        assert_eq!(err.kind(), AuthErrorKind::CeremonyProtocol);
        assert!(err.detail().text().starts_with("Malformed session response"));
    }
}
