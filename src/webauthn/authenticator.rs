//! # Authenticator Boundary
//!
//! The platform authenticator (Face ID, fingerprint, security key...) is an
//! external collaborator. It receives a server-issued [`Challenge`] and
//! returns the credential JSON that the browser API would have produced:
//! - registration: the `navigator.credentials.create()` result
//! - authentication: the `navigator.credentials.get()` result
//!
//! Rejections (user cancelled, no matching credential, already enrolled)
//! come back as [`AuthenticatorError`] and are normalised by
//! `error::normalize_authenticator`.

use crate::webauthn::types::Challenge;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Rejection raised by an [`Authenticator`].
///
/// `code` mirrors the string codes browser libraries attach to their errors,
/// e.g. `ERROR_AUTHENTICATOR_PREVIOUSLY_REGISTERED`.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct AuthenticatorError {
    pub code: Option<String>,
    pub message: String,
}

impl AuthenticatorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// Turns a challenge into a signed credential.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Create a new credential for a registration challenge.
    async fn create_credential(&self, challenge: &Challenge) -> Result<Value, AuthenticatorError>;

    /// Sign an authentication challenge with an existing credential.
    async fn get_assertion(&self, challenge: &Challenge) -> Result<Value, AuthenticatorError>;
}

/// Authenticator for environments without one (e.g. a terminal).
/// Declines every ceremony.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuthenticator;

impl NoAuthenticator {
    fn decline() -> AuthenticatorError {
        AuthenticatorError::new("No platform authenticator is available")
            .with_code("ERROR_NO_AUTHENTICATOR")
    }
}

#[async_trait]
impl Authenticator for NoAuthenticator {
    async fn create_credential(&self, _challenge: &Challenge) -> Result<Value, AuthenticatorError> {
        Err(Self::decline())
    }

    async fn get_assertion(&self, _challenge: &Challenge) -> Result<Value, AuthenticatorError> {
        Err(Self::decline())
    }
}
