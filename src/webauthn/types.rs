//! # Ceremony Types
//!
//! Values that exist only for the lifetime of one ceremony attempt.
//!
//! ## Why serde_json::Value?
//! The options the server issues and the credential the authenticator
//! produces are large WebAuthn structures that this crate only forwards.
//! Instead of modelling every nested field, they are carried as raw JSON and
//! only the fields the ceremony depends on are read or removed.

use crate::error::{protocol_error, AuthError, AuthResult, ErrorDetail, NOT_VERIFIED};
use serde_json::Value;
use std::fmt;

/// Which of the two ceremonies is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CeremonyKind {
    Registration,
    Authentication,
}

impl fmt::Display for CeremonyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CeremonyKind::Registration => f.write_str("registration"),
            CeremonyKind::Authentication => f.write_str("authentication"),
        }
    }
}

/// Server-issued, single-use options bundle that seeds a ceremony.
///
/// ## Example authentication options
/// ```json
/// {
///   "challenge": "y8H0...",
///   "allowCredentials": [{ "id": "...", "type": "public-key" }],
///   "timeout": 60000,
///   "rpId": "example.com"
/// }
/// ```
/// Registration options additionally carry `rp` and `user` objects.
#[derive(Debug, Clone, PartialEq)]
pub struct Challenge {
    pub kind: CeremonyKind,
    pub subject_username: String,
    pub server_nonce: String,
    pub options: Value,
}

impl Challenge {
    /// Validate the server's options for `kind`.
    ///
    /// ## Errors
    /// - `CeremonyProtocol`: registration options without a `user` object,
    ///   or any options without a non-empty `challenge`
    pub fn from_options(kind: CeremonyKind, username: &str, options: Value) -> AuthResult<Self> {
        if kind == CeremonyKind::Registration
            && !options.get("user").is_some_and(Value::is_object)
        {
            return Err(protocol_error("Registration options carry no user"));
        }

        let server_nonce = options
            .get("challenge")
            .and_then(Value::as_str)
            .filter(|nonce| !nonce.is_empty())
            .map(str::to_string)
            .ok_or_else(|| protocol_error("Ceremony options carry no challenge"))?;

        Ok(Self {
            kind,
            subject_username: username.to_string(),
            server_nonce,
            options,
        })
    }
}

/// Extension results the server never reads.
const CLIENT_EXTENSION_RESULTS: &str = "clientExtensionResults";

/// Attestation fields already embedded in `attestationObject`.
const REDUNDANT_ATTESTATION_FIELDS: [&str; 3] =
    ["authenticatorData", "publicKey", "publicKeyAlgorithm"];

/// Client-produced proof derived from a [`Challenge`].
#[derive(Debug, Clone, PartialEq)]
pub struct Assertion {
    kind: CeremonyKind,
    payload: Value,
}

impl Assertion {
    /// Wrap the authenticator's output.
    ///
    /// ## Errors
    /// - `CeremonyAborted` if the authenticator returned something other than
    ///   a JSON object
    pub fn new(kind: CeremonyKind, payload: Value) -> AuthResult<Self> {
        if !payload.is_object() {
            return Err(AuthError::CeremonyAborted(ErrorDetail::message(
                "Authenticator returned a malformed credential",
            )));
        }
        Ok(Self { kind, payload })
    }

    pub fn kind(&self) -> CeremonyKind {
        self.kind
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Remove the fields the verification endpoint must not receive.
    ///
    /// - authentication: `clientExtensionResults`
    /// - registration: `clientExtensionResults` plus `response.authenticatorData`,
    ///   `response.publicKey` and `response.publicKeyAlgorithm`
    pub fn stripped(mut self) -> Self {
        if let Some(object) = self.payload.as_object_mut() {
            object.remove(CLIENT_EXTENSION_RESULTS);

            if self.kind == CeremonyKind::Registration {
                if let Some(response) = object.get_mut("response").and_then(Value::as_object_mut) {
                    for field in REDUNDANT_ATTESTATION_FIELDS {
                        response.remove(field);
                    }
                }
            }
        }
        self
    }

    pub fn into_payload(self) -> Value {
        self.payload
    }
}

/// Terminal value of a ceremony, as reported by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationResult {
    pub verified: bool,
    pub credential_id: Option<String>,
    pub detail: Option<Value>,
    /// The whole response body. For authentication it doubles as the session.
    pub body: Value,
}

impl VerificationResult {
    /// Read a verification response.
    ///
    /// Authentication counts as verified when the body names a
    /// `credentialId`; registration when `userVerified` is truthy.
    pub fn from_response(kind: CeremonyKind, body: Value) -> Self {
        let credential_id = body
            .get("credentialId")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_string);

        let verified = match kind {
            CeremonyKind::Authentication => credential_id.is_some(),
            CeremonyKind::Registration => body.get("userVerified").is_some_and(truthy),
        };

        Self {
            verified,
            credential_id,
            detail: body.get("detail").cloned(),
            body,
        }
    }

    /// `CeremonyProtocol` with detail "Not verified!" unless verified.
    pub fn into_verified(self) -> AuthResult<Self> {
        if self.verified {
            Ok(self)
        } else {
            Err(protocol_error(NOT_VERIFIED))
        }
    }
}

// JSON truthiness: the server is not strict about booleans.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Successful outcome of the registration ceremony.
#[derive(Debug, Clone, PartialEq)]
pub enum Enrollment {
    /// The server verified the new credential.
    Registered(VerificationResult),
    /// The authenticator was enrolled already. Carries the original
    /// `BenignReenrollment` error for diagnostics.
    AlreadyRegistered(AuthError),
}

impl Enrollment {
    pub fn warning(&self) -> Option<&AuthError> {
        match self {
            Enrollment::Registered(_) => None,
            Enrollment::AlreadyRegistered(err) => Some(err),
        }
    }
}
