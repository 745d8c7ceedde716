//! # Ceremony State Machine
//!
//! Both ceremonies walk the same states:
//!
//! ```text
//! Init → ChallengeRequested → ChallengeReceived → AssertionProduced → Verifying → Verified
//!                                                                              ↘ Rejected
//! ```
//!
//! The states that hold data are types ([`Init`], [`ChallengeReceived`],
//! [`AssertionProduced`]), and each step consumes the previous value. An
//! assertion can therefore only be produced from a challenge that was just
//! received, and a challenge can only be signed once. A failure at any step
//! ends the attempt; the caller starts over with a fresh challenge.

use crate::error::{normalize_authenticator, normalize_transport, AuthError, AuthResult};
use crate::transport::{endpoints, ApiRequest, Transport};
use crate::webauthn::authenticator::Authenticator;
use crate::webauthn::types::{Assertion, CeremonyKind, Challenge, VerificationResult};
use std::fmt;
use tracing::debug;

/// Named states, used for logging transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CeremonyState {
    Init,
    ChallengeRequested,
    ChallengeReceived,
    AssertionProduced,
    Verifying,
    Verified,
    Rejected,
}

impl fmt::Display for CeremonyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Nothing requested yet.
#[derive(Debug)]
pub struct Init;

/// Holds the fresh challenge issued by the server.
#[derive(Debug)]
pub struct ChallengeReceived {
    challenge: Challenge,
}

/// Holds the authenticator's output for the challenge.
#[derive(Debug)]
pub struct AssertionProduced {
    assertion: Assertion,
}

/// One ceremony attempt in state `S`.
#[derive(Debug)]
pub struct Ceremony<S> {
    kind: CeremonyKind,
    username: String,
    bearer: Option<String>,
    state: S,
}

impl<S> Ceremony<S> {
    pub fn kind(&self) -> CeremonyKind {
        self.kind
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    fn enter(&self, state: CeremonyState) {
        debug!(ceremony = %self.kind, user = %self.username, state = %state, "ceremony transition");
    }

    fn reject(&self, err: AuthError) -> AuthError {
        debug!(
            ceremony = %self.kind,
            user = %self.username,
            state = %CeremonyState::Rejected,
            code = err.code(),
            "ceremony transition"
        );
        err
    }

    fn advance<T>(self, state: T) -> Ceremony<T> {
        Ceremony {
            kind: self.kind,
            username: self.username,
            bearer: self.bearer,
            state,
        }
    }
}

impl Ceremony<Init> {
    pub fn new(kind: CeremonyKind, username: &str) -> Self {
        let ceremony = Self {
            kind,
            username: username.to_string(),
            bearer: None,
            state: Init,
        };
        ceremony.enter(CeremonyState::Init);
        ceremony
    }

    /// Send the access token with the ceremony's requests.
    pub fn with_bearer(mut self, token: Option<String>) -> Self {
        self.bearer = token;
        self
    }

    /// Ask the server for a challenge.
    ///
    /// ## Errors
    /// - `Network` if the options request fails (returned as-is)
    /// - `CeremonyProtocol` if the options lack a usable challenge, or
    ///   registration options lack the user
    pub async fn request_challenge(
        self,
        transport: &dyn Transport,
    ) -> AuthResult<Ceremony<ChallengeReceived>> {
        self.enter(CeremonyState::ChallengeRequested);

        let path = match self.kind {
            CeremonyKind::Registration => endpoints::REGISTRATION_OPTIONS,
            CeremonyKind::Authentication => endpoints::AUTHENTICATION_OPTIONS,
        };
        let request = ApiRequest::get(path)
            .query("user", self.username.as_str())
            .bearer(self.bearer.as_deref());

        let options = transport
            .send(request)
            .await
            .map_err(|e| self.reject(normalize_transport(e)))?;

        let challenge = Challenge::from_options(self.kind, &self.username, options)
            .map_err(|e| self.reject(e))?;

        self.enter(CeremonyState::ChallengeReceived);
        Ok(self.advance(ChallengeReceived { challenge }))
    }
}

impl Ceremony<ChallengeReceived> {
    pub fn challenge(&self) -> &Challenge {
        &self.state.challenge
    }

    /// Hand the challenge to the authenticator.
    ///
    /// ## Errors
    /// - `CeremonyAborted` if the authenticator declines. The authenticator's
    ///   code, e.g. "previously registered", is kept in the detail.
    pub async fn produce_assertion(
        self,
        authenticator: &dyn Authenticator,
    ) -> AuthResult<Ceremony<AssertionProduced>> {
        let challenge = &self.state.challenge;
        let produced = match self.kind {
            CeremonyKind::Registration => authenticator.create_credential(challenge).await,
            CeremonyKind::Authentication => authenticator.get_assertion(challenge).await,
        };

        let payload = produced.map_err(|e| self.reject(normalize_authenticator(e)))?;
        let assertion = Assertion::new(self.kind, payload).map_err(|e| self.reject(e))?;

        self.enter(CeremonyState::AssertionProduced);
        Ok(self.advance(AssertionProduced { assertion }))
    }
}

impl Ceremony<AssertionProduced> {
    pub fn assertion(&self) -> &Assertion {
        &self.state.assertion
    }

    /// Strip the assertion and submit it for verification.
    ///
    /// ## Errors
    /// - `Network` if the verification request fails
    /// - `CeremonyProtocol` with detail "Not verified!" if the server does
    ///   not confirm the ceremony
    pub async fn verify(self, transport: &dyn Transport) -> AuthResult<VerificationResult> {
        self.enter(CeremonyState::Verifying);

        let path = match self.kind {
            CeremonyKind::Registration => endpoints::VERIFY_REGISTRATION,
            CeremonyKind::Authentication => endpoints::VERIFY_AUTHENTICATION,
        };
        let payload = self.state.assertion.clone().stripped().into_payload();
        let request = ApiRequest::post(path)
            .json(payload)
            .bearer(self.bearer.as_deref());

        let body = transport
            .send(request)
            .await
            .map_err(|e| self.reject(normalize_transport(e)))?;

        let result = VerificationResult::from_response(self.kind, body)
            .into_verified()
            .map_err(|e| self.reject(e))?;

        self.enter(CeremonyState::Verified);
        Ok(result)
    }
}
