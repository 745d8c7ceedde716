//! # WebAuthn Module
//!
//! This module orchestrates the passkey ceremonies against the identity
//! service.
//!
//! ## Submodules
//! - `types`: challenge, assertion and verification values
//! - `authenticator`: boundary to the platform authenticator
//! - `ceremony`: the typed state machine shared by both ceremonies
//! - `registration`: enrolling a new passkey
//! - `authentication`: logging in with an existing passkey
//!
//! ## WebAuthn Flow Overview
//!
//! ### Registration (Creating a Passkey)
//! 1. Client requests registration options → `GET /auth/generate-registration-options`
//! 2. Authenticator creates a credential for the challenge
//! 3. Client strips authenticator internals → `POST /auth/verify-registration`
//! 4. Server answers with `userVerified`
//!
//! ### Authentication (Logging In)
//! 1. Client requests a challenge → `GET /auth/generate-authentication-options`
//! 2. Authenticator signs the challenge
//! 3. Client strips extension results → `POST /auth/verify-authentication`
//! 4. Server answers with `credentialId` and the new session
//!
//! Ceremonies are single-shot. The caller must not start a second attempt for
//! the same user and ceremony kind before the first resolves; an abandoned
//! attempt leaves its challenge to expire server-side.

pub mod authentication;
pub mod authenticator;
pub mod ceremony;
pub mod registration;
pub mod types;

pub use authentication::authenticate_with_assertion;
pub use authenticator::{Authenticator, AuthenticatorError, NoAuthenticator};
pub use ceremony::{Ceremony, CeremonyState};
pub use registration::register_credential;
pub use types::{Assertion, CeremonyKind, Challenge, Enrollment, VerificationResult};
