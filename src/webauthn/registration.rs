//! # Passkey Registration
//!
//! Enrolls a new passkey for a user.
//!
//! ## Registration Flow
//! 1. **Options**: fetch a registration challenge (relying party + user metadata)
//! 2. **Create**: the authenticator creates a credential for it
//! 3. **Verify**: strip what the server must not receive and submit the attestation
//!
//! ## Re-enrollment
//! Registering an authenticator that is already enrolled is reported with the
//! `ERROR_AUTHENTICATOR_PREVIOUSLY_REGISTERED` code. That is a benign retry,
//! not a protocol violation: the ceremony succeeds with
//! [`Enrollment::AlreadyRegistered`] carrying the original error. The code does
//! not say whether the same or a different authenticator triggered it, so the
//! case is logged at `warn` level.

use crate::error::{reclassify_reenrollment, AuthError, AuthResult};
use crate::state::SessionContext;
use crate::webauthn::ceremony::Ceremony;
use crate::webauthn::types::{CeremonyKind, Enrollment};
use tracing::{info, warn};

/// Run the registration ceremony for `username`.
///
/// The access token of the current session, if any, is sent with the
/// ceremony's requests.
///
/// ## Errors
/// - `Network`: the options request failed (returned verbatim, no
///   authenticator call is made) or the verification request failed
/// - `CeremonyProtocol`: options without `user`/`challenge`, or a verification
///   response without a truthy `userVerified` ("Not verified!")
/// - `CeremonyAborted`: the authenticator declined
pub async fn register_credential(ctx: &SessionContext, username: &str) -> AuthResult<Enrollment> {
    let ceremony = Ceremony::new(CeremonyKind::Registration, username)
        .with_bearer(ctx.access_token())
        .request_challenge(ctx.transport())
        .await?;

    // Only the create and verify steps can report a re-enrollment.
    let outcome = match ceremony.produce_assertion(ctx.authenticator()).await {
        Ok(produced) => produced.verify(ctx.transport()).await,
        Err(e) => Err(e),
    }
    .map_err(reclassify_reenrollment);

    match outcome {
        Ok(result) => {
            info!(user = %username, credential_id = ?result.credential_id, "passkey registered");
            Ok(Enrollment::Registered(result))
        }
        Err(err @ AuthError::BenignReenrollment(_)) => {
            warn!(user = %username, "authenticator was already registered: {}", err.detail());
            Ok(Enrollment::AlreadyRegistered(err))
        }
        Err(err) => Err(err),
    }
}
