//! # Passkey Authentication
//!
//! Logs a user in with an existing passkey. The ceremony doubles as a login:
//! on success the verification response is installed as the current session.

use crate::error::{normalize_malformed_response, AuthResult};
use crate::session::Session;
use crate::state::SessionContext;
use crate::webauthn::ceremony::Ceremony;
use crate::webauthn::types::CeremonyKind;
use tracing::info;

/// Run the authentication ceremony for `username`.
///
/// ## Flow
/// 1. Request an authentication challenge
/// 2. Have the authenticator sign it
/// 3. Strip `clientExtensionResults` and submit the assertion
/// 4. Install the verified response as the current session
///
/// ## Errors
/// - `Network`: a request failed
/// - `CeremonyProtocol`: no challenge in the options, no `credentialId` in
///   the verification response ("Not verified!"), or a verification response
///   that is not a session
/// - `CeremonyAborted`: the authenticator declined
///
/// The current session is untouched unless every step succeeds.
pub async fn authenticate_with_assertion(
    ctx: &SessionContext,
    username: &str,
) -> AuthResult<Session> {
    let result = Ceremony::new(CeremonyKind::Authentication, username)
        .request_challenge(ctx.transport())
        .await?
        .produce_assertion(ctx.authenticator())
        .await?
        .verify(ctx.transport())
        .await?;

    let session: Session = serde_json::from_value(result.body)
        .map_err(|e| normalize_malformed_response("verification", e))?;

    info!(user_id = %session.user_id, credential_id = ?result.credential_id, "passkey login");
    ctx.install(session.clone()).await;

    Ok(session)
}
