//! Account maintenance: email verification and password reset.
//!
//! Plain request/response exchanges. None of them touch the current session.

use super::types::{Ack, EmailVerification, PasswordReset, PasswordResetRequest};
use crate::error::{invalid_state, normalize_transport, AuthResult};
use crate::state::SessionContext;
use crate::transport::{endpoints, ApiRequest};
use serde_json::{json, Value};
use tracing::info;

async fn exchange(ctx: &SessionContext, request: ApiRequest) -> AuthResult<Ack> {
    ctx.transport()
        .send(request)
        .await
        .map_err(normalize_transport)
}

/// Ask the server to send a verification email to the current user.
///
/// Succeeds without any request when the email is already verified.
///
/// ## Errors
/// - `InvalidState` if there is no current user, or the user has no email
/// - `Network` if the request fails
pub async fn request_email_verification(ctx: &SessionContext) -> AuthResult<Ack> {
    let session = ctx.current_session();

    if session.as_ref().is_some_and(|s| s.email_verified) {
        return Ok(Value::Bool(true));
    }

    let session = session.ok_or_else(|| invalid_state("Invalid User Id"))?;
    if !session.has_email() {
        return Err(invalid_state("User does not have email"));
    }

    let request = ApiRequest::post(endpoints::email_of(&session.user_id))
        .bearer(session.access_token.as_deref());
    let ack = exchange(ctx, request).await?;

    info!(user_id = %session.user_id, "verification email requested");
    Ok(ack)
}

/// Confirm the email address with the token from the verification email.
pub async fn verify_account(ctx: &SessionContext, verification: &EmailVerification) -> AuthResult<Ack> {
    let request = ApiRequest::put(endpoints::MY_EMAIL)
        .json(json!({ "token": verification.token }))
        .bearer(ctx.access_token().as_deref());

    exchange(ctx, request).await
}

/// Start the password reset flow.
pub async fn forgot_password(ctx: &SessionContext, request: &PasswordResetRequest) -> AuthResult<Ack> {
    let request = ApiRequest::post(endpoints::PASSWORD_RESET).json(json!({ "email": request.email }));

    exchange(ctx, request).await
}

/// Set a new password with the token from the reset email.
pub async fn reset_password(ctx: &SessionContext, reset: &PasswordReset) -> AuthResult<Ack> {
    let request = ApiRequest::put(endpoints::PASSWORD_RESET)
        .json(json!({ "token": reset.token, "password": reset.password }));

    exchange(ctx, request).await
}
