//! # Session Manager
//!
//! Establishes, renews and terminates the user's session against the
//! identity service.
//!
//! ## Submodules
//! - `types`: the session and the request payloads
//! - `account`: email verification and password reset flows
//! - `providers`: federated provider listing
//!
//! ## State changes
//! | Operation | On success | On failure |
//! |---|---|---|
//! | `login`, `signup`, `login_via_federated_provider` | install | unchanged |
//! | `refresh` | replace | **clear** |
//! | `logout` | clear + teardown | clear + teardown (unless there was no session) |

pub mod account;
pub mod providers;
pub mod types;

pub use account::{forgot_password, request_email_verification, reset_password, verify_account};
pub use providers::{cached_providers, list_providers};
pub use types::{
    Ack, Credentials, EmailVerification, FederatedLogin, OAuthProvider, PasswordReset,
    PasswordResetRequest, ProviderLink, Session, SignupRequest, UserId,
};

use crate::error::{invalid_state, normalize_malformed_response, normalize_transport, AuthResult};
use crate::state::SessionContext;
use crate::transport::{endpoints, ApiRequest};
use serde_json::json;
use tracing::{info, warn};

/// Send `request` and read the response as a session, without installing it.
///
/// Transport failures become `Network`; a body that is not a session becomes
/// `CeremonyProtocol`.
async fn fetch_session(ctx: &SessionContext, request: ApiRequest) -> AuthResult<Session> {
    let body = ctx
        .transport()
        .send(request)
        .await
        .map_err(normalize_transport)?;

    serde_json::from_value(body).map_err(|e| normalize_malformed_response("session", e))
}

/// Send `request` and install the returned session. On any failure the
/// current session is left as it was.
async fn establish(ctx: &SessionContext, request: ApiRequest) -> AuthResult<Session> {
    let session = fetch_session(ctx, request).await?;
    ctx.install(session.clone()).await;
    Ok(session)
}

/// Password login.
///
/// ## Flow
/// 1. `POST /auth/sessions` with `{ username, password }`
/// 2. Read the response as a [`Session`] (tokens included)
/// 3. Install it as the current session and persist its tokens
///
/// ## Errors
/// - `Network`: the server rejected the credentials or could not be reached.
///   The detail is the server's body, e.g. `{"detail": "Incorrect username or password"}`
/// - `CeremonyProtocol`: a 2xx response that is not a session (no user id)
///
/// A failed login leaves any current session in place.
pub async fn login(ctx: &SessionContext, credentials: &Credentials) -> AuthResult<Session> {
    let request = ApiRequest::post(endpoints::SESSIONS).json(credentials.to_body());
    let session = establish(ctx, request).await?;

    info!(user_id = %session.user_id, "logged in");
    Ok(session)
}

/// Exchange the outcome of a provider's own consent flow for a session.
///
/// The redirect/consent flow itself happens elsewhere; this only submits
/// its result to `POST /auth/sessions/oauth`. The provider name is merged
/// into the provider-specific payload.
///
/// ## Errors
/// Same as [`login`].
pub async fn login_via_federated_provider(
    ctx: &SessionContext,
    login: &FederatedLogin,
) -> AuthResult<Session> {
    let request = ApiRequest::post(endpoints::OAUTH_SESSIONS).json(login.to_body());
    let session = establish(ctx, request).await?;

    info!(user_id = %session.user_id, provider = %login.provider, "logged in via provider");
    Ok(session)
}

/// Create a new account; on success the user is logged in.
///
/// The server answers `POST /auth/users` with the new user's session, which
/// is installed exactly like a login.
///
/// ## Errors
/// - `Network`: e.g. the username is taken (the server's body is the detail)
/// - `CeremonyProtocol`: a 2xx response that is not a session
pub async fn signup(ctx: &SessionContext, request: &SignupRequest) -> AuthResult<Session> {
    let request = ApiRequest::post(endpoints::USERS).json(request.to_body());
    let session = establish(ctx, request).await?;

    info!(user_id = %session.user_id, "signed up");
    Ok(session)
}

/// Renew the session with the stored refresh token.
///
/// Safe to call without a session: an absent token is sent as an empty
/// string and the server is expected to reject it.
///
/// Fails closed: any failure clears the current session, so an invalid
/// refresh token never leaves a stale session looking valid. If the server
/// does not rotate the refresh token, the one just used is kept.
///
/// ## Which token is sent
/// The current session's refresh token. Only when there is no session (a
/// fresh process) is the token persisted by a previous run used.
///
/// ## Errors
/// - `Network`: the server rejected the token or could not be reached
/// - `CeremonyProtocol`: a 2xx response that is not a session
pub async fn refresh(ctx: &SessionContext) -> AuthResult<Session> {
    let refresh_token = ctx.stored_refresh_token().await;
    let request = ApiRequest::put(endpoints::SESSION)
        .json(json!({ "refresh_token": refresh_token.clone().unwrap_or_default() }));

    match fetch_session(ctx, request).await {
        Ok(mut session) => {
            if session.refresh_token.is_none() {
                session.refresh_token = refresh_token;
            }
            ctx.install(session.clone()).await;
            info!(user_id = %session.user_id, "session refreshed");
            Ok(session)
        }
        Err(err) => {
            warn!("Session refresh failed, clearing session: {}", err);
            ctx.clear().await;
            Err(err)
        }
    }
}

/// Terminate the current session.
///
/// Requires a current session. The termination request is best-effort: the
/// local session is cleared and every teardown target fires whatever the
/// server answers, and the server's error (if any) is returned afterwards.
///
/// ## Errors
/// - `InvalidState` if there is no current session (nothing is torn down)
/// - `Network` if the termination request failed (local state is still cleared)
pub async fn logout(ctx: &SessionContext) -> AuthResult<Ack> {
    let session = ctx
        .current_session()
        .ok_or_else(|| invalid_state("Invalid User Id"))?;

    let request = ApiRequest::delete(endpoints::session_of(&session.user_id))
        .bearer(session.access_token.as_deref());
    let outcome = ctx
        .transport()
        .send(request)
        .await
        .map_err(normalize_transport);

    if let Err(err) = &outcome {
        warn!(user_id = %session.user_id, "Session termination failed, clearing local state anyway: {}", err);
    }

    ctx.clear().await;
    let reset = ctx.teardown().teardown_all();

    info!(user_id = %session.user_id, reset, "logged out");
    outcome
}
