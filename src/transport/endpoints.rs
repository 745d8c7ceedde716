//! REST surface of the identity service.
//!
//! Paths are relative to `BASE_API_URL`. User-scoped paths splice in a
//! [`UserId`], which only ever holds characters that are valid in a path
//! segment, so no escaping happens here.

use crate::session::UserId;

/// `GET`: list federated identity providers.
pub const OAUTH_PROVIDERS: &str = "/auth/oauth/providers";
/// `POST`: exchange a federated credential for a session.
pub const OAUTH_SESSIONS: &str = "/auth/sessions/oauth";
/// `PUT`: renew a session with `{ refresh_token }`.
pub const SESSION: &str = "/auth/session";
/// `POST`: password login.
pub const SESSIONS: &str = "/auth/sessions";
/// `POST`: signup.
pub const USERS: &str = "/auth/users";

/// `GET ?user=<username>`: issue an authentication challenge.
pub const AUTHENTICATION_OPTIONS: &str = "/auth/generate-authentication-options";
/// `POST`: submit an authentication assertion.
pub const VERIFY_AUTHENTICATION: &str = "/auth/verify-authentication";
/// `GET ?user=<username>`: issue a registration challenge.
pub const REGISTRATION_OPTIONS: &str = "/auth/generate-registration-options";
/// `POST`: submit a registration attestation.
pub const VERIFY_REGISTRATION: &str = "/auth/verify-registration";

/// `PUT`: confirm an email verification token.
pub const MY_EMAIL: &str = "/auth/users/me/email";
/// `POST` requests a reset email, `PUT` sets the new password.
pub const PASSWORD_RESET: &str = "/auth/password_reset";

/// `DELETE`: terminate the session of `user_id`.
pub fn session_of(user_id: &UserId) -> String {
    format!("{}/{}", SESSIONS, user_id)
}

/// `POST`: send a verification email to `user_id`.
pub fn email_of(user_id: &UserId) -> String {
    format!("{}/{}/email", USERS, user_id)
}
