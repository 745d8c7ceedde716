//! # Session Types
//!
//! The [`Session`] returned by the identity service and the request payloads
//! the session manager sends.
//!
//! ## Example session body
//! ```json
//! {
//!   "id": 1,
//!   "username": "alice",
//!   "email": "alice@example.com",
//!   "email_verified": false,
//!   "access_token": "...",
//!   "refresh_token": "...",
//!   "oauth_accounts": [{ "provider": "github", "subject": "42" }]
//! }
//! ```

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

/// Identifier of a user on the identity service.
///
/// The service sends ids as either numbers or strings; both are kept as text.
/// A `UserId` is never empty, and it is spliced into request paths such as
/// `/auth/sessions/{id}`, so it only holds characters that are valid in a
/// single URL path segment as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct UserId(String);

/// RFC 3986 `pchar` without percent-escapes: unreserved, sub-delims, `:`, `@`.
fn is_segment_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "-._~!$&'()*+,;=:@".contains(c)
}

impl UserId {
    /// `None` if `id` is blank or could escape its path segment
    /// (`/`, `?`, `#`, `%`, whitespace, non-ASCII).
    pub fn parse(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        if id.is_empty() || id == "." || id == ".." || !id.chars().all(is_segment_char) {
            None
        } else {
            Some(Self(id))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Number(serde_json::Number),
            Text(String),
        }

        let raw = match RawId::deserialize(deserializer)? {
            RawId::Number(n) => n.to_string(),
            RawId::Text(s) => s,
        };

        UserId::parse(raw)
            .ok_or_else(|| D::Error::custom("user id must be a non-empty URL path segment"))
    }
}

/// A federated identity linked to the user's account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderLink {
    pub provider: String,
    #[serde(default, alias = "provider_user_id")]
    pub subject: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Authenticated identity state for the current user.
///
/// Only the session manager installs or clears it. A `Session` always has a
/// non-empty `user_id`: a response without one fails to deserialize.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SessionBody")]
pub struct Session {
    #[serde(rename = "id")]
    pub user_id: UserId,
    pub username: Option<String>,
    pub email: Option<String>,
    pub email_verified: bool,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub provider_links: Vec<ProviderLink>,
}

/// Wire shape of a session response.
///
/// Login answers with `id`, while some verification responses carry
/// `user_id` as well (or instead). `id` wins when both are present.
#[derive(Deserialize)]
struct SessionBody {
    #[serde(default)]
    id: Option<UserId>,

    #[serde(default)]
    user_id: Option<UserId>,

    #[serde(default)]
    username: Option<String>,

    #[serde(default)]
    email: Option<String>,

    #[serde(default, deserialize_with = "false_if_null")]
    email_verified: bool,

    #[serde(default)]
    access_token: Option<String>,

    #[serde(default)]
    refresh_token: Option<String>,

    #[serde(default, alias = "oauth_accounts")]
    provider_links: Vec<ProviderLink>,
}

fn false_if_null<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

impl TryFrom<SessionBody> for Session {
    type Error = &'static str;

    fn try_from(body: SessionBody) -> Result<Self, Self::Error> {
        let user_id = body
            .id
            .or(body.user_id)
            .ok_or("session carries no user id")?;

        Ok(Session {
            user_id,
            username: body.username,
            email: body.email,
            email_verified: body.email_verified,
            access_token: body.access_token,
            refresh_token: body.refresh_token,
            provider_links: body.provider_links,
        })
    }
}

impl Session {
    /// Name to show for this user: username, then email, then the raw id.
    pub fn display_identity(&self) -> &str {
        self.username
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.email.as_deref().filter(|s| !s.is_empty()))
            .unwrap_or_else(|| self.user_id.as_str())
    }

    /// Whether an email address is on file.
    pub fn has_email(&self) -> bool {
        self.email.as_deref().is_some_and(|e| !e.trim().is_empty())
    }

    /// Token-free view of the session, safe to print.
    pub fn summary(&self) -> Value {
        json!({
            "id": self.user_id,
            "display": self.display_identity(),
            "email": self.email,
            "email_verified": self.email_verified,
            "providers": self
                .provider_links
                .iter()
                .map(|link| link.provider.as_str())
                .collect::<Vec<_>>(),
        })
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("email_verified", &self.email_verified)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("provider_links", &self.provider_links)
            .finish()
    }
}

/// Acknowledgement body of a request/response exchange.
pub type Ack = Value;

/// Password login payload for `POST /auth/sessions`.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub(crate) fn to_body(&self) -> Value {
        json!({ "username": self.username, "password": self.password })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Signup payload for `POST /auth/users`.
#[derive(Clone)]
pub struct SignupRequest {
    pub username: String,
    pub email: Option<String>,
    pub password: String,
}

impl SignupRequest {
    pub(crate) fn to_body(&self) -> Value {
        let mut body = json!({ "username": self.username, "password": self.password });
        if let Some(email) = &self.email {
            body["email"] = json!(email);
        }
        body
    }
}

impl fmt::Debug for SignupRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignupRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Result of a provider's own redirect/consent flow, exchanged at
/// `POST /auth/sessions/oauth`.
///
/// Everything besides `provider` is provider-specific (authorization code,
/// state, id token...) and forwarded untouched.
#[derive(Clone)]
pub struct FederatedLogin {
    pub provider: String,
    pub payload: Map<String, Value>,
}

impl FederatedLogin {
    pub(crate) fn to_body(&self) -> Value {
        let mut body = self.payload.clone();
        body.insert("provider".to_string(), json!(self.provider));
        Value::Object(body)
    }
}

impl fmt::Debug for FederatedLogin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FederatedLogin")
            .field("provider", &self.provider)
            .finish_non_exhaustive()
    }
}

/// Email confirmation payload for `PUT /auth/users/me/email`.
#[derive(Debug, Clone)]
pub struct EmailVerification {
    pub token: String,
}

/// Identifier of the account whose password was forgotten.
#[derive(Debug, Clone)]
pub struct PasswordResetRequest {
    pub email: String,
}

/// New password, authorised by the token from the reset email.
#[derive(Clone)]
pub struct PasswordReset {
    pub token: String,
    pub password: String,
}

impl fmt::Debug for PasswordReset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordReset").finish_non_exhaustive()
    }
}

/// Federated identity provider offered by the identity service.
///
/// The listing may contain bare names or objects; both shapes are accepted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OAuthProvider {
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl<'de> Deserialize<'de> for OAuthProvider {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct NamedProvider {
            name: String,
            #[serde(flatten)]
            extra: Map<String, Value>,
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawProvider {
            Name(String),
            Object(NamedProvider),
        }

        Ok(match RawProvider::deserialize(deserializer)? {
            RawProvider::Name(name) => OAuthProvider {
                name,
                extra: Map::new(),
            },
            RawProvider::Object(NamedProvider { name, extra }) => OAuthProvider { name, extra },
        })
    }
}
