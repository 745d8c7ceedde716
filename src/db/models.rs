//! # Stored Token Model
//!
//! Maps the single row of the `session_tokens` table.

use crate::session::Session;
use chrono::Utc;
use std::fmt;

/// Tokens of the last installed session.
///
/// ## Why Strings for dates?
/// SQLite stores timestamps as text, so `updated_at` is kept as an RFC3339
/// string like the rest of the row.
#[derive(Clone, PartialEq, sqlx::FromRow)]
pub struct StoredTokens {
    /// Id of the user the tokens belong to
    pub user_id: String,

    /// Bearer token for authenticated requests (may be absent)
    pub access_token: Option<String>,

    /// Token accepted by `PUT /auth/session` (may be absent)
    pub refresh_token: Option<String>,

    /// When the row was last written (RFC3339 timestamp)
    pub updated_at: String,
}

impl StoredTokens {
    /// Snapshot the tokens of `session`, stamped with the current time.
    pub fn from_session(session: &Session) -> Self {
        Self {
            user_id: session.user_id.to_string(),
            access_token: session.access_token.clone(),
            refresh_token: session.refresh_token.clone(),
            updated_at: Utc::now().to_rfc3339(),
        }
    }
}

impl fmt::Debug for StoredTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredTokens")
            .field("user_id", &self.user_id)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("updated_at", &self.updated_at)
            .finish()
    }
}
