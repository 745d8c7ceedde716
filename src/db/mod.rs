//! # Token Persistence
//!
//! The session itself lives in memory, but the refresh token has to survive
//! a restart so `refresh()` can bring the session back. This module owns that
//! persistence:
//! - `models`: the stored row
//! - `tokens`: SQLite queries plus the two [`TokenStore`] implementations
//!
//! Stores are deliberately dumb: one slot, last write wins.

pub mod models;
pub mod tokens;

use async_trait::async_trait;
use thiserror::Error;

pub use models::StoredTokens;
pub use tokens::{MemoryTokenStore, SqliteTokenStore};

/// Errors raised by a [`TokenStore`].
///
/// The session manager logs these and carries on; they never reach callers
/// of the public operations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Where the tokens of the current session are kept between runs.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn load(&self) -> Result<Option<StoredTokens>, StoreError>;
    async fn save(&self, tokens: &StoredTokens) -> Result<(), StoreError>;
    async fn clear(&self) -> Result<(), StoreError>;
}
