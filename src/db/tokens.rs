//! # Token Store Implementations
//!
//! Two [`TokenStore`]s live here:
//! - [`SqliteTokenStore`]: the production store, one row in `session_tokens`
//! - [`MemoryTokenStore`]: keeps the row in process memory, for tests and
//!   for embedders that do not want anything on disk
//!
//! ## Single Slot
//! The client serves one user at a time, so the table holds at most one row,
//! pinned to `slot = 1` by a CHECK constraint. Saving is an upsert on that
//! slot: the last installed session always wins.
//!
//! ## Query Functions
//! The SQL lives in free functions over a `&SqlitePool` so it can be reused
//! without the store wrapper (e.g. from a maintenance tool).

use crate::db::models::StoredTokens;
use crate::db::{StoreError, TokenStore};
use async_trait::async_trait;
use parking_lot::Mutex;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::debug;

// Token row operations

/// Write `tokens` into the slot, replacing whatever was there.
///
/// `INSERT ... ON CONFLICT DO UPDATE` keeps this a single statement, so a
/// crash can never leave the slot half-written.
pub async fn save_tokens(pool: &SqlitePool, tokens: &StoredTokens) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO session_tokens (slot, user_id, access_token, refresh_token, updated_at)
         VALUES (1, ?, ?, ?, ?)
         ON CONFLICT (slot) DO UPDATE SET
             user_id = excluded.user_id,
             access_token = excluded.access_token,
             refresh_token = excluded.refresh_token,
             updated_at = excluded.updated_at",
    )
    .bind(&tokens.user_id)
    .bind(&tokens.access_token)
    .bind(&tokens.refresh_token)
    .bind(&tokens.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Read the slot. `Ok(None)` if nothing is stored (first run, or after
/// logout).
pub async fn load_tokens(pool: &SqlitePool) -> Result<Option<StoredTokens>, StoreError> {
    let tokens = sqlx::query_as::<_, StoredTokens>(
        "SELECT user_id, access_token, refresh_token, updated_at
         FROM session_tokens
         WHERE slot = 1",
    )
    .fetch_optional(pool)
    .await?;

    Ok(tokens)
}

/// Empty the slot. Clearing an empty slot is not an error.
pub async fn clear_tokens(pool: &SqlitePool) -> Result<(), StoreError> {
    sqlx::query("DELETE FROM session_tokens").execute(pool).await?;

    Ok(())
}

/// SQLite-backed [`TokenStore`].
///
/// ## Why a pool for one row?
/// `SqlitePool` is what sqlx hands out, it is cheap to clone, and it lets
/// the store be shared between the context and any tooling without
/// coordinating a single connection by hand.
#[derive(Debug, Clone)]
pub struct SqliteTokenStore {
    /// Connection pool; migrations have already run on it
    pool: SqlitePool,
}

impl SqliteTokenStore {
    /// Connect to `database_url` (e.g. `sqlite:session.db?mode=rwc`) and run
    /// the embedded migrations.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = SqlitePool::connect(database_url).await?;
        Self::from_pool(pool).await
    }

    /// Open an in-memory database (for testing).
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new().filename(":memory:");

        // In-memory must be single connection to share state
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    /// Run the embedded migrations (`./migrations`, compiled into the binary)
    /// and wrap the pool.
    async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        debug!("Token store ready");
        Ok(Self { pool })
    }

    /// Underlying pool, for ad hoc queries in tests and tooling.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl TokenStore for SqliteTokenStore {
    async fn load(&self) -> Result<Option<StoredTokens>, StoreError> {
        load_tokens(&self.pool).await
    }

    async fn save(&self, tokens: &StoredTokens) -> Result<(), StoreError> {
        save_tokens(&self.pool, tokens).await
    }

    async fn clear(&self) -> Result<(), StoreError> {
        clear_tokens(&self.pool).await
    }
}

/// Process-local [`TokenStore`]; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    /// `None` when nothing is stored
    slot: Mutex<Option<StoredTokens>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with tokens already stored, as if left by a previous run.
    pub fn with_tokens(tokens: StoredTokens) -> Self {
        Self {
            slot: Mutex::new(Some(tokens)),
        }
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> Result<Option<StoredTokens>, StoreError> {
        Ok(self.slot.lock().clone())
    }

    async fn save(&self, tokens: &StoredTokens) -> Result<(), StoreError> {
        *self.slot.lock() = Some(tokens.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        *self.slot.lock() = None;
        Ok(())
    }
}
