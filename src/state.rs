//! # Session Context
//!
//! This module defines the context object every operation receives. It
//! replaces process-wide mutable state: the current session, the provider
//! cache and the teardown registry all live here, next to the collaborators
//! the operations talk to.
//!
//! ## Ownership rules
//! - Only the session manager (and, through it, a successful authentication
//!   ceremony) installs or clears the current session. The mutating methods
//!   are crate-private for that reason.
//! - The teardown registry is frozen before the context is built.
//!
//! ## Why Clone?
//! The context is handed to every operation. Cloning it only clones `Arc`s,
//! so all clones observe the same session.

use crate::config::Config;
use crate::db::{SqliteTokenStore, StoredTokens, TokenStore};
use crate::session::{OAuthProvider, Session};
use crate::teardown::Teardown;
use crate::transport::{HttpTransport, Transport};
use crate::webauthn::authenticator::Authenticator;
use anyhow::Result;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Shared session context.
#[derive(Clone)]
pub struct SessionContext {
    /// Performs HTTP requests against the identity service
    transport: Arc<dyn Transport>,

    /// Platform authenticator used by the passkey ceremonies
    authenticator: Arc<dyn Authenticator>,

    /// Keeps the refresh token across restarts
    tokens: Arc<dyn TokenStore>,

    /// `None` until the first successful login
    current: Arc<RwLock<Option<Session>>>,

    /// Read-through cache of federated providers (not user-scoped)
    providers: Arc<RwLock<Vec<OAuthProvider>>>,

    /// Resets fired on logout
    teardown: Teardown,

    /// `false` after a failed save or clear, until the next write succeeds
    store_in_sync: Arc<AtomicBool>,
}

impl SessionContext {
    pub fn new(
        transport: Arc<dyn Transport>,
        authenticator: Arc<dyn Authenticator>,
        tokens: Arc<dyn TokenStore>,
        teardown: Teardown,
    ) -> Self {
        Self {
            transport,
            authenticator,
            tokens,
            current: Arc::new(RwLock::new(None)),
            providers: Arc::new(RwLock::new(Vec::new())),
            teardown,
            store_in_sync: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Build the production context: HTTP transport plus SQLite token store.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The base URL is invalid or the HTTP client cannot be built
    /// - The token database cannot be opened or migrated
    pub async fn from_config(
        config: &Config,
        authenticator: Arc<dyn Authenticator>,
        teardown: Teardown,
    ) -> Result<Self> {
        let transport = HttpTransport::new(&config.base_api_url, config.request_timeout)?;
        let tokens = SqliteTokenStore::connect(&config.database_url).await?;

        Ok(Self::new(
            Arc::new(transport),
            authenticator,
            Arc::new(tokens),
            teardown,
        ))
    }

    pub fn current_session(&self) -> Option<Session> {
        self.current.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.read().is_some()
    }

    pub fn access_token(&self) -> Option<String> {
        self.current
            .read()
            .as_ref()
            .and_then(|session| session.access_token.clone())
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn teardown(&self) -> &Teardown {
        &self.teardown
    }

    pub fn cached_providers(&self) -> Vec<OAuthProvider> {
        self.providers.read().clone()
    }

    pub(crate) fn replace_providers(&self, providers: Vec<OAuthProvider>) {
        *self.providers.write() = providers;
    }

    /// Make `session` the current session and persist its tokens.
    pub(crate) async fn install(&self, session: Session) {
        let tokens = StoredTokens::from_session(&session);
        info!(user_id = %session.user_id, "session installed");
        *self.current.write() = Some(session);

        let saved = self.tokens.save(&tokens).await;
        if let Err(e) = &saved {
            warn!("Failed to persist session tokens: {}", e);
        }
        self.store_in_sync.store(saved.is_ok(), Ordering::SeqCst);
    }

    /// Drop the current session and forget its tokens.
    pub(crate) async fn clear(&self) {
        let previous = self.current.write().take();
        if let Some(session) = previous {
            debug!(user_id = %session.user_id, "session cleared");
        }

        let cleared = self.tokens.clear().await;
        if let Err(e) = &cleared {
            warn!("Failed to clear stored session tokens: {}", e);
        }
        self.store_in_sync.store(cleared.is_ok(), Ordering::SeqCst);
    }

    /// Refresh token to renew with.
    ///
    /// The in-memory session is authoritative: while there is one, its
    /// token is used even if it has none, and the store is not consulted.
    /// The store only answers when there is no session, as after a restart.
    /// A store whose last write failed may still hold a previous user's
    /// token, so it never overrides the live session and is skipped
    /// entirely until a later write succeeds.
    pub(crate) async fn stored_refresh_token(&self) -> Option<String> {
        let live = self
            .current
            .read()
            .as_ref()
            .map(|session| session.refresh_token.clone());
        if let Some(token) = live {
            return token;
        }

        if !self.store_in_sync.load(Ordering::SeqCst) {
            warn!("Token store missed a write, not trusting its refresh token");
            return None;
        }

        match self.tokens.load().await {
            Ok(tokens) => tokens.and_then(|t| t.refresh_token),
            Err(e) => {
                warn!("Failed to read stored session tokens: {}", e);
                None
            }
        }
    }
}
