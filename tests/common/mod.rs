//! Scripted collaborators shared by the integration tests.
//!
//! Each fake answers from a FIFO queue and records what it was asked, so a
//! test can both drive a flow and assert on the exact requests it produced.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use passkey_session::db::{MemoryTokenStore, StoreError, StoredTokens, TokenStore};
use passkey_session::teardown::Teardown;
use passkey_session::transport::{ApiRequest, Transport, TransportError};
use passkey_session::webauthn::types::Challenge;
use passkey_session::webauthn::{Authenticator, AuthenticatorError};
use passkey_session::SessionContext;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Transport that replays queued responses in order.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<Value, TransportError>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, body: Value) -> &Self {
        self.responses.lock().push_back(Ok(body));
        self
    }

    pub fn fail(&self, status: u16, body: Value) -> &Self {
        self.responses
            .lock()
            .push_back(Err(TransportError::Status { status, body }));
        self
    }

    pub fn unreachable(&self) -> &Self {
        self.responses
            .lock()
            .push_back(Err(TransportError::Request("connection refused".into())));
        self
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }

    pub fn request(&self, index: usize) -> ApiRequest {
        self.requests.lock()[index].clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value, TransportError> {
        self.requests.lock().push(request);
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Request("no scripted response".into())))
    }
}

/// Authenticator that replays queued credentials or rejections.
#[derive(Default)]
pub struct ScriptedAuthenticator {
    results: Mutex<VecDeque<Result<Value, AuthenticatorError>>>,
    challenges: Mutex<Vec<Challenge>>,
}

impl ScriptedAuthenticator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn produce(&self, credential: Value) -> &Self {
        self.results.lock().push_back(Ok(credential));
        self
    }

    pub fn reject(&self, error: AuthenticatorError) -> &Self {
        self.results.lock().push_back(Err(error));
        self
    }

    pub fn call_count(&self) -> usize {
        self.challenges.lock().len()
    }

    pub fn challenges(&self) -> Vec<Challenge> {
        self.challenges.lock().clone()
    }

    fn next(&self, challenge: &Challenge) -> Result<Value, AuthenticatorError> {
        self.challenges.lock().push(challenge.clone());
        self.results
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(AuthenticatorError::new("no scripted credential")))
    }
}

#[async_trait]
impl Authenticator for ScriptedAuthenticator {
    async fn create_credential(&self, challenge: &Challenge) -> Result<Value, AuthenticatorError> {
        self.next(challenge)
    }

    async fn get_assertion(&self, challenge: &Challenge) -> Result<Value, AuthenticatorError> {
        self.next(challenge)
    }
}

/// Memory store whose writes can be made to fail, like a full disk or a
/// locked database file. Reads keep working.
#[derive(Default)]
pub struct FlakyTokenStore {
    inner: MemoryTokenStore,
    fail_writes: AtomicBool,
}

impl FlakyTokenStore {
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(StoreError::Database(sqlx::Error::PoolClosed))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TokenStore for FlakyTokenStore {
    async fn load(&self) -> Result<Option<StoredTokens>, StoreError> {
        self.inner.load().await
    }

    async fn save(&self, tokens: &StoredTokens) -> Result<(), StoreError> {
        self.check()?;
        self.inner.save(tokens).await
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.check()?;
        self.inner.clear().await
    }
}

/// Everything a test needs to drive and inspect one context.
pub struct Harness {
    pub ctx: SessionContext,
    pub transport: Arc<ScriptedTransport>,
    pub authenticator: Arc<ScriptedAuthenticator>,
    pub tokens: Arc<FlakyTokenStore>,
}

pub fn harness() -> Harness {
    harness_with(Teardown::default())
}

pub fn harness_with(teardown: Teardown) -> Harness {
    let transport = ScriptedTransport::new();
    let authenticator = ScriptedAuthenticator::new();
    let tokens = Arc::new(FlakyTokenStore::default());

    let ctx = SessionContext::new(
        transport.clone(),
        authenticator.clone(),
        tokens.clone() as Arc<dyn TokenStore>,
        teardown,
    );

    Harness {
        ctx,
        transport,
        authenticator,
        tokens,
    }
}

pub fn session_body(id: i64, username: &str) -> Value {
    json!({
        "id": id,
        "username": username,
        "email": format!("{username}@example.com"),
        "email_verified": false,
        "access_token": format!("access-{username}"),
        "refresh_token": format!("refresh-{username}"),
    })
}
