//! Federated provider listing.
//!
//! A read-through cache on the context. Not user-scoped, so logout leaves it
//! alone.

use super::types::OAuthProvider;
use crate::error::{normalize_malformed_response, normalize_transport, AuthResult};
use crate::state::SessionContext;
use crate::transport::{endpoints, ApiRequest};
use serde_json::Value;
use tracing::debug;

/// Fetch the provider list and refresh the cache.
///
/// An empty or `null` body counts as no providers. On failure the cache
/// keeps its previous contents.
pub async fn list_providers(ctx: &SessionContext) -> AuthResult<Vec<OAuthProvider>> {
    let body = ctx
        .transport()
        .send(ApiRequest::get(endpoints::OAUTH_PROVIDERS))
        .await
        .map_err(normalize_transport)?;

    let providers: Vec<OAuthProvider> = match body {
        Value::Null => Vec::new(),
        body => serde_json::from_value(body)
            .map_err(|e| normalize_malformed_response("provider list", e))?,
    };

    debug!(count = providers.len(), "provider cache refreshed");
    ctx.replace_providers(providers.clone());
    Ok(providers)
}

/// Last fetched provider list, without network I/O.
pub fn cached_providers(ctx: &SessionContext) -> Vec<OAuthProvider> {
    ctx.cached_providers()
}
