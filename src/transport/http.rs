//! `reqwest`-backed [`Transport`].

use super::{ApiRequest, Method, Transport, TransportError};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// HTTP client for the identity service.
///
/// Holds one pooled `reqwest::Client`, so clone it rather than building a
/// new one per request.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// Build a transport rooted at `base_url` (e.g. `https://api.example.com`).
    ///
    /// ## Errors
    /// - `Request` if the base URL does not parse or the client cannot be built
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        Url::parse(base_url)
            .map_err(|e| TransportError::Request(format!("Invalid base URL: {}", e)))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value, TransportError> {
        debug!(method = %request.method, path = %request.path, "identity service request");

        let mut builder = self
            .client
            .request(request.method.into(), self.url_for(&request.path));

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        debug!(status = status.as_u16(), path = %request.path, "identity service response");

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            match serde_json::from_slice(&bytes) {
                Ok(value) => value,
                Err(e) if status.is_success() => return Err(TransportError::Decode(e.to_string())),
                // Error pages are often plain text; keep them as the detail.
                Err(_) => Value::String(String::from_utf8_lossy(&bytes).into_owned()),
            }
        };

        if status.is_success() {
            Ok(body)
        } else {
            Err(TransportError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}
