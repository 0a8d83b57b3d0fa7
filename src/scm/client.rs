//! SCM Client
//!
//! Main client for interacting with the configuration API, combining the token
//! manager and the transport. Cloning is cheap and clones share one token cache.

use super::auth::{Credential, RetryPolicy, TokenManager, DEFAULT_EXPIRY_BUFFER};
use super::http::{HttpRequest, HttpResponse, Method, ReqwestTransport, Transport};
use crate::error::ScmError;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// API host used when none is configured
pub const DEFAULT_BASE_URL: &str = "https://api.strata.paloaltonetworks.com";

/// Main SCM client
#[derive(Clone)]
pub struct ScmClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    base_url: String,
    tokens: TokenManager,
    transport: Arc<dyn Transport>,
    timeout: Option<Duration>,
}

impl ScmClient {
    pub fn builder() -> ScmClientBuilder {
        ScmClientBuilder::default()
    }

    /// Create a client for the default API host
    pub fn new(credential: Credential) -> Result<Self, ScmError> {
        Self::builder().credential(credential).build()
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.inner.tokens
    }

    /// Build an absolute URL for an API path
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.inner.base_url, path)
        } else {
            format!("{}/{}", self.inner.base_url, path)
        }
    }

    /// Make a GET request to an API path
    pub async fn get(&self, path: &str, query: &[(String, String)]) -> Result<Value, ScmError> {
        let request = HttpRequest::new(Method::Get, self.url(path)).query(query);
        self.execute(request).await
    }

    /// Make a POST request to an API path
    pub async fn post(&self, path: &str, body: Value) -> Result<Value, ScmError> {
        let request = HttpRequest::new(Method::Post, self.url(path)).json(body);
        self.execute(request).await
    }

    /// Make a PUT request to an API path
    pub async fn put(&self, path: &str, body: Value) -> Result<Value, ScmError> {
        let request = HttpRequest::new(Method::Put, self.url(path)).json(body);
        self.execute(request).await
    }

    /// Make a DELETE request to an API path
    pub async fn delete(&self, path: &str) -> Result<Value, ScmError> {
        let request = HttpRequest::new(Method::Delete, self.url(path));
        self.execute(request).await
    }

    async fn execute(&self, request: HttpRequest) -> Result<Value, ScmError> {
        let method = request.method;
        let url = request.url.clone();

        let response = self.send_authenticated(request).await?;
        if response.is_success() {
            return Ok(response.json()?);
        }

        let error = ScmError::from_response(response.status, &response.body);
        tracing::debug!("{} {} failed: {}", method, url, error);
        Err(error)
    }

    /// Send with a bearer token. A 401 despite a cached token (clock skew,
    /// server-side revocation) invalidates that token and retries exactly once.
    /// Concurrent 401s on the same token share one refresh.
    async fn send_authenticated(&self, request: HttpRequest) -> Result<HttpResponse, ScmError> {
        let inner = &self.inner;
        let request = request.timeout(inner.timeout);

        let token = inner.tokens.get_token().await?;
        let response = inner
            .transport
            .send(request.clone().bearer(token.as_str()))
            .await?;

        if response.status != 401 || inner.tokens.is_static() {
            return Ok(response);
        }

        tracing::warn!("{} {} rejected with 401, retrying with a fresh token", request.method, request.url);
        inner.tokens.invalidate_if(&token).await;
        let token = inner.tokens.get_token().await?;
        Ok(inner.transport.send(request.bearer(token.as_str())).await?)
    }
}

/// Builder for [`ScmClient`]
pub struct ScmClientBuilder {
    credential: Option<Credential>,
    base_url: String,
    token_url: Option<String>,
    timeout: Option<Duration>,
    retry: RetryPolicy,
    expiry_buffer: Duration,
    transport: Option<Arc<dyn Transport>>,
}

impl Default for ScmClientBuilder {
    fn default() -> Self {
        Self {
            credential: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            token_url: None,
            timeout: None,
            retry: RetryPolicy::default(),
            expiry_buffer: DEFAULT_EXPIRY_BUFFER,
            transport: None,
        }
    }
}

impl ScmClientBuilder {
    pub fn credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Use a pre-issued bearer token instead of client credentials
    pub fn static_token(mut self, token: impl Into<String>) -> Self {
        self.credential = Some(Credential::static_token(token));
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = Some(url.into());
        self
    }

    /// Per-call timeout handed to the transport
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn expiry_buffer(mut self, buffer: Duration) -> Self {
        self.expiry_buffer = buffer;
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<ScmClient, ScmError> {
        let Some(mut credential) = self.credential else {
            return Err(ScmError::Authentication {
                message: "no client credentials or access token configured".to_string(),
                failure: None,
                source: None,
            });
        };
        if let Some(url) = self.token_url {
            credential = credential.with_token_url(url);
        }

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new()?),
        };

        let tokens = TokenManager::new(credential, transport.clone())
            .with_retry_policy(self.retry)
            .with_expiry_buffer(self.expiry_buffer)
            .with_timeout(self.timeout);

        Ok(ScmClient {
            inner: Arc::new(ClientInner {
                base_url: self.base_url,
                tokens,
                transport,
                timeout: self.timeout,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_paths() {
        let client = ScmClient::builder()
            .static_token("t")
            .base_url("https://api.example.test/")
            .build()
            .unwrap();
        assert_eq!(
            client.url("/config/objects/v1/addresses"),
            "https://api.example.test/config/objects/v1/addresses"
        );
        assert_eq!(client.url("x"), "https://api.example.test/x");
    }

    #[test]
    fn test_build_without_credentials_fails() {
        let err = ScmClient::builder().build().err().unwrap();
        assert_eq!(err.kind(), crate::error::ErrorKind::Authentication);
    }

    #[test]
    fn test_default_base_url() {
        let client = ScmClient::new(Credential::static_token("t")).unwrap();
        assert_eq!(client.base_url(), DEFAULT_BASE_URL);
        assert!(client.tokens().is_static());
    }
}
