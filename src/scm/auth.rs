//! Token lifecycle
//!
//! Exchanges client credentials for a bearer token, caches it, and refreshes it
//! shortly before it expires. Refresh is single-flight: the cache sits behind one
//! async mutex that stays held across the token-endpoint call, so concurrent
//! callers wait for the in-flight refresh and share its result.

use super::http::{HttpRequest, Method, Transport, TransportError};
use crate::error::ScmError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// OAuth2 token endpoint used when the credential does not name one
pub const DEFAULT_TOKEN_URL: &str =
    "https://auth.apps.paloaltonetworks.com/am/oauth2/access_token";

/// Token expiry buffer - refresh tokens this much before they actually expire
/// This prevents using tokens that are about to expire during a request
pub const DEFAULT_EXPIRY_BUFFER: Duration = Duration::from_secs(30);

/// Lifetime assumed when neither the token nor the response says (conservative: 15 minutes)
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(15 * 60);

/// Client credentials, fixed for the lifetime of a client
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub client_id: String,
    pub client_secret: String,
    /// Tenant service group id; becomes the `tsg_id:<id>` scope
    pub tsg_id: String,
    /// Pre-issued bearer token; bypasses refresh entirely
    pub access_token: Option<String>,
    pub token_url: Option<String>,
}

impl Credential {
    pub fn client_credentials(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        tsg_id: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            tsg_id: tsg_id.into(),
            access_token: None,
            token_url: None,
        }
    }

    pub fn static_token(token: impl Into<String>) -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            tsg_id: String::new(),
            access_token: Some(token.into()),
            token_url: None,
        }
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = Some(url.into());
        self
    }

    pub fn scope(&self) -> String {
        format!("tsg_id:{}", self.tsg_id)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("tsg_id", &self.tsg_id)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("token_url", &self.token_url)
            .finish()
    }
}

/// A bearer token and when it stops being usable
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    access_token: String,
    /// `None` for static tokens, which are never refreshed
    expires_at: Option<DateTime<Utc>>,
}

impl Token {
    pub fn new(access_token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at: Some(expires_at),
        }
    }

    fn static_token(access_token: &str) -> Self {
        Self {
            access_token: access_token.to_string(),
            expires_at: None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.access_token
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// True once the token is within `buffer` of expiring
    pub fn needs_refresh(&self, buffer: Duration) -> bool {
        let Some(expires_at) = self.expires_at else {
            return false;
        };
        let buffer = chrono::Duration::from_std(buffer).unwrap_or_else(|_| chrono::Duration::zero());
        Utc::now() + buffer >= expires_at
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Bounded exponential backoff for token acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Delay after the `attempt`-th failure (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Owns the credential and the single cached token
pub struct TokenManager {
    credential: Credential,
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
    expiry_buffer: Duration,
    timeout: Option<Duration>,
    cache: Mutex<Option<Token>>,
}

impl TokenManager {
    pub fn new(credential: Credential, transport: Arc<dyn Transport>) -> Self {
        Self {
            credential,
            transport,
            retry: RetryPolicy::default(),
            expiry_buffer: DEFAULT_EXPIRY_BUFFER,
            timeout: None,
            cache: Mutex::new(None),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_expiry_buffer(mut self, buffer: Duration) -> Self {
        self.expiry_buffer = buffer;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_static(&self) -> bool {
        self.credential.access_token.is_some()
    }

    pub fn token_url(&self) -> &str {
        self.credential.token_url.as_deref().unwrap_or(DEFAULT_TOKEN_URL)
    }

    /// Get a token that is valid for at least the expiry buffer
    pub async fn get_token(&self) -> Result<Token, ScmError> {
        if let Some(token) = &self.credential.access_token {
            return Ok(Token::static_token(token));
        }

        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref() {
            if !cached.needs_refresh(self.expiry_buffer) {
                return Ok(cached.clone());
            }
            tracing::debug!("Cached token near expiry, refreshing");
        }

        // A failed refresh leaves nothing cached; the next caller starts over
        *cache = None;
        let token = self.fetch_with_retry().await?;
        *cache = Some(token.clone());
        Ok(token)
    }

    /// Fetch a new token unconditionally and replace the cached one
    pub async fn refresh(&self) -> Result<Token, ScmError> {
        if let Some(token) = &self.credential.access_token {
            return Ok(Token::static_token(token));
        }

        let mut cache = self.cache.lock().await;
        *cache = None;
        let token = self.fetch_with_retry().await?;
        *cache = Some(token.clone());
        Ok(token)
    }

    /// Drop the cached token so the next `get_token` refreshes
    pub async fn invalidate(&self) {
        if self.is_static() {
            return;
        }
        let mut cache = self.cache.lock().await;
        if cache.take().is_some() {
            tracing::debug!("Cached token invalidated");
        }
    }

    /// Drop the cached token only if it is still `rejected`. A caller holding a
    /// token that another task already replaced leaves the newer one alone.
    pub async fn invalidate_if(&self, rejected: &Token) {
        if self.is_static() {
            return;
        }
        let mut cache = self.cache.lock().await;
        if cache.as_ref().is_some_and(|cached| cached.as_str() == rejected.as_str()) {
            cache.take();
            tracing::debug!("Rejected token invalidated");
        }
    }

    /// Expiry of the cached token, if one is cached
    pub async fn token_expires_at(&self) -> Option<DateTime<Utc>> {
        self.cache.lock().await.as_ref().and_then(Token::expires_at)
    }

    async fn fetch_with_retry(&self) -> Result<Token, ScmError> {
        let attempts = self.retry.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match self.request_token().await {
                Ok(token) => {
                    if let Some(expires_at) = token.expires_at {
                        tracing::info!("Token refreshed, expires at {}", expires_at);
                    }
                    return Ok(token);
                }
                Err(err) => {
                    tracing::warn!(
                        "Token request failed (attempt {}/{}): {}",
                        attempt,
                        attempts,
                        err
                    );
                    last_error = Some(err);
                    if attempt < attempts {
                        tokio::time::sleep(self.retry.backoff(attempt)).await;
                    }
                }
            }
        }

        Err(ScmError::Authentication {
            message: format!("token request failed after {} attempts", attempts),
            failure: None,
            source: last_error,
        })
    }

    async fn request_token(&self) -> Result<Token, TransportError> {
        let request = HttpRequest::new(Method::Post, self.token_url())
            .basic_auth(&self.credential.client_id, &self.credential.client_secret)
            .form(vec![
                ("grant_type".to_string(), "client_credentials".to_string()),
                ("scope".to_string(), self.credential.scope()),
            ])
            .timeout(self.timeout);

        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(TransportError::Status {
                status: response.status,
                body: super::http::sanitize_for_log(&response.body),
            });
        }

        let parsed: TokenResponse = serde_json::from_str(&response.body)
            .map_err(|e| TransportError::Decode(e.to_string()))?;

        let expires_at = jwt_expiry(&parsed.access_token).unwrap_or_else(|| {
            let lifetime = parsed
                .expires_in
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TOKEN_TTL);
            Utc::now()
                + chrono::Duration::from_std(lifetime).unwrap_or_else(|_| chrono::Duration::zero())
        });

        Ok(Token::new(parsed.access_token, expires_at))
    }
}

/// Read the `exp` claim from a JWT without verifying it
pub fn jwt_expiry(token: &str) -> Option<DateTime<Utc>> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: Value = serde_json::from_slice(&bytes).ok()?;
    let exp = claims.get("exp")?;
    let seconds = exp.as_i64().or_else(|| exp.as_f64().map(|f| f as i64))?;
    DateTime::from_timestamp(seconds, 0)
}

#[cfg(test)]
mod tests {
    use super::super::http::HttpResponse;
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn jwt_with_exp(exp: i64) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let claims = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"svc","exp":{}}}"#, exp));
        format!("{}.{}.signature", header, claims)
    }

    struct CountingTransport {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Transport for CountingTransport {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(HttpResponse {
                status: 200,
                body: r#"{"access_token":"opaque","expires_in":900}"#.to_string(),
            })
        }
    }

    #[test]
    fn test_jwt_expiry_reads_exp_claim() {
        let token = jwt_with_exp(1_900_000_000);
        let exp = jwt_expiry(&token).unwrap();
        assert_eq!(exp.timestamp(), 1_900_000_000);
    }

    #[test]
    fn test_jwt_expiry_rejects_opaque_tokens() {
        assert!(jwt_expiry("opaque").is_none());
        assert!(jwt_expiry("a.!!!.c").is_none());
        let no_exp = format!("h.{}.s", URL_SAFE_NO_PAD.encode(br#"{"sub":"x"}"#));
        assert!(jwt_expiry(&no_exp).is_none());
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(500));
        assert_eq!(policy.backoff(2), Duration::from_secs(1));
        assert_eq!(policy.backoff(3), Duration::from_secs(2));
        assert_eq!(policy.backoff(10), Duration::from_secs(8));
    }

    #[test]
    fn test_needs_refresh_inside_buffer() {
        let near = Token::new("t", Utc::now() + chrono::Duration::seconds(25));
        assert!(near.needs_refresh(Duration::from_secs(30)));
        let far = Token::new("t", Utc::now() + chrono::Duration::seconds(3600));
        assert!(!far.needs_refresh(Duration::from_secs(30)));
        assert!(!Token::static_token("t").needs_refresh(Duration::from_secs(30)));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let credential = Credential::client_credentials("id", "hunter2", "1234");
        assert!(!format!("{:?}", credential).contains("hunter2"));
        assert_eq!(credential.scope(), "tsg_id:1234");
    }

    #[tokio::test]
    async fn test_static_token_never_calls_transport() {
        let transport = Arc::new(CountingTransport {
            calls: AtomicUsize::new(0),
        });
        let manager = TokenManager::new(Credential::static_token("pre-issued"), transport.clone());

        let token = manager.get_token().await.unwrap();
        assert_eq!(token.as_str(), "pre-issued");
        assert!(token.expires_at().is_none());
        manager.invalidate().await;
        manager.refresh().await.unwrap();
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_expires_in_used_for_opaque_tokens() {
        let transport = Arc::new(CountingTransport {
            calls: AtomicUsize::new(0),
        });
        let manager = TokenManager::new(
            Credential::client_credentials("id", "secret", "1"),
            transport.clone(),
        );

        let token = manager.get_token().await.unwrap();
        let remaining = token.expires_at().unwrap() - Utc::now();
        assert!(remaining.num_seconds() > 800 && remaining.num_seconds() <= 900);

        // Cached: no second call
        manager.get_token().await.unwrap();
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);

        manager.invalidate().await;
        assert!(manager.token_expires_at().await.is_none());
        manager.get_token().await.unwrap();
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_if_keeps_replaced_token() {
        let transport = Arc::new(CountingTransport {
            calls: AtomicUsize::new(0),
        });
        let manager = TokenManager::new(
            Credential::client_credentials("id", "secret", "1"),
            transport.clone(),
        );

        let current = manager.get_token().await.unwrap();
        let stale = Token::new("stale", Utc::now() + chrono::Duration::seconds(900));

        manager.invalidate_if(&stale).await;
        assert!(manager.token_expires_at().await.is_some());
        manager.get_token().await.unwrap();
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);

        manager.invalidate_if(&current).await;
        assert!(manager.token_expires_at().await.is_none());
        manager.get_token().await.unwrap();
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    }
}
