//! Authenticators that supply the `Authorization` header for API requests.

use std::fmt;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::error::{CodeEngineError, Result};

/// Default IAM endpoint used to exchange API keys for access tokens.
pub const DEFAULT_IAM_URL: &str = "https://iam.cloud.ibm.com";

const IAM_GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";

/// Produces the `Authorization` header value for each request.
///
/// Implementations must be cheap to call repeatedly; token-based
/// authenticators are expected to cache.
#[async_trait]
pub trait Authenticator: Send + Sync + fmt::Debug {
    /// Returns the header value, or `None` to send the request unauthenticated.
    ///
    /// `http` is the client's own connection pool, available for token exchanges.
    async fn authorization(&self, http: &Client) -> Result<Option<String>>;
}

/// Sends a fixed bearer token.
#[derive(Clone)]
pub struct BearerTokenAuthenticator {
    token: String,
}

impl BearerTokenAuthenticator {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl fmt::Debug for BearerTokenAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerTokenAuthenticator").finish_non_exhaustive()
    }
}

#[async_trait]
impl Authenticator for BearerTokenAuthenticator {
    async fn authorization(&self, _http: &Client) -> Result<Option<String>> {
        Ok(Some(format!("Bearer {}", self.token)))
    }
}

/// Sends no credentials. Useful against local mock servers.
#[derive(Debug, Clone, Default)]
pub struct NoAuthAuthenticator;

#[async_trait]
impl Authenticator for NoAuthAuthenticator {
    async fn authorization(&self, _http: &Client) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Exchanges an API key for IAM access tokens and caches them.
///
/// A cached token is reused until 80% of its lifetime has elapsed, after
/// which the next request triggers a new exchange.
pub struct IamAuthenticator {
    apikey: String,
    url: String,
    cached: Mutex<Option<IamToken>>,
}

impl fmt::Debug for IamAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IamAuthenticator")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Deserialize)]
struct IamToken {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    /// Lifetime in seconds.
    expires_in: i64,
    /// Absolute expiry as a unix timestamp.
    expiration: i64,
}

impl IamToken {
    fn needs_refresh(&self, now: i64) -> bool {
        let refresh_at = self.expiration - self.expires_in / 5;
        now >= refresh_at
    }

    fn header_value(&self) -> String {
        let scheme = self.token_type.as_deref().unwrap_or("Bearer");
        format!("{} {}", scheme, self.access_token)
    }
}

impl IamAuthenticator {
    /// Create an authenticator against the default IAM endpoint.
    pub fn new(apikey: impl Into<String>) -> Self {
        Self::with_url(apikey, DEFAULT_IAM_URL)
    }

    /// Create an authenticator against a custom IAM endpoint.
    pub fn with_url(apikey: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            apikey: apikey.into(),
            url: url.into().trim_end_matches('/').to_string(),
            cached: Mutex::new(None),
        }
    }

    #[tracing::instrument(skip(self, http))]
    async fn request_token(&self, http: &Client) -> Result<IamToken> {
        let response = http
            .post(format!("{}/identity/token", self.url))
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[("grant_type", IAM_GRANT_TYPE), ("apikey", self.apikey.as_str())])
            .send()
            .await
            .map_err(CodeEngineError::HttpError)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| {
                    v.get("errorMessage")
                        .or_else(|| v.get("message"))
                        .and_then(|m| m.as_str())
                        .map(str::to_string)
                })
                .unwrap_or_else(|| format!("IAM token request failed with HTTP {status}"));
            return Err(CodeEngineError::Auth(message));
        }

        let token: IamToken = response.json().await.map_err(CodeEngineError::HttpError)?;
        tracing::debug!(expires_in = token.expires_in, "obtained IAM access token");
        Ok(token)
    }
}

#[async_trait]
impl Authenticator for IamAuthenticator {
    async fn authorization(&self, http: &Client) -> Result<Option<String>> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now().timestamp();

        if let Some(token) = cached.as_ref() {
            if !token.needs_refresh(now) {
                return Ok(Some(token.header_value()));
            }
        }

        let token = self.request_token(http).await?;
        let header = token.header_value();
        *cached = Some(token);
        Ok(Some(header))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_bearer_header() {
        let auth = BearerTokenAuthenticator::new("abc");
        let header = tokio_test::block_on(auth.authorization(&Client::new())).unwrap();
        assert_eq!(header.as_deref(), Some("Bearer abc"));
    }

    #[test]
    fn test_noauth_sends_nothing() {
        let client = Client::new();
        let header = tokio_test::block_on(NoAuthAuthenticator.authorization(&client)).unwrap();
        assert!(header.is_none());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let debug = format!("{:?}", IamAuthenticator::new("super-secret-key"));
        assert!(debug.contains("IamAuthenticator"));
        assert!(!debug.contains("super-secret-key"));

        let debug = format!("{:?}", BearerTokenAuthenticator::new("tok-123"));
        assert!(!debug.contains("tok-123"));
    }

    #[test]
    fn test_token_refresh_window() {
        let token = IamToken {
            access_token: "t".to_string(),
            token_type: None,
            expires_in: 3600,
            expiration: 10_000,
        };
        // Refresh once 80% of 3600s has elapsed: 10_000 - 720 = 9_280.
        assert!(!token.needs_refresh(9_279));
        assert!(token.needs_refresh(9_280));
        assert_eq!(token.header_value(), "Bearer t");
    }

    #[tokio::test]
    async fn test_iam_token_is_cached() {
        let mock_server = MockServer::start().await;
        let expiration = Utc::now().timestamp() + 3600;

        Mock::given(method("POST"))
            .and(path("/identity/token"))
            .and(body_string_contains("apikey=my-key"))
            .and(body_string_contains("grant_type=urn"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "iam-access",
                "refresh_token": "r",
                "token_type": "Bearer",
                "expires_in": 3600,
                "expiration": expiration
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let auth = IamAuthenticator::with_url("my-key", mock_server.uri());
        let http = Client::new();
        let first = auth.authorization(&http).await.unwrap();
        let second = auth.authorization(&http).await.unwrap();

        assert_eq!(first.as_deref(), Some("Bearer iam-access"));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_iam_failure_is_auth_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/identity/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "errorCode": "BXNIM0415E",
                "errorMessage": "Provided API key could not be found."
            })))
            .mount(&mock_server)
            .await;

        let auth = IamAuthenticator::with_url("bad-key", mock_server.uri());
        let err = auth.authorization(&Client::new()).await.unwrap_err();

        match err {
            CodeEngineError::Auth(msg) => assert!(msg.contains("could not be found")),
            other => panic!("expected auth error, got {other:?}"),
        }
    }
}
