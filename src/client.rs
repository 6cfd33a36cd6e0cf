//! Code Engine API client.
//!
//! Low-level HTTP client that handles authentication, retries and raw requests.
//! Higher-level operations are implemented via traits on entity types.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE, IF_MATCH};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Serialize;
use url::Url;

use crate::auth::{
    Authenticator, BearerTokenAuthenticator, IamAuthenticator, NoAuthAuthenticator,
    DEFAULT_IAM_URL,
};
use crate::error::{CodeEngineError, Result};
use crate::retry::{RetryPolicy, DEFAULT_MAX_RETRY_INTERVAL};

/// Service URL used when neither a URL nor a region is configured.
pub const DEFAULT_SERVICE_URL: &str = "https://api.au-syd.codeengine.cloud.ibm.com/v2";

/// Regions with a public Code Engine endpoint.
pub const REGIONS: &[&str] = &[
    "au-syd", "br-sao", "ca-tor", "eu-de", "eu-es", "eu-gb", "jp-osa", "jp-tok", "us-east",
    "us-south",
];

const USER_AGENT: &str = concat!("codeengine/", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);
const MERGE_PATCH_JSON: &str = "application/merge-patch+json";

/// Service URL for a region, or `None` if the region is unknown.
///
/// ```
/// assert_eq!(
///     codeengine::service_url_for_region("us-south").as_deref(),
///     Some("https://api.us-south.codeengine.cloud.ibm.com/v2"),
/// );
/// assert!(codeengine::service_url_for_region("mars-1").is_none());
/// ```
pub fn service_url_for_region(region: &str) -> Option<String> {
    REGIONS
        .contains(&region)
        .then(|| format!("https://api.{region}.codeengine.cloud.ibm.com/v2"))
}

/// Build a relative request path from raw segments, percent-encoding each one.
pub(crate) fn resource_path(segments: &[&str]) -> String {
    segments
        .iter()
        .map(|s| urlencoding::encode(s).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Low-level Code Engine API client.
///
/// Handles authentication and HTTP requests. Entity-specific operations
/// are implemented via the `Get`, `List`, `Create`, `Update` and `Delete`
/// traits on model types.
///
/// This struct is cheaply cloneable; clones reference the same underlying
/// connection pool and share the authenticator's cached token.
///
/// # Example
///
/// ```no_run
/// use codeengine::CodeEngineClient;
///
/// # async fn example() -> codeengine::Result<()> {
/// // Create from environment variables
/// let client = CodeEngineClient::from_env()?;
///
/// // Or configure manually with a bearer token
/// let client = CodeEngineClient::new(
///     "your-token",
///     "https://api.us-south.codeengine.cloud.ibm.com/v2",
/// )?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct CodeEngineClient {
    http: Client,
    base_url: Arc<Url>,
    auth: Arc<dyn Authenticator>,
    version: Option<Arc<str>>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for CodeEngineClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeEngineClient")
            .field("base_url", &self.base_url.as_str())
            .field("version", &self.version)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

/// Builder for [`CodeEngineClient`].
#[derive(Debug)]
pub struct ClientBuilder {
    service_url: String,
    auth: Option<Arc<dyn Authenticator>>,
    version: Option<String>,
    timeout: Duration,
    retry: RetryPolicy,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.to_string(),
            auth: None,
            version: None,
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::disabled(),
        }
    }
}

impl ClientBuilder {
    /// Set the service URL (e.g. `https://api.eu-de.codeengine.cloud.ibm.com/v2`).
    pub fn service_url(mut self, url: impl Into<String>) -> Self {
        self.service_url = url.into();
        self
    }

    /// Set the authenticator.
    pub fn authenticator(mut self, auth: impl Authenticator + 'static) -> Self {
        self.auth = Some(Arc::new(auth));
        self
    }

    /// Send this API `version` date with every request.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Overall timeout for each HTTP attempt.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Retry policy for transient failures.
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns an error if no authenticator was set or the service URL is invalid.
    pub fn build(self) -> Result<CodeEngineClient> {
        let auth = self.auth.ok_or_else(|| {
            CodeEngineError::ConfigMissing("an authenticator must be configured".to_string())
        })?;

        // Ensure base URL ends with /
        let base_url_str = if self.service_url.ends_with('/') {
            self.service_url
        } else {
            format!("{}/", self.service_url)
        };
        let base_url = Url::parse(&base_url_str)?;

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .brotli(true)
            .gzip(true)
            .deflate(true)
            .timeout(self.timeout)
            .build()
            .map_err(CodeEngineError::HttpError)?;

        Ok(CodeEngineClient {
            http,
            base_url: Arc::new(base_url),
            auth,
            version: self.version.map(Arc::from),
            retry: self.retry,
        })
    }
}

impl CodeEngineClient {
    /// Create a client from environment variables.
    ///
    /// | Variable | Meaning |
    /// |----------|---------|
    /// | `CODE_ENGINE_URL` | Service URL |
    /// | `CODE_ENGINE_REGION` | Region used to derive the URL when `CODE_ENGINE_URL` is unset |
    /// | `CODE_ENGINE_AUTH_TYPE` | `iam`, `bearertoken` or `noauth` |
    /// | `CODE_ENGINE_APIKEY` | API key for `iam` |
    /// | `CODE_ENGINE_AUTH_URL` | IAM endpoint (defaults to `https://iam.cloud.ibm.com`) |
    /// | `CODE_ENGINE_BEARER_TOKEN` | Token for `bearertoken` |
    /// | `CODE_ENGINE_VERSION` | API version date sent with every request |
    /// | `CODE_ENGINE_MAX_RETRIES` | Enables retries when greater than zero |
    ///
    /// Without `CODE_ENGINE_AUTH_TYPE`, `iam` is used when an API key is set
    /// and `bearertoken` when only a token is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials for the selected auth type are missing.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut builder = Self::builder();

        if let Some(url) = lookup("CODE_ENGINE_URL") {
            builder = builder.service_url(url);
        } else if let Some(region) = lookup("CODE_ENGINE_REGION") {
            let url = service_url_for_region(&region).ok_or_else(|| {
                CodeEngineError::ConfigMissing(format!("unknown CODE_ENGINE_REGION '{region}'"))
            })?;
            builder = builder.service_url(url);
        }

        let apikey = lookup("CODE_ENGINE_APIKEY");
        let bearer = lookup("CODE_ENGINE_BEARER_TOKEN");
        let auth_type = lookup("CODE_ENGINE_AUTH_TYPE")
            .map(|t| t.to_ascii_lowercase())
            .unwrap_or_else(|| {
                if apikey.is_none() && bearer.is_some() {
                    "bearertoken".to_string()
                } else {
                    "iam".to_string()
                }
            });

        builder = match auth_type.as_str() {
            "iam" => {
                let apikey = apikey.ok_or_else(|| {
                    CodeEngineError::ConfigMissing(
                        "CODE_ENGINE_APIKEY environment variable not set".to_string(),
                    )
                })?;
                let auth_url =
                    lookup("CODE_ENGINE_AUTH_URL").unwrap_or_else(|| DEFAULT_IAM_URL.to_string());
                builder.authenticator(IamAuthenticator::with_url(apikey, auth_url))
            }
            "bearertoken" => {
                let token = bearer.ok_or_else(|| {
                    CodeEngineError::ConfigMissing(
                        "CODE_ENGINE_BEARER_TOKEN environment variable not set".to_string(),
                    )
                })?;
                builder.authenticator(BearerTokenAuthenticator::new(token))
            }
            "noauth" => builder.authenticator(NoAuthAuthenticator),
            other => {
                return Err(CodeEngineError::ConfigMissing(format!(
                    "unsupported CODE_ENGINE_AUTH_TYPE '{other}'"
                )))
            }
        };

        if let Some(version) = lookup("CODE_ENGINE_VERSION") {
            builder = builder.version(version);
        }

        if let Some(retries) = lookup("CODE_ENGINE_MAX_RETRIES") {
            let max_retries: u32 = retries.parse().map_err(|_| {
                CodeEngineError::ConfigMissing(format!(
                    "CODE_ENGINE_MAX_RETRIES must be a number, got '{retries}'"
                ))
            })?;
            builder = builder.retry(RetryPolicy::new(max_retries, DEFAULT_MAX_RETRY_INTERVAL));
        }

        builder.build()
    }

    /// Create a new client with a bearer token and base URL.
    ///
    /// # Arguments
    ///
    /// * `token` - Bearer token sent with every request
    /// * `base_url` - Service URL (e.g., `https://api.us-south.codeengine.cloud.ibm.com/v2`)
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid.
    pub fn new(token: &str, base_url: &str) -> Result<Self> {
        Self::builder()
            .service_url(base_url)
            .authenticator(BearerTokenAuthenticator::new(token))
            .build()
    }

    /// Start configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// API version date sent with every request, if configured.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Active retry policy.
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Make a GET request.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, path: &str) -> Result<Response> {
        let request = self.request(Method::GET, path)?;
        self.execute(request).await
    }

    /// Make a GET request with query parameters.
    #[tracing::instrument(skip(self, query))]
    pub async fn get_with_query<Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<Response> {
        let request = self.request(Method::GET, path)?.query(query);
        self.execute(request).await
    }

    /// Make a POST request with JSON body.
    #[tracing::instrument(skip(self, body))]
    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Response> {
        let request = self.request(Method::POST, path)?.json(body);
        self.execute(request).await
    }

    /// Make a PATCH request with a JSON merge-patch body guarded by `If-Match`.
    #[tracing::instrument(skip(self, body))]
    pub async fn patch<B: Serialize + ?Sized>(
        &self,
        path: &str,
        if_match: &str,
        body: &B,
    ) -> Result<Response> {
        let request = self
            .request(Method::PATCH, path)?
            .header(IF_MATCH, if_match)
            .header(CONTENT_TYPE, MERGE_PATCH_JSON)
            .json(body);
        self.execute(request).await
    }

    /// Make a PUT request with JSON body guarded by `If-Match`.
    #[tracing::instrument(skip(self, body))]
    pub async fn put<B: Serialize + ?Sized>(
        &self,
        path: &str,
        if_match: &str,
        body: &B,
    ) -> Result<Response> {
        let request = self
            .request(Method::PUT, path)?
            .header(IF_MATCH, if_match)
            .json(body);
        self.execute(request).await
    }

    /// Make a DELETE request.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, path: &str) -> Result<Response> {
        let request = self.request(Method::DELETE, path)?;
        self.execute(request).await
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self.base_url.join(path)?;
        Ok(self
            .http
            .request(method, url)
            .header(reqwest::header::ACCEPT, "application/json"))
    }

    /// Authenticate, send, and retry according to the policy.
    async fn execute(&self, mut builder: RequestBuilder) -> Result<Response> {
        if let Some(value) = self.auth.authorization(&self.http).await? {
            let value = HeaderValue::from_str(&value).map_err(|_| {
                CodeEngineError::Auth("authorization header contains invalid characters".into())
            })?;
            builder = builder.header(AUTHORIZATION, value);
        }
        if let Some(version) = &self.version {
            builder = builder.query(&[("version", version.as_ref())]);
        }

        let request = builder.build().map_err(CodeEngineError::HttpError)?;
        let mut attempt = 0;

        loop {
            let next = request.try_clone().ok_or_else(|| {
                CodeEngineError::InvalidArgument("request body cannot be replayed".to_string())
            })?;
            let can_retry = attempt < self.retry.max_retries;

            match self.http.execute(next).await {
                Ok(response)
                    if can_retry && RetryPolicy::is_retryable_status(response.status()) =>
                {
                    attempt += 1;
                    let delay = self.retry.backoff(attempt, Self::retry_after(&response));
                    tracing::warn!(
                        status = response.status().as_u16(),
                        attempt,
                        ?delay,
                        "retrying request"
                    );
                    tokio::time::sleep(delay).await;
                }
                Ok(response) => return Self::check_response(response).await,
                Err(e) if can_retry && RetryPolicy::is_retryable_error(&e) => {
                    attempt += 1;
                    let delay = self.retry.backoff(attempt, None);
                    tracing::warn!(error = %e, attempt, ?delay, "retrying request");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(CodeEngineError::HttpError(e)),
            }
        }
    }

    fn retry_after(response: &Response) -> Option<u64> {
        response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
    }

    /// Check response status and convert errors.
    async fn check_response(response: Response) -> Result<Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        // Handle rate limiting
        if status.as_u16() == 429 {
            return Err(CodeEngineError::RateLimited {
                retry_after_secs: Self::retry_after(&response),
            });
        }

        let header_trace = response
            .headers()
            .get("x-correlation-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let (message, trace) = Self::extract_error(response, status).await;

        Err(CodeEngineError::ApiError {
            message,
            status_code: Some(status.as_u16()),
            trace: trace.or(header_trace),
        })
    }

    /// Extract error message and trace from a failed response.
    async fn extract_error(
        response: Response,
        status: reqwest::StatusCode,
    ) -> (String, Option<String>) {
        let body = match response.text().await {
            Ok(b) => b,
            Err(_) => return (format!("HTTP {status}"), None),
        };

        let Ok(json) = serde_json::from_str::<serde_json::Value>(&body) else {
            let message = if body.trim().is_empty() {
                format!("HTTP {status}")
            } else {
                body
            };
            return (message, None);
        };

        let trace = json
            .get("trace")
            .and_then(|t| t.as_str())
            .map(str::to_string);

        let message = json
            .get("errors")
            .and_then(|e| e.get(0))
            .and_then(|e| e.get("message"))
            .or_else(|| json.get("message"))
            .or_else(|| json.get("error"))
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or(body);

        (message, trace)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_client_debug() {
        let client =
            CodeEngineClient::new("test-token", "https://api.us-south.codeengine.cloud.ibm.com/v2")
                .unwrap();
        let debug = format!("{:?}", client);
        assert!(debug.contains("CodeEngineClient"));
        assert!(debug.contains("base_url"));
        // Token should not be in debug output
        assert!(!debug.contains("test-token"));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client1 = CodeEngineClient::new("token", "https://example.com/v2").unwrap();
        let client2 = CodeEngineClient::new("token", "https://example.com/v2/").unwrap();
        assert_eq!(client1.base_url().as_str(), client2.base_url().as_str());
        assert_eq!(
            client1.base_url().join("projects").unwrap().as_str(),
            "https://example.com/v2/projects"
        );
    }

    #[test]
    fn test_builder_requires_authenticator() {
        let err = CodeEngineClient::builder().build().unwrap_err();
        assert!(matches!(err, CodeEngineError::ConfigMissing(_)));
    }

    #[test]
    fn test_resource_path_encodes_segments() {
        assert_eq!(
            resource_path(&["projects", "abc", "config_maps", "my cm/x"]),
            "projects/abc/config_maps/my%20cm%2Fx"
        );
    }

    #[test]
    fn test_from_lookup_defaults_to_au_syd_with_iam() {
        let client = CodeEngineClient::from_lookup(lookup_from(&[("CODE_ENGINE_APIKEY", "k")]))
            .unwrap();
        assert_eq!(client.base_url().as_str(), format!("{DEFAULT_SERVICE_URL}/"));
        assert!(format!("{:?}", client.auth).contains("IamAuthenticator"));
        assert!(!client.retry_policy().is_enabled());
    }

    #[test]
    fn test_from_lookup_region_and_bearer() {
        let client = CodeEngineClient::from_lookup(lookup_from(&[
            ("CODE_ENGINE_REGION", "eu-de"),
            ("CODE_ENGINE_BEARER_TOKEN", "tok"),
            ("CODE_ENGINE_VERSION", "2024-11-18"),
            ("CODE_ENGINE_MAX_RETRIES", "3"),
        ]))
        .unwrap();
        assert_eq!(
            client.base_url().as_str(),
            "https://api.eu-de.codeengine.cloud.ibm.com/v2/"
        );
        assert!(format!("{:?}", client.auth).contains("BearerTokenAuthenticator"));
        assert_eq!(client.version(), Some("2024-11-18"));
        assert_eq!(client.retry_policy().max_retries, 3);
    }

    #[test]
    fn test_from_lookup_missing_credentials() {
        let err = CodeEngineClient::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(err.to_string().contains("CODE_ENGINE_APIKEY"));

        let err = CodeEngineClient::from_lookup(lookup_from(&[(
            "CODE_ENGINE_AUTH_TYPE",
            "bearertoken",
        )]))
        .unwrap_err();
        assert!(err.to_string().contains("CODE_ENGINE_BEARER_TOKEN"));

        let err = CodeEngineClient::from_lookup(lookup_from(&[("CODE_ENGINE_AUTH_TYPE", "cr")]))
            .unwrap_err();
        assert!(err.to_string().contains("unsupported"));
    }

    #[test]
    fn test_from_lookup_unknown_region() {
        let err = CodeEngineClient::from_lookup(lookup_from(&[
            ("CODE_ENGINE_REGION", "mars-1"),
            ("CODE_ENGINE_AUTH_TYPE", "noauth"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("mars-1"));
    }
}
