//! HTTP client utilities and retry logic.
//!
//! This module provides HTTP client configuration, retry policies and the
//! reqwest-backed [`Transport`] implementation used to talk to VergeOS.

use crate::config::VergeClientConfig;
use crate::transport::{ApiRequest, Transport};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};
use url::Url;

const USER_AGENT: &str = concat!("verge-core/", env!("CARGO_PKG_VERSION"));

/// Default timeout for VergeOS API requests, in seconds
pub const DEFAULT_REQUEST_TIMEOUT: u64 = 30;

/// Default connect timeout, in seconds
pub const DEFAULT_CONNECT_TIMEOUT: u64 = 10;

// Connection pool settings

/// Default idle timeout for connection pools
pub const DEFAULT_POOL_IDLE_TIMEOUT: u64 = 90;

/// Default maximum idle connections per host
pub const DEFAULT_POOL_MAX_IDLE_PER_HOST: usize = 10;

// Retry settings

/// Default maximum number of retry attempts
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default initial retry delay in milliseconds
pub const DEFAULT_RETRY_DELAY_MS: u64 = 500;

/// Default maximum retry delay in milliseconds (for exponential backoff)
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 5000;

/// Retry policy with exponential backoff.
///
/// Applies to idempotent requests only; a `POST` is sent exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts
    pub max_retries: u32,

    /// Initial delay before first retry
    pub initial_delay: Duration,

    /// Maximum delay between retries (cap for exponential backoff)
    pub max_delay: Duration,

    /// Backoff multiplier
    pub backoff_multiplier: u32,
}

impl RetryPolicy {
    /// Create a new retry policy with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_RETRY_MAX_DELAY_MS),
            backoff_multiplier: 2,
        }
    }

    /// Create a retry policy with no retries.
    #[must_use]
    pub const fn no_retry() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::from_millis(0),
            max_delay: Duration::from_millis(0),
            backoff_multiplier: 1,
        }
    }

    /// Set the maximum number of retries.
    #[must_use]
    pub const fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the initial delay.
    #[must_use]
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the maximum delay.
    #[must_use]
    pub const fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Calculate delay for a given attempt number.
    ///
    /// Uses exponential backoff: delay = min(initial_delay * multiplier^(attempt-1), max_delay)
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let multiplier = self.backoff_multiplier.saturating_pow(attempt - 1);
        let delay = self.initial_delay.saturating_mul(multiplier);

        std::cmp::min(delay, self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Request timeout
    pub timeout: Duration,

    /// Retry policy
    pub retry_policy: RetryPolicy,

    /// Connection pool idle timeout
    pub pool_idle_timeout: Duration,

    /// Maximum idle connections per host
    pub pool_max_idle_per_host: usize,

    /// Whether to verify TLS certificates
    pub verify_tls: bool,
}

impl ClientConfig {
    /// Create a new client configuration with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT),
            retry_policy: RetryPolicy::new(),
            pool_idle_timeout: Duration::from_secs(DEFAULT_POOL_IDLE_TIMEOUT),
            pool_max_idle_per_host: DEFAULT_POOL_MAX_IDLE_PER_HOST,
            verify_tls: true,
        }
    }

    /// Set request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set retry policy.
    #[must_use]
    pub const fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Disable retries.
    #[must_use]
    pub const fn without_retries(mut self) -> Self {
        self.retry_policy = RetryPolicy::no_retry();
        self
    }

    /// Set maximum idle connections per host.
    #[must_use]
    pub const fn with_pool_max_idle(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = max;
        self
    }

    /// Enable or disable TLS certificate verification.
    #[must_use]
    pub const fn with_verify_tls(mut self, verify: bool) -> Self {
        self.verify_tls = verify;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

enum Credentials {
    Anonymous,
    Basic {
        username: String,
        password: SecretString,
    },
    Token(SecretString),
}

impl Credentials {
    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Self::Anonymous => request,
            Self::Basic { username, password } => {
                request.basic_auth(username, Some(password.expose_secret()))
            }
            Self::Token(token) => request.bearer_auth(token.expose_secret()),
        }
    }
}

/// Builder for [`ServiceClient`].
pub struct ServiceClientBuilder {
    base_url: Url,
    http_config: ClientConfig,
    credentials: Credentials,
    user_agent: String,
}

impl ServiceClientBuilder {
    /// Create a builder for an API base URL (e.g. `https://host/api/v4/`).
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        let mut base_url = Url::parse(base_url.as_ref())?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            base_url,
            http_config: ClientConfig::new(),
            credentials: Credentials::Anonymous,
            user_agent: USER_AGENT.to_string(),
        })
    }

    /// Create a builder from a validated [`VergeClientConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if the configured URL cannot be resolved.
    pub fn from_config(config: &VergeClientConfig) -> Result<Self> {
        let base_url = config.api_base_url()?;
        let mut builder = Self::new(base_url)?.with_http_config(
            ClientConfig::new()
                .with_timeout(config.timeout())
                .with_retry_policy(RetryPolicy::new().with_max_retries(config.max_retries))
                .with_verify_tls(config.verify_ssl),
        );

        if let Some(token) = &config.token {
            builder = builder.with_token(token.expose_secret());
        } else if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.with_basic_auth(username.clone(), password.expose_secret());
        }

        Ok(builder)
    }

    /// Override the HTTP client configuration.
    #[must_use]
    pub fn with_http_config(mut self, config: ClientConfig) -> Self {
        self.http_config = config;
        self
    }

    /// Override the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.http_config.retry_policy = retry;
        self
    }

    /// Configure HTTP basic authentication credentials.
    #[must_use]
    pub fn with_basic_auth(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Credentials::Basic {
            username: username.into(),
            password: SecretString::from(password.into()),
        };
        self
    }

    /// Configure a bearer token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.credentials = Credentials::Token(SecretString::from(token.into()));
        self
    }

    /// Override the `User-Agent` header.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn build(self) -> Result<ServiceClient> {
        let mut builder = ClientBuilder::new()
            .user_agent(&self.user_agent)
            .timeout(self.http_config.timeout)
            .pool_idle_timeout(self.http_config.pool_idle_timeout)
            .pool_max_idle_per_host(self.http_config.pool_max_idle_per_host)
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT));

        if !self.http_config.verify_tls {
            warn!("TLS verification disabled for VergeOS client");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http = builder.build().map_err(|err| {
            Error::ConfigError(format!("Failed to build VergeOS HTTP client: {err}"))
        })?;

        Ok(ServiceClient {
            http,
            base_url: self.base_url,
            credentials: Arc::new(self.credentials),
            retry_policy: self.http_config.retry_policy,
        })
    }
}

/// Asynchronous VergeOS API client.
#[derive(Clone)]
pub struct ServiceClient {
    http: Client,
    base_url: Url,
    credentials: Arc<Credentials>,
    retry_policy: RetryPolicy,
}

impl ServiceClient {
    /// Construct an anonymous client directly from the API base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the client cannot be built.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        ServiceClientBuilder::new(base_url)?.build()
    }

    /// Construct a client from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the client cannot be built.
    pub fn from_config(config: &VergeClientConfig) -> Result<Self> {
        ServiceClientBuilder::from_config(config)?.build()
    }

    /// Return the API base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Return the retry policy applied to idempotent requests.
    #[must_use]
    pub const fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    fn build_url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|err| Error::InvalidEndpoint(format!("Invalid VergeOS path `{path}`: {err}")))
    }

    /// Send a request, retrying transient failures when the request allows it.
    ///
    /// Only idempotent requests that have not opted out with
    /// [`ApiRequest::without_retries`] are repeated.
    ///
    /// # Errors
    ///
    /// Returns the mapped HTTP error, or the last transient error once the
    /// retry budget is spent.
    pub async fn execute_with_retry(&self, request: &ApiRequest) -> Result<Response> {
        let url = self.build_url(&request.path)?;
        let max_retries = if request.is_retryable() {
            self.retry_policy.max_retries
        } else {
            0
        };
        let mut attempt = 0;

        loop {
            let mut builder = self
                .http
                .request(request.method.clone(), url.clone())
                .query(&request.query)
                .header("Accept", "application/json");
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }
            builder = self.credentials.apply(builder);

            debug!(method = %request.method, path = %request.path, attempt, "Sending VergeOS request");

            let error = match builder.send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    let text = response.text().await.unwrap_or_default();
                    Error::from_status(status, &text)
                }
                Err(err) => Error::from(err),
            };

            if !error.is_transient() || attempt >= max_retries {
                return Err(error);
            }

            attempt += 1;
            let delay = self.retry_policy.delay_for_attempt(attempt);
            debug!(path = %request.path, ?delay, %error, "Retrying VergeOS request");
            if !delay.is_zero() {
                sleep(delay).await;
            }
        }
    }
}

#[async_trait]
impl Transport for ServiceClient {
    async fn request(&self, request: ApiRequest) -> Result<Option<Value>> {
        let response = self.execute_with_retry(&request).await?;
        let text = response.text().await.map_err(Error::from)?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&text).map(Some).map_err(|err| {
            Error::ParseError(format!(
                "Failed to parse VergeOS response for `{}`: {err}",
                request.path
            ))
        })
    }
}
