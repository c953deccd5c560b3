//! Configuration structures for VergeOS clients.
//!
//! This module provides the connection settings for a VergeOS system:
//! endpoint, credentials, TLS behaviour, timeouts and retries, with
//! validation and environment-variable loading.

use crate::Error;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;
use validator::{Validate, ValidationError};

/// VergeOS API version prefix appended to the configured URL.
pub const API_BASE_PATH: &str = "api/v4/";

/// Configuration for a VergeOS client instance.
///
/// Credentials are either an API token (sent as a bearer token) or a
/// username/password pair (sent as HTTP basic auth). Secrets are never
/// serialized.
#[derive(Debug, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_credentials"))]
pub struct VergeClientConfig {
    /// Base URL of the VergeOS system (e.g. `https://verge.example.com`)
    #[validate(url)]
    pub url: String,

    /// Username for basic authentication
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Password for basic authentication
    #[serde(skip)]
    pub password: Option<SecretString>,

    /// API token for bearer authentication
    #[serde(skip)]
    pub token: Option<SecretString>,

    /// Whether to verify TLS certificates
    #[serde(default = "default_verify_ssl")]
    pub verify_ssl: bool,

    /// Request timeout in seconds
    #[validate(range(min = 1, max = 300))]
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Maximum number of retry attempts for idempotent requests
    #[validate(range(min = 0, max = 10))]
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

const fn default_verify_ssl() -> bool {
    true
}

const fn default_request_timeout_secs() -> u64 {
    30
}

const fn default_max_retries() -> u32 {
    3
}

fn validate_credentials(config: &VergeClientConfig) -> Result<(), ValidationError> {
    let has_token = config.token.is_some();
    let has_basic = config.username.is_some() && config.password.is_some();
    if has_token || has_basic {
        Ok(())
    } else {
        Err(ValidationError::new("credentials_required")
            .with_message("either a token or username/password is required".into()))
    }
}

fn clone_secret(secret: &SecretString) -> SecretString {
    SecretString::from(secret.expose_secret().to_string())
}

impl Clone for VergeClientConfig {
    fn clone(&self) -> Self {
        Self {
            url: self.url.clone(),
            username: self.username.clone(),
            password: self.password.as_ref().map(clone_secret),
            token: self.token.as_ref().map(clone_secret),
            verify_ssl: self.verify_ssl,
            request_timeout_secs: self.request_timeout_secs,
            max_retries: self.max_retries,
        }
    }
}

impl VergeClientConfig {
    /// Create a configuration authenticated with an API token.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or validation fails.
    pub fn with_token_auth(url: impl Into<String>, token: impl Into<String>) -> Result<Self, Error> {
        let config = Self::unvalidated(url.into()).with_token(token);
        config.checked()
    }

    /// Create a configuration authenticated with a username and password.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or validation fails.
    pub fn with_basic_auth(
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, Error> {
        let config = Self::unvalidated(url.into()).with_credentials(username, password);
        config.checked()
    }

    /// Load configuration from `VERGE_*` environment variables.
    ///
    /// Reads `VERGE_HOST` (required), `VERGE_USERNAME`, `VERGE_PASSWORD`,
    /// `VERGE_TOKEN`, `VERGE_VERIFY_SSL`, `VERGE_TIMEOUT` and
    /// `VERGE_RETRY_TOTAL`.
    ///
    /// # Errors
    ///
    /// Returns an error if `VERGE_HOST` is missing, a numeric variable does
    /// not parse, or validation fails.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`VergeClientConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("VERGE_HOST")
            .filter(|host| !host.trim().is_empty())
            .ok_or_else(|| Error::ConfigError("VERGE_HOST environment variable not set".into()))?;

        let url = if host.contains("://") {
            host
        } else {
            format!("https://{host}")
        };

        let mut config = Self::unvalidated(url);
        config.username = lookup("VERGE_USERNAME");
        config.password = lookup("VERGE_PASSWORD").map(SecretString::from);
        config.token = lookup("VERGE_TOKEN").map(SecretString::from);

        if let Some(verify) = lookup("VERGE_VERIFY_SSL") {
            config.verify_ssl = matches!(verify.to_lowercase().as_str(), "true" | "1" | "yes");
        }
        if let Some(timeout) = lookup("VERGE_TIMEOUT") {
            config.request_timeout_secs = timeout.trim().parse().map_err(|e| {
                Error::ConfigError(format!("Invalid VERGE_TIMEOUT `{timeout}`: {e}"))
            })?;
        }
        if let Some(retries) = lookup("VERGE_RETRY_TOTAL") {
            config.max_retries = retries.trim().parse().map_err(|e| {
                Error::ConfigError(format!("Invalid VERGE_RETRY_TOTAL `{retries}`: {e}"))
            })?;
        }

        config.checked()
    }

    fn unvalidated(url: String) -> Self {
        Self {
            url,
            username: None,
            password: None,
            token: None,
            verify_ssl: default_verify_ssl(),
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }

    fn checked(self) -> Result<Self, Error> {
        self.validate()
            .map_err(|e| Error::ConfigError(format!("Invalid configuration: {e}")))?;
        Ok(self)
    }

    /// Set the API token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(SecretString::from(token.into()));
        self
    }

    /// Set basic authentication credentials.
    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(SecretString::from(password.into()));
        self
    }

    /// Set whether to verify TLS certificates.
    #[must_use]
    pub const fn with_verify_ssl(mut self, verify: bool) -> Self {
        self.verify_ssl = verify;
        self
    }

    /// Set request timeout in seconds.
    #[must_use]
    pub const fn with_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout_secs = seconds;
        self
    }

    /// Set maximum retry attempts.
    #[must_use]
    pub const fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Get the request timeout as a Duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Resolve the API base URL (`<url>/api/v4/`).
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn api_base_url(&self) -> Result<Url, Error> {
        let mut base = Url::parse(&self.url)
            .map_err(|e| Error::ConfigError(format!("Invalid VergeOS URL: {e}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.join(API_BASE_PATH)
            .map_err(|e| Error::ConfigError(format!("Invalid VergeOS URL: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_token_config() {
        let config = VergeClientConfig::with_token_auth("https://verge.example.com", "tok").unwrap();
        assert_eq!(config.url, "https://verge.example.com");
        assert!(config.verify_ssl);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.token.as_ref().unwrap().expose_secret(), "tok");
    }

    #[test]
    fn test_basic_config() {
        let config =
            VergeClientConfig::with_basic_auth("https://verge.example.com", "admin", "pw").unwrap();
        assert_eq!(config.username.as_deref(), Some("admin"));
        assert_eq!(config.password.as_ref().unwrap().expose_secret(), "pw");
    }

    #[test]
    fn test_invalid_url_rejected() {
        assert!(VergeClientConfig::with_token_auth("not-a-url", "tok").is_err());
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let config = VergeClientConfig::unvalidated("https://verge.example.com".into());
        assert!(config.validate().is_err());

        let mut config = VergeClientConfig::unvalidated("https://verge.example.com".into());
        config.username = Some("admin".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timeout_range() {
        let mut config =
            VergeClientConfig::with_token_auth("https://verge.example.com", "tok").unwrap();
        config.request_timeout_secs = 0;
        assert!(config.validate().is_err());

        config.request_timeout_secs = 301;
        assert!(config.validate().is_err());

        config.request_timeout_secs = 45;
        assert!(config.validate().is_ok());
        assert_eq!(config.timeout(), Duration::from_secs(45));
    }

    #[test]
    fn test_retries_range() {
        let mut config =
            VergeClientConfig::with_token_auth("https://verge.example.com", "tok").unwrap();
        config.max_retries = 11;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_base_url() {
        let config = VergeClientConfig::with_token_auth("https://verge.example.com", "t").unwrap();
        assert_eq!(
            config.api_base_url().unwrap().as_str(),
            "https://verge.example.com/api/v4/"
        );

        let config =
            VergeClientConfig::with_token_auth("https://verge.example.com/proxy", "t").unwrap();
        assert_eq!(
            config.api_base_url().unwrap().as_str(),
            "https://verge.example.com/proxy/api/v4/"
        );
    }

    #[test]
    fn test_from_lookup_promotes_bare_host() {
        let config = VergeClientConfig::from_lookup(lookup_from(&[
            ("VERGE_HOST", "10.0.0.5"),
            ("VERGE_TOKEN", "abc"),
            ("VERGE_VERIFY_SSL", "no"),
            ("VERGE_TIMEOUT", "60"),
            ("VERGE_RETRY_TOTAL", "5"),
        ]))
        .unwrap();

        assert_eq!(config.url, "https://10.0.0.5");
        assert!(!config.verify_ssl);
        assert_eq!(config.request_timeout_secs, 60);
        assert_eq!(config.max_retries, 5);
    }

    #[test]
    fn test_from_lookup_requires_host() {
        let err = VergeClientConfig::from_lookup(lookup_from(&[("VERGE_TOKEN", "abc")]))
            .unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[test]
    fn test_from_lookup_rejects_bad_timeout() {
        let err = VergeClientConfig::from_lookup(lookup_from(&[
            ("VERGE_HOST", "https://verge"),
            ("VERGE_TOKEN", "abc"),
            ("VERGE_TIMEOUT", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[test]
    fn test_secrets_not_serialized() {
        let config =
            VergeClientConfig::with_basic_auth("https://verge.example.com", "admin", "hunter2")
                .unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("admin"));
        assert!(!json.contains("hunter2"));

        let cloned = config.clone();
        assert_eq!(cloned.password.unwrap().expose_secret(), "hunter2");
    }
}
