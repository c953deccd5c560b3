//! The single-request capability every VergeOS resource client is built on.
//!
//! Resource clients never touch reqwest directly; they describe a call as an
//! [`ApiRequest`] and hand it to a [`Transport`]. The production
//! implementation is [`ServiceClient`](crate::client::ServiceClient); tests
//! substitute scripted or mocked transports.

use crate::Result;
use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

/// One HTTP request against the VergeOS API, relative to the API base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP method
    pub method: Method,
    /// Endpoint path without the `/api/v4/` prefix (e.g. `volume_browser`)
    pub path: String,
    /// Query string pairs
    pub query: Vec<(String, String)>,
    /// JSON request body
    pub body: Option<Value>,
    /// Whether the transport may repeat this request on a transient failure
    pub retry: bool,
}

impl ApiRequest {
    /// Create a request with no query or body.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            retry: true,
        }
    }

    /// Shorthand for a `GET` request.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Shorthand for a `POST` request carrying a JSON body.
    #[must_use]
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    /// Append a query pair.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Append query pairs produced by [`QueryParams`](crate::query::QueryParams).
    #[must_use]
    pub fn with_query_pairs(mut self, pairs: Vec<(&'static str, String)>) -> Self {
        self.query
            .extend(pairs.into_iter().map(|(k, v)| (k.to_string(), v)));
        self
    }

    /// Attach a JSON body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Send this request at most once, leaving retries to the caller.
    #[must_use]
    pub fn without_retries(mut self) -> Self {
        self.retry = false;
        self
    }

    /// Whether repeating this request cannot create duplicate server state.
    #[must_use]
    pub fn is_idempotent(&self) -> bool {
        matches!(
            self.method,
            Method::GET | Method::HEAD | Method::PUT | Method::DELETE | Method::OPTIONS
        )
    }

    /// Whether the transport may retry this request.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.retry && self.is_idempotent()
    }
}

/// Performs a single request/response cycle against the VergeOS API.
///
/// Implementations own authentication, base URL resolution and
/// serialization. A successful response with an empty body yields
/// `Ok(None)`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute the request and decode the JSON response body.
    ///
    /// # Errors
    ///
    /// Returns an error if the request could not be sent, the API answered
    /// with a non-success status, or the body is not valid JSON.
    async fn request(&self, request: ApiRequest) -> Result<Option<Value>>;
}
