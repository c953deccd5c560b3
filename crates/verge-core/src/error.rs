//! Error types for VergeOS operations.
//!
//! This module provides the error taxonomy shared by every VergeOS client crate,
//! including HTTP status code mapping and the classified failures of the
//! asynchronous volume-browse job protocol.

use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Main error type for VergeOS operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The backend accepted a request but the exchange could not be completed
    #[error("Transport failed: {0}")]
    TransportFailed(String),

    /// A server-side job reported `status = error`
    #[error("Job failed: {0}")]
    JobFailed(String),

    /// A server-side job did not reach a terminal state within its attempt budget
    #[error("Job {job} timed out after {} seconds", .after.as_secs_f64())]
    JobTimeout {
        /// Key of the job that was being polled
        job: String,
        /// Configured wait budget
        after: Duration,
    },

    /// A job result payload could not be decoded
    #[error("Malformed result: {0}")]
    MalformedResult(String),

    /// The caller abandoned the operation
    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    /// VergeOS API is unavailable
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// HTTP request timed out
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Authentication was rejected
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request built by the caller
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Bad request reported by the API
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Conflict error
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Invalid endpoint
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Invalid resource key
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Failed to parse an API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Specialized result type for VergeOS operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::TransportFailed(_) => "TRANSPORT_FAILED",
            Self::JobFailed(_) => "JOB_FAILED",
            Self::JobTimeout { .. } => "JOB_TIMEOUT",
            Self::MalformedResult(_) => "MALFORMED_RESULT",
            Self::Cancelled(_) => "CANCELLED",
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            Self::HttpError(_) => "HTTP_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::InvalidEndpoint(_) => "INVALID_ENDPOINT",
            Self::InvalidKey(_) => "INVALID_KEY",
            Self::ParseError(_) => "PARSE_ERROR",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns true if repeating the same request may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ServiceUnavailable(_) | Self::Timeout(_) | Self::HttpError(_)
        )
    }

    /// Build an error from a non-success HTTP status and its response body.
    #[must_use]
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = extract_error_message(status, body);
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::Unauthorized(message),
            StatusCode::NOT_FOUND => Self::NotFound(message),
            StatusCode::BAD_REQUEST => Self::BadRequest(message),
            StatusCode::CONFLICT => Self::Conflict(message),
            StatusCode::UNPROCESSABLE_ENTITY => Self::ValidationError(message),
            StatusCode::TOO_MANY_REQUESTS
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT => {
                Self::ServiceUnavailable(format!("VergeOS temporarily unavailable: {message}"))
            }
            status if status.is_server_error() => {
                Self::ServiceUnavailable(format!("VergeOS server error {status}: {message}"))
            }
            _ => Self::HttpError(format!("VergeOS error {status}: {message}")),
        }
    }
}

/// VergeOS reports errors under `err`, `error` or `message`, sometimes nested.
fn extract_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for field in ["err", "error", "message"] {
            match value.get(field) {
                Some(serde_json::Value::String(msg)) => return msg.clone(),
                Some(serde_json::Value::Object(inner)) => {
                    if let Some(msg) = inner.get("message") {
                        return msg
                            .as_str()
                            .map_or_else(|| msg.to_string(), str::to_string);
                    }
                }
                _ => {}
            }
        }
        if !value.is_null() {
            return value.to_string();
        }
    }

    if body.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        body.to_string()
    }
}

// Conversions from external error types
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::ServiceUnavailable(err.to_string())
        } else if err.is_decode() {
            Self::ParseError(err.to_string())
        } else {
            Self::HttpError(err.to_string())
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidEndpoint(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ValidationError(err.to_string())
    }
}
