//! Provider Error Taxonomy
//!
//! All provider-specific error quirks live here: HTTP status mapping and the
//! structured retry-delay hint some providers attach to quota errors. Nothing
//! outside this module parses raw provider error payloads.

use serde_json::Value;
use thiserror::Error;

/// Errors from generative provider calls
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// Invalid or missing API key
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// Quota exhausted for the requested model.
    ///
    /// `retry_after_secs` carries the provider-suggested delay when the
    /// error payload included a structured retry hint.
    #[error("Quota exceeded: {message}")]
    QuotaExceeded {
        message: String,
        retry_after_secs: Option<u64>,
    },

    /// The call was aborted by the caller-supplied timeout
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Upstream server error
    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// Network/connection failure before a response arrived
    #[error("Network error: {message}")]
    NetworkError { message: String },

    /// Generated content failed schema validation
    #[error("Malformed output: {message}")]
    MalformedOutput { message: String },

    /// Bad request parameters
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// Anything else
    #[error("Provider error: {message}")]
    Other { message: String },
}

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

impl ProviderError {
    /// Whether this failure is worth retrying against the same model
    /// (timeout, network failure, 502/503/504).
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Timeout { .. } | ProviderError::NetworkError { .. } => true,
            ProviderError::ServerError { status, .. } => matches!(status, 502 | 503 | 504),
            _ => false,
        }
    }

    /// Whether this failure means the model's quota window is exhausted
    pub fn is_quota(&self) -> bool {
        matches!(self, ProviderError::QuotaExceeded { .. })
    }

    /// HTTP status associated with this error, when one exists
    pub fn http_status(&self) -> Option<u16> {
        match self {
            ProviderError::AuthenticationFailed { .. } => Some(401),
            ProviderError::QuotaExceeded { .. } => Some(429),
            ProviderError::InvalidRequest { .. } => Some(400),
            ProviderError::ServerError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Map an HTTP error response to a provider error.
    pub fn from_http(status: u16, body: &str) -> Self {
        match status {
            401 | 403 => ProviderError::AuthenticationFailed {
                message: preview(body),
            },
            429 => ProviderError::QuotaExceeded {
                message: preview(body),
                retry_after_secs: extract_retry_delay_secs(body),
            },
            400 | 404 | 422 => ProviderError::InvalidRequest {
                message: preview(body),
            },
            500..=599 => ProviderError::ServerError {
                status,
                message: preview(body),
            },
            _ => ProviderError::Other {
                message: format!("HTTP {status}: {}", preview(body)),
            },
        }
    }
}

/// Extract the provider-suggested retry delay in seconds from a quota error
/// payload. The hint arrives as a `RetryInfo` detail with a `retryDelay`
/// expressed either as a `"30s"` duration string or a `{"seconds": 30}`
/// object.
pub fn extract_retry_delay_secs(body: &str) -> Option<u64> {
    let value: Value = serde_json::from_str(body).ok()?;
    let details = value.get("error")?.get("details")?.as_array()?;
    for detail in details {
        let is_retry_info = detail
            .get("@type")
            .and_then(Value::as_str)
            .is_some_and(|t| t.ends_with("RetryInfo"));
        if !is_retry_info {
            continue;
        }
        match detail.get("retryDelay") {
            Some(Value::String(s)) => {
                let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
                if let Ok(secs) = digits.parse() {
                    return Some(secs);
                }
            }
            Some(Value::Object(obj)) => {
                if let Some(secs) = obj.get("seconds").and_then(Value::as_u64) {
                    return Some(secs);
                }
            }
            _ => {}
        }
    }
    None
}

fn preview(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty error body".to_string();
    }
    trimmed.chars().take(300).collect()
}
