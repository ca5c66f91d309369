//! Error types used throughout the access layer
//!
//! The retry executor consults [`DocBridgeError::is_retryable`] to decide
//! whether a failure is transient: network-level errors and a narrow status
//! allow-list ({429, 502, 503, 504}) retry, everything else surfaces
//! immediately. Retrying a 4xx caused by bad input would waste time and mask
//! bugs, so the rest of 4xx is deliberately non-retryable.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Statuses that signal backend overload or a transient gateway fault.
const RETRYABLE_STATUSES: [u16; 4] = [429, 502, 503, 504];

/// Main error type for docbridge
#[derive(Error, Debug, Serialize, Deserialize)]
pub enum DocBridgeError {
    /// Malformed caller input, detected before any network call. Never
    /// retried.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Network-level transient failure (timeout, connection reset).
    #[error("Network error: {0}")]
    Network(String),

    /// Backend answered with a status worth retrying (429, 502, 503, 504).
    #[error("Retryable status {status}: {message}")]
    RetryableStatus { status: u16, message: String },

    /// Any other non-2xx response. Carries the parsed body for inspection.
    #[error("API error (HTTP {status})")]
    Api { status: u16, body: serde_json::Value },

    /// Adapter-side failure (unparseable body, broken invariant).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DocBridgeError {
    /// True when retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::RetryableStatus { .. })
    }

    /// HTTP status attached to this error, when one exists.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RetryableStatus { status, .. } | Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Classify a non-2xx response into the retryable/terminal split.
    pub fn from_status(status: u16, body: serde_json::Value) -> Self {
        if RETRYABLE_STATUSES.contains(&status) {
            let message = body
                .get("message")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("backend unavailable")
                .to_string();
            Self::RetryableStatus { status, message }
        } else {
            Self::Api { status, body }
        }
    }
}

/// Result type alias for docbridge operations
pub type Result<T> = std::result::Result<T, DocBridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_errors_are_retryable() {
        assert!(DocBridgeError::Network("connection reset".into()).is_retryable());
    }

    #[test]
    fn allow_listed_statuses_are_retryable() {
        for status in [429, 502, 503, 504] {
            let err = DocBridgeError::from_status(status, serde_json::Value::Null);
            assert!(err.is_retryable(), "status {status} should be retryable");
            assert_eq!(err.status(), Some(status));
        }
    }

    #[test]
    fn other_statuses_are_terminal() {
        for status in [400, 401, 403, 404, 409, 417, 500, 501] {
            let err = DocBridgeError::from_status(status, serde_json::Value::Null);
            assert!(!err.is_retryable(), "status {status} should not be retryable");
            assert!(matches!(err, DocBridgeError::Api { .. }));
        }
    }

    #[test]
    fn validation_errors_are_terminal() {
        assert!(!DocBridgeError::Validation("missing collection".into()).is_retryable());
    }

    #[test]
    fn api_error_keeps_parsed_body() {
        let body = serde_json::json!({"exc_type": "DoesNotExistError"});
        let err = DocBridgeError::from_status(404, body.clone());
        match err {
            DocBridgeError::Api { status, body: kept } => {
                assert_eq!(status, 404);
                assert_eq!(kept, body);
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn retryable_status_uses_body_message() {
        let body = serde_json::json!({"message": "rate limited, slow down"});
        let err = DocBridgeError::from_status(429, body);
        assert!(err.to_string().contains("rate limited"));
    }
}
