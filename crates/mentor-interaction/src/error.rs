//! API client errors and retry classification.

use std::time::Duration;

use rand::Rng;
use reqwest::StatusCode;
use thiserror::Error;

/// Errors produced by the HTTP clients.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing or rejected credentials.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The provider asked us to slow down.
    #[error("rate limited: {0}")]
    RateLimit(String),

    /// Transport-level failure (connect, timeout, broken stream).
    #[error("network error: {0}")]
    Network(String),

    /// Non-success response from the provider.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The response body did not match the expected shape.
    #[error("failed to parse response: {0}")]
    Parse(String),
}

impl ApiError {
    /// Maps a non-success HTTP response to a typed error.
    pub fn from_status(status: StatusCode, body: String) -> Self {
        match status.as_u16() {
            401 | 403 => ApiError::Auth(body),
            429 => ApiError::RateLimit(body),
            _ => ApiError::Api {
                status: status.as_u16(),
                message: body,
            },
        }
    }

    /// Whether a fresh attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::RateLimit(_) | ApiError::Network(_) => true,
            ApiError::Api { status, .. } => matches!(status, 500 | 502 | 503 | 504),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Network(err.to_string())
    }
}

/// Exponential backoff with jitter for the given (zero-based) attempt.
pub(crate) fn backoff_delay(attempt: u32) -> Duration {
    let base = 250u64.saturating_mul(1 << attempt.min(6));
    let jitter: u64 = rand::thread_rng().gen_range(0..100);
    Duration::from_millis(base + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            ApiError::from_status(StatusCode::UNAUTHORIZED, "no".into()),
            ApiError::Auth(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, "slow".into()),
            ApiError::RateLimit(_)
        ));
    }

    #[test]
    fn test_retry_classification() {
        assert!(ApiError::RateLimit("x".into()).is_retryable());
        assert!(ApiError::Network("x".into()).is_retryable());
        assert!(ApiError::Api {
            status: 503,
            message: "x".into()
        }
        .is_retryable());
        assert!(!ApiError::Auth("x".into()).is_retryable());
        assert!(!ApiError::Api {
            status: 404,
            message: "x".into()
        }
        .is_retryable());
    }
}
