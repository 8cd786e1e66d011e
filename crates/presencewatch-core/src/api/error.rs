use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Network unavailable - no attempt made")]
    NetworkUnavailable,

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Request cancelled")]
    Cancelled,
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl FetchError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    pub fn from_status(status: u16, body: &str) -> Self {
        FetchError::Http {
            status,
            body: Self::truncate_body(body),
        }
    }

    pub fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(timeout)
        } else {
            FetchError::Network(err.to_string())
        }
    }

    /// Whether this error consumes one of the retry attempts.
    /// Skipped and abandoned requests never reached a verdict.
    pub fn counts_as_attempt(&self) -> bool {
        !matches!(self, FetchError::NetworkUnavailable | FetchError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_truncates_long_bodies() {
        let body = "x".repeat(2000);
        match FetchError::from_status(502, &body) {
            FetchError::Http { status, body } => {
                assert_eq!(status, 502);
                assert!(body.starts_with(&"x".repeat(500)));
                assert!(body.ends_with("(truncated, 2000 total bytes)"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let body = "é".repeat(400);
        let err = FetchError::from_status(500, &body);
        assert!(err.to_string().contains("truncated, 800 total bytes"));
    }

    #[test]
    fn test_counts_as_attempt() {
        assert!(FetchError::Timeout(Duration::from_secs(10)).counts_as_attempt());
        assert!(FetchError::Malformed("bad".into()).counts_as_attempt());
        assert!(FetchError::from_status(404, "").counts_as_attempt());
        assert!(!FetchError::NetworkUnavailable.counts_as_attempt());
        assert!(!FetchError::Cancelled.counts_as_attempt());
    }
}
