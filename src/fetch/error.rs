//! Error types for the fetch module.
//!
//! Every variant carries the URL it was produced for so that retry logs and
//! chapter failure reports stay actionable.

use thiserror::Error;

/// Errors that can occur while fetching metadata or image bytes.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Non-success HTTP response.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
        /// The raw Retry-After header value, if present.
        retry_after: Option<String>,
    },

    /// Response body was not valid JSON.
    #[error("invalid JSON from {url}: {source}")]
    Decode {
        /// The URL whose body failed to decode.
        url: String,
        /// The underlying decode error.
        #[source]
        source: serde_json::Error,
    },

    /// Successful response with a zero-length body where bytes were expected.
    #[error("empty response body from {url}")]
    EmptyResponse {
        /// The URL that returned an empty body.
        url: String,
    },

    /// The URL could not be parsed.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {source}")]
    Client {
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },

    /// A retryable failure kept recurring until the attempt budget was spent.
    #[error("gave up on {url} after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// The URL that kept failing.
        url: String,
        /// Number of attempts made.
        attempts: u32,
        /// The error from the final attempt.
        #[source]
        last: Box<FetchError>,
    },
}

impl FetchError {
    /// Creates a network error from a reqwest error, promoting timeouts.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout { url: url.into() }
        } else {
            Self::Network {
                url: url.into(),
                source,
            }
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
            retry_after: None,
        }
    }

    /// Creates an HTTP status error with a Retry-After header value.
    pub fn http_status_with_retry_after(
        url: impl Into<String>,
        status: u16,
        retry_after: Option<String>,
    ) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
            retry_after,
        }
    }

    /// Creates a JSON decode error.
    pub fn decode(url: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            url: url.into(),
            source,
        }
    }

    /// Creates an empty-body error.
    pub fn empty_response(url: impl Into<String>) -> Self {
        Self::EmptyResponse { url: url.into() }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Wraps the final error of an exhausted retry loop.
    pub fn exhausted(url: impl Into<String>, attempts: u32, last: FetchError) -> Self {
        Self::RetriesExhausted {
            url: url.into(),
            attempts,
            last: Box::new(last),
        }
    }

    /// Returns the HTTP status behind this error, looking through exhaustion wrappers.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            Self::RetriesExhausted { last, .. } => last.status(),
            _ => None,
        }
    }

    /// Returns the Retry-After header carried by a status error.
    #[must_use]
    pub fn retry_after(&self) -> Option<&str> {
        match self {
            Self::HttpStatus { retry_after, .. } => retry_after.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_http_status_display() {
        let error = FetchError::http_status("https://api.example.com/slug", 503);
        let msg = error.to_string();
        assert!(msg.contains("503"), "Expected '503' in: {msg}");
        assert!(msg.contains("https://api.example.com/slug"));
    }

    #[test]
    fn test_fetch_error_exhausted_keeps_last_error() {
        let error = FetchError::exhausted(
            "https://img.example.com/1.jpg",
            10,
            FetchError::empty_response("https://img.example.com/1.jpg"),
        );
        let msg = error.to_string();
        assert!(msg.contains("10 attempts"), "Expected attempts in: {msg}");
        assert!(msg.contains("empty response"), "Expected cause in: {msg}");
    }

    #[test]
    fn test_fetch_error_status_looks_through_exhaustion() {
        let error = FetchError::exhausted(
            "https://api.example.com",
            4,
            FetchError::http_status("https://api.example.com", 429),
        );
        assert_eq!(error.status(), Some(429));
        let timeout = FetchError::Timeout {
            url: "https://api.example.com".to_string(),
        };
        assert_eq!(timeout.status(), None);
    }

    #[test]
    fn test_fetch_error_retry_after_accessor() {
        let error = FetchError::http_status_with_retry_after(
            "https://api.example.com",
            429,
            Some("3".to_string()),
        );
        assert_eq!(error.retry_after(), Some("3"));
        assert_eq!(FetchError::http_status("u", 500).retry_after(), None);
    }
}
