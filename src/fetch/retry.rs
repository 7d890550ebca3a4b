//! Retry classification and backoff schedule for catalog and image requests.
//!
//! A failed attempt is classified into a [`FailureType`], and the
//! [`RetryPolicy`] turns that classification plus the zero-based index of the
//! failed attempt into a [`RetryDecision`].
//!
//! # Backoff schedule
//!
//! | Failure | Delay before the next attempt |
//! |---------|-------------------------------|
//! | 429 with numeric `Retry-After: n` | `n + 1.0` seconds |
//! | 429 without usable header | `min(2^attempt, 60) + 0.1 * attempt` seconds |
//! | 403 on an image | warm-up request, then `0.3 * (attempt + 1)` seconds |
//! | anything else retryable | `0.2 * (attempt + 1)` seconds |
//!
//! # Example
//!
//! ```
//! use chapter_downloader_core::fetch::{FailureType, ResponseKind, RetryDecision, RetryPolicy};
//!
//! let policy = RetryPolicy::with_max_attempts(4);
//! match policy.should_retry(FailureType::RateLimited, 0, Some("3"), ResponseKind::Json) {
//!     RetryDecision::Retry { delay, .. } => assert_eq!(delay.as_secs_f64(), 4.0),
//!     RetryDecision::DoNotRetry { .. } => unreachable!(),
//! }
//! ```

use std::time::Duration;

use tracing::debug;

use super::FetchError;
use super::constants::{MAX_RATE_LIMIT_BACKOFF, MAX_RETRY_AFTER};

/// What the caller expects the response body to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// Structured JSON metadata.
    Json,
    /// Raw image bytes.
    Binary,
}

/// Classification of a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// HTTP 429; honours Retry-After.
    RateLimited,
    /// HTTP 403; images recover after a session warm-up.
    Forbidden,
    /// Transport, decode, empty-body and server errors.
    Transient,
    /// Will not succeed on retry (missing resource, malformed URL).
    Permanent,
}

/// Decision on whether to retry a failed attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryDecision {
    /// Retry after `delay`.
    Retry {
        /// How long to wait before the next attempt.
        delay: Duration,
        /// Zero-based index of the next attempt.
        attempt: u32,
        /// Whether a warm-up request must precede the next attempt.
        warm_up: bool,
    },

    /// Stop retrying.
    DoNotRetry {
        /// Whether the budget ran out (as opposed to a non-retryable failure).
        exhausted: bool,
        /// Human-readable reason.
        reason: String,
    },
}

/// Attempt budget for one logical request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first.
    max_attempts: u32,
}

impl RetryPolicy {
    /// Creates a policy allowing `max_attempts` attempts (at least one).
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// Returns the configured attempt budget.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Decides what to do after the attempt with zero-based index `attempt` failed.
    #[must_use]
    pub fn should_retry(
        &self,
        failure_type: FailureType,
        attempt: u32,
        retry_after: Option<&str>,
        kind: ResponseKind,
    ) -> RetryDecision {
        if failure_type == FailureType::Permanent {
            return RetryDecision::DoNotRetry {
                exhausted: false,
                reason: "permanent failure - retry would not help".to_string(),
            };
        }

        if attempt + 1 >= self.max_attempts {
            debug!(attempt, max = self.max_attempts, "max attempts reached");
            return RetryDecision::DoNotRetry {
                exhausted: true,
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        let (delay, warm_up) = match (failure_type, kind) {
            (FailureType::RateLimited, _) => (rate_limit_delay(attempt, retry_after), false),
            (FailureType::Forbidden, ResponseKind::Binary) => (forbidden_delay(attempt), true),
            _ => (transient_delay(attempt), false),
        };

        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
            warm_up,
        }
    }
}

/// Delay after a 429 on attempt `attempt`.
///
/// A numeric Retry-After wins (plus one second of slack); otherwise
/// `min(2^attempt, 60) + 0.1 * attempt` seconds.
#[must_use]
pub fn rate_limit_delay(attempt: u32, retry_after: Option<&str>) -> Duration {
    if let Some(server_delay) = retry_after.and_then(parse_retry_after) {
        return server_delay + Duration::from_secs(1);
    }
    let exponential = 2f64
        .powi(i32::try_from(attempt).unwrap_or(i32::MAX))
        .min(MAX_RATE_LIMIT_BACKOFF.as_secs_f64());
    Duration::from_secs_f64(exponential + 0.1 * f64::from(attempt))
}

/// Delay after a 403 on an image, taken once the warm-up request is done.
#[must_use]
pub fn forbidden_delay(attempt: u32) -> Duration {
    Duration::from_secs_f64(0.3 * f64::from(attempt + 1))
}

/// Delay after any other retryable failure.
#[must_use]
pub fn transient_delay(attempt: u32) -> Duration {
    Duration::from_secs_f64(0.2 * f64::from(attempt + 1))
}

/// Parses a numeric Retry-After header (seconds, fractional allowed).
///
/// Negative, non-finite and non-numeric values (including HTTP-dates) yield `None`.
/// Values above one hour are capped.
#[must_use]
pub fn parse_retry_after(header_value: &str) -> Option<Duration> {
    let seconds = header_value.trim().parse::<f64>().ok()?;
    if !seconds.is_finite() || seconds < 0.0 {
        debug!(header_value, "unusable Retry-After value, ignoring");
        return None;
    }
    Some(Duration::from_secs_f64(seconds).min(MAX_RETRY_AFTER))
}

/// Classifies a fetch error for retry decisions.
///
/// | Error | Type |
/// |-------|------|
/// | HTTP 429 | RateLimited |
/// | HTTP 403 | Forbidden |
/// | HTTP 404, 410 | Permanent |
/// | Other HTTP statuses | Transient |
/// | Timeout, network, decode, empty body | Transient |
/// | Invalid URL, client construction | Permanent |
#[must_use]
pub fn classify_error(error: &FetchError) -> FailureType {
    match error {
        FetchError::HttpStatus { status, .. } => match *status {
            429 => FailureType::RateLimited,
            403 => FailureType::Forbidden,
            404 | 410 => FailureType::Permanent,
            _ => FailureType::Transient,
        },
        FetchError::Timeout { .. }
        | FetchError::Network { .. }
        | FetchError::Decode { .. }
        | FetchError::EmptyResponse { .. } => FailureType::Transient,
        FetchError::InvalidUrl { .. }
        | FetchError::Client { .. }
        | FetchError::RetriesExhausted { .. } => FailureType::Permanent,
    }
}
