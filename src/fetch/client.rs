//! Rate-limit aware HTTP client for catalog metadata and image bytes.
//!
//! [`FetchClient`] wraps one shared `reqwest::Client` (connection pool and
//! cookie store) and performs a single *logical* request per call: the
//! attempt loop, backoff sleeps, 403 warm-up and post-response throttle all
//! live here so callers only see the final body or a [`FetchError`].

use std::time::Duration;

use reqwest::Client;
use reqwest::header::{HeaderValue, RETRY_AFTER};
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::error::FetchError;
use super::retry::{ResponseKind, RetryDecision, RetryPolicy, classify_error};
use crate::user_agent;

/// Settings needed to build a [`FetchClient`].
#[derive(Debug, Clone)]
pub struct FetchSettings {
    /// Referer presented to the image host; its origin is used for warm-ups.
    pub referer: String,
    /// Pause after every successful JSON response.
    pub request_delay: Duration,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Whole-request timeout.
    pub read_timeout: Duration,
}

impl FetchSettings {
    /// Creates settings with the default timeouts.
    #[must_use]
    pub fn new(referer: impl Into<String>, request_delay: Duration) -> Self {
        Self {
            referer: referer.into(),
            request_delay,
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(READ_TIMEOUT_SECS),
        }
    }
}

/// Body of a successful fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchedBody {
    /// Parsed JSON document.
    Json(Value),
    /// Non-empty raw bytes.
    Binary(Vec<u8>),
}

/// HTTP client applying the retry/backoff policy to every logical request.
///
/// Cheap to clone; clones share the underlying connection pool and cookies.
#[derive(Debug, Clone)]
pub struct FetchClient {
    client: Client,
    request_delay: Duration,
    referer: HeaderValue,
    origin: HeaderValue,
    warm_up_url: String,
}

impl FetchClient {
    /// Builds the shared client.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidUrl`] if the referer is not an absolute
    /// URL, or [`FetchError::Client`] if the reqwest builder fails.
    #[instrument(level = "debug", skip(settings), fields(referer = %settings.referer))]
    pub fn new(settings: &FetchSettings) -> Result<Self, FetchError> {
        let referer_url =
            Url::parse(&settings.referer).map_err(|_| FetchError::invalid_url(&settings.referer))?;
        let origin = referer_url.origin().ascii_serialization();
        if origin == "null" {
            return Err(FetchError::invalid_url(&settings.referer));
        }

        let referer = HeaderValue::from_str(referer_url.as_str())
            .map_err(|_| FetchError::invalid_url(&settings.referer))?;
        let origin_header =
            HeaderValue::from_str(&origin).map_err(|_| FetchError::invalid_url(&origin))?;

        let client = Client::builder()
            .default_headers(user_agent::browser_headers())
            .cookie_store(true)
            .gzip(true)
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.read_timeout)
            .build()
            .map_err(|source| FetchError::Client { source })?;

        debug!(
            origin = %origin,
            request_delay_ms = settings.request_delay.as_millis(),
            "created fetch client"
        );

        Ok(Self {
            client,
            request_delay: settings.request_delay,
            referer,
            origin: origin_header,
            warm_up_url: format!("{origin}/"),
        })
    }

    /// Performs one logical request, retrying per `policy`.
    ///
    /// # Errors
    ///
    /// Returns the non-retryable error as-is, or
    /// [`FetchError::RetriesExhausted`] wrapping the last failure once the
    /// budget is spent.
    pub async fn fetch(
        &self,
        url: &str,
        kind: ResponseKind,
        params: &[(&str, String)],
        policy: RetryPolicy,
    ) -> Result<FetchedBody, FetchError> {
        match kind {
            ResponseKind::Json => self
                .fetch_json(url, params, policy)
                .await
                .map(FetchedBody::Json),
            ResponseKind::Binary => {
                let target = build_url(url, params)?;
                self.fetch_with_retry(&target, kind, policy, decode_binary)
                    .await
                    .map(FetchedBody::Binary)
            }
        }
    }

    /// Fetches and parses a JSON document.
    ///
    /// # Errors
    ///
    /// See [`fetch`](Self::fetch).
    pub async fn fetch_json(
        &self,
        url: &str,
        params: &[(&str, String)],
        policy: RetryPolicy,
    ) -> Result<Value, FetchError> {
        let target = build_url(url, params)?;
        self.fetch_with_retry(&target, ResponseKind::Json, policy, decode_json)
            .await
    }

    /// Fetches image bytes with Referer/Origin headers.
    ///
    /// # Errors
    ///
    /// See [`fetch`](Self::fetch). A zero-length body counts as a failed attempt.
    pub async fn fetch_image(&self, url: &str, policy: RetryPolicy) -> Result<Vec<u8>, FetchError> {
        let target = build_url(url, &[])?;
        self.fetch_with_retry(&target, ResponseKind::Binary, policy, decode_binary)
            .await
    }

    #[instrument(skip(self, policy, decode), fields(url = %url, kind = ?kind))]
    async fn fetch_with_retry<T>(
        &self,
        url: &Url,
        kind: ResponseKind,
        policy: RetryPolicy,
        decode: fn(&Url, Vec<u8>) -> Result<T, FetchError>,
    ) -> Result<T, FetchError> {
        let mut attempt = 0u32;

        loop {
            debug!(attempt, "sending request");

            let outcome = match self.send_once(url, kind).await {
                Ok(body) => decode(url, body),
                Err(error) => Err(error),
            };

            let error = match outcome {
                Ok(value) => {
                    if kind == ResponseKind::Json && !self.request_delay.is_zero() {
                        tokio::time::sleep(self.request_delay).await;
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            let failure_type = classify_error(&error);
            match policy.should_retry(failure_type, attempt, error.retry_after(), kind) {
                RetryDecision::Retry {
                    delay,
                    attempt: next_attempt,
                    warm_up,
                } => {
                    warn!(
                        attempt = next_attempt,
                        max_attempts = policy.max_attempts(),
                        delay_ms = delay.as_millis(),
                        ?failure_type,
                        error = %error,
                        "retrying request"
                    );
                    if warm_up {
                        self.warm_up().await;
                    }
                    tokio::time::sleep(delay).await;
                    attempt = next_attempt;
                }
                RetryDecision::DoNotRetry { exhausted, reason } => {
                    debug!(%reason, error = %error, "not retrying request");
                    return Err(if exhausted {
                        FetchError::exhausted(url.as_str(), attempt + 1, error)
                    } else {
                        error
                    });
                }
            }
        }
    }

    async fn send_once(&self, url: &Url, kind: ResponseKind) -> Result<Vec<u8>, FetchError> {
        let mut request = self.client.get(url.clone());
        if kind == ResponseKind::Binary {
            request = request.headers(user_agent::image_headers(&self.referer, &self.origin));
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::network(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(std::string::ToString::to_string);
            return Err(FetchError::http_status_with_retry_after(
                url.as_str(),
                status.as_u16(),
                retry_after,
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::network(url.as_str(), e))?;
        Ok(body.to_vec())
    }

    /// Touches the referer origin to refresh cookies/anti-bot state.
    ///
    /// Failures are logged and ignored.
    async fn warm_up(&self) {
        debug!(url = %self.warm_up_url, "warming up session");
        match self.client.get(&self.warm_up_url).send().await {
            Ok(response) => {
                debug!(status = response.status().as_u16(), "warm-up finished");
            }
            Err(error) => {
                debug!(error = %error, "warm-up request failed, ignoring");
            }
        }
    }
}

fn build_url(url: &str, params: &[(&str, String)]) -> Result<Url, FetchError> {
    let parsed = if params.is_empty() {
        Url::parse(url)
    } else {
        Url::parse_with_params(url, params.iter())
    };
    parsed.map_err(|_| FetchError::invalid_url(url))
}

fn decode_json(url: &Url, body: Vec<u8>) -> Result<Value, FetchError> {
    serde_json::from_slice(&body).map_err(|e| FetchError::decode(url.as_str(), e))
}

fn decode_binary(url: &Url, body: Vec<u8>) -> Result<Vec<u8>, FetchError> {
    if body.is_empty() {
        Err(FetchError::empty_response(url.as_str()))
    } else {
        Ok(body)
    }
}
