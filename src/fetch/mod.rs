//! Rate-limited fetching of catalog metadata and image bytes.
//!
//! # Features
//!
//! - One shared connection pool and cookie store per run
//! - Retry-After aware backoff on HTTP 429
//! - Session warm-up on HTTP 403 for images
//! - Fixed throttle after every successful metadata response
//! - Empty image bodies treated as transient failures
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use chapter_downloader_core::fetch::{FetchClient, FetchSettings, RetryPolicy};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = FetchClient::new(&FetchSettings::new("https://reader.example/", Duration::from_secs(2)))?;
//! let series = client
//!     .fetch_json("https://api.example.com/manga/some-slug", &[], RetryPolicy::with_max_attempts(3))
//!     .await?;
//! println!("{series}");
//! # Ok(())
//! # }
//! ```

mod client;
pub mod constants;
mod error;
mod retry;

pub use client::{FetchClient, FetchSettings, FetchedBody};
pub use error::FetchError;
pub use retry::{
    FailureType, ResponseKind, RetryDecision, RetryPolicy, classify_error, forbidden_delay,
    parse_retry_after, rate_limit_delay, transient_delay,
};
