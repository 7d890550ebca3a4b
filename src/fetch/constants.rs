//! Constants for the fetch module (timeouts, retry budgets, backoff caps).

use std::time::Duration;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (2 minutes; images are small but hosts can be slow).
pub const READ_TIMEOUT_SECS: u64 = 120;

/// Attempt budget for the chapter listing used to build the volume index.
pub const LISTING_ATTEMPTS: u32 = 4;

/// Attempt budget for series metadata.
pub const SERIES_METADATA_ATTEMPTS: u32 = 3;

/// Attempt budget for a chapter manifest.
pub const MANIFEST_ATTEMPTS: u32 = 4;

/// Attempt budget for a single image.
pub const IMAGE_ATTEMPTS: u32 = 10;

/// Cap on the exponential part of the rate-limit backoff.
pub const MAX_RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(60);

/// Maximum Retry-After value honoured (1 hour).
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(3600);
