//! Retrieval configuration shared by every component of a run.
//!
//! [`RetrievalConfig`] is built once (from CLI flags, a config file, or
//! defaults), validated, and then only read. Fields are public so the
//! input layer can fill them in directly.

use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::fetch::FetchSettings;
use crate::fetch::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};

/// Default number of chapters retrieved at once.
pub const DEFAULT_CHAPTER_CONCURRENCY: usize = 2;

/// Default number of images downloaded at once within one chapter.
pub const DEFAULT_IMAGE_CONCURRENCY: usize = 3;

/// Default pause after each successful metadata response.
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_secs(2);

/// Default volumes probed when nothing else resolves a chapter's volume.
pub const DEFAULT_FALLBACK_VOLUMES: (u32, u32) = (1, 15);

/// Default catalog API base.
pub const DEFAULT_API_BASE: &str = "https://api.lib.social/api/manga";

/// Default image host base for host-relative page paths.
pub const DEFAULT_IMAGE_HOST: &str = "https://img33.imgslib.link";

/// Default referer presented to the image host.
pub const DEFAULT_REFERER: &str = "https://mangalib.me/";

/// Default output directory.
pub const DEFAULT_OUTPUT_DIR: &str = "downloads";

/// Largest concurrency bound accepted for either gate.
pub const MAX_CONCURRENCY: usize = 64;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The series slug is blank.
    #[error("series slug must not be empty")]
    EmptySlug,

    /// The chapter range is inverted.
    #[error("invalid chapter range {start}..={end}: start must not exceed end")]
    InvalidChapterRange {
        /// First requested chapter.
        start: u32,
        /// Last requested chapter.
        end: u32,
    },

    /// A concurrency bound is outside 1..=MAX_CONCURRENCY.
    #[error("invalid {name} value {value}: must be between 1 and {MAX_CONCURRENCY}")]
    InvalidConcurrency {
        /// Which bound.
        name: &'static str,
        /// The rejected value.
        value: usize,
    },

    /// The fallback volume range is inverted.
    #[error("invalid fallback volume range {lo}..={hi}: lo must not exceed hi")]
    InvalidFallbackRange {
        /// Lower bound.
        lo: u32,
        /// Upper bound.
        hi: u32,
    },

    /// A base URL or the referer does not parse as an absolute URL.
    #[error("invalid {name} URL: {value}")]
    InvalidUrl {
        /// Which field.
        name: &'static str,
        /// The rejected value.
        value: String,
    },
}

/// Immutable configuration for one retrieval run.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalConfig {
    /// Series identifier used in API paths.
    pub slug: String,
    /// First chapter (inclusive).
    pub start: u32,
    /// Last chapter (inclusive).
    pub end: u32,
    /// Display title overriding the catalog's series name.
    pub title_override: Option<String>,
    /// Volume forced for every chapter, bypassing resolution.
    pub forced_volume: Option<u32>,
    /// Root directory for archives.
    pub output_dir: PathBuf,
    /// Maximum chapters in flight.
    pub chapter_concurrency: usize,
    /// Maximum images in flight per chapter.
    pub image_concurrency: usize,
    /// Pause after each successful metadata response.
    pub request_delay: Duration,
    /// Volumes probed in ascending order as the last resolution strategy.
    pub fallback_volumes: (u32, u32),
    /// Remove per-chapter staging directories when done.
    pub cleanup_temp: bool,
    /// Place archives under a per-volume sub-directory.
    pub group_by_volume: bool,
    /// Catalog API base, without trailing slash.
    pub api_base: String,
    /// Base for host-relative image paths.
    pub image_host: String,
    /// Referer presented to the image host.
    pub referer: String,
    /// HTTP connect timeout.
    pub connect_timeout: Duration,
    /// HTTP whole-request timeout.
    pub read_timeout: Duration,
}

impl RetrievalConfig {
    /// Creates a configuration for `slug` chapters `start..=end` with defaults elsewhere.
    #[must_use]
    pub fn new(slug: impl Into<String>, start: u32, end: u32) -> Self {
        Self {
            slug: slug.into(),
            start,
            end,
            title_override: None,
            forced_volume: None,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            chapter_concurrency: DEFAULT_CHAPTER_CONCURRENCY,
            image_concurrency: DEFAULT_IMAGE_CONCURRENCY,
            request_delay: DEFAULT_REQUEST_DELAY,
            fallback_volumes: DEFAULT_FALLBACK_VOLUMES,
            cleanup_temp: true,
            group_by_volume: false,
            api_base: DEFAULT_API_BASE.to_string(),
            image_host: DEFAULT_IMAGE_HOST.to_string(),
            referer: DEFAULT_REFERER.to_string(),
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(READ_TIMEOUT_SECS),
        }
    }

    /// Checks every invariant the pipeline relies on.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint as a [`ConfigError`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.slug.trim().is_empty() {
            return Err(ConfigError::EmptySlug);
        }
        if self.start > self.end {
            return Err(ConfigError::InvalidChapterRange {
                start: self.start,
                end: self.end,
            });
        }
        validate_concurrency("chapter_concurrency", self.chapter_concurrency)?;
        validate_concurrency("image_concurrency", self.image_concurrency)?;

        let (lo, hi) = self.fallback_volumes;
        if lo > hi {
            return Err(ConfigError::InvalidFallbackRange { lo, hi });
        }

        validate_url("api_base", &self.api_base)?;
        validate_url("image_host", &self.image_host)?;
        validate_url("referer", &self.referer)?;
        Ok(())
    }

    /// Chapter numbers in the requested range, ascending.
    #[must_use]
    pub fn chapters(&self) -> RangeInclusive<u32> {
        self.start..=self.end
    }

    /// Settings for the shared fetch client.
    #[must_use]
    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            referer: self.referer.clone(),
            request_delay: self.request_delay,
            connect_timeout: self.connect_timeout,
            read_timeout: self.read_timeout,
        }
    }
}

fn validate_concurrency(name: &'static str, value: usize) -> Result<(), ConfigError> {
    if (1..=MAX_CONCURRENCY).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidConcurrency { name, value })
    }
}

fn validate_url(name: &'static str, value: &str) -> Result<(), ConfigError> {
    match Url::parse(value) {
        Ok(url) if url.has_host() => Ok(()),
        _ => Err(ConfigError::InvalidUrl {
            name,
            value: value.to_string(),
        }),
    }
}
