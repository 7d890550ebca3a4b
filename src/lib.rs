//! Chapter Downloader Core Library
//!
//! This library retrieves a numbered range of chapters of one series from a
//! catalog API and image host, and packages each chapter into a CBZ archive
//! with embedded metadata.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`fetch`] - Rate-limited HTTP client with retry and backoff
//! - [`catalog`] - Catalog endpoints and tolerant response parsing
//! - [`volume`] - Chapter to volume resolution with cached index and fallbacks
//! - [`chapter`] - Single-chapter pipeline: manifest, pages, archive
//! - [`archive`] - CBZ assembly and file naming
//! - [`batch`] - Bounded-concurrency scheduling over a chapter range
//! - [`config`] - Validated run configuration

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod archive;
pub mod batch;
pub mod catalog;
pub mod chapter;
pub mod config;
pub mod fetch;
pub mod user_agent;
pub mod volume;

// Re-export commonly used types
pub use archive::{ArchiveError, ArchiveMetadata, Archiver};
pub use batch::{BatchError, BatchReport, BatchScheduler};
pub use catalog::{CatalogClient, CatalogSource, ChapterListing, ChapterManifest};
pub use chapter::{ChapterError, ChapterRetriever, RetrievalOutcome, TemporaryWorkspace};
pub use config::{ConfigError, RetrievalConfig};
pub use fetch::{
    FailureType, FetchClient, FetchError, FetchSettings, ResponseKind, RetryDecision, RetryPolicy,
    classify_error,
};
pub use volume::{Resolution, ResolutionSource, VolumeIndex, VolumeResolver, VolumeUnresolved};
