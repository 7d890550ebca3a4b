//! Catalog API and image host access.
//!
//! # Architecture
//!
//! - [`CatalogSource`] - Async trait the resolver and orchestrator consume
//! - [`CatalogClient`] - HTTP implementation over the shared [`FetchClient`](crate::fetch::FetchClient)
//! - [`ChapterManifest`] / [`ChapterListing`] - Tolerantly parsed responses
//!
//! Endpoints consumed:
//!
//! ```text
//! GET {api_base}/{slug}/chapters                    chapter -> volume listing
//! GET {api_base}/{slug}                             series metadata
//! GET {api_base}/{slug}/chapter?number=N&volume=V   chapter manifest
//! GET {image url}                                   page bytes
//! ```

mod client;
mod models;

pub use client::CatalogClient;
pub use models::{
    ChapterListing, ChapterManifest, as_f64, as_volume, chapter_numbers_equal,
    format_chapter_number, pad_chapter_number, parse_chapter_listing, series_title, unwrap_data,
};

use async_trait::async_trait;
use serde_json::Value;

use crate::fetch::FetchError;

/// Remote operations the retrieval pipeline depends on.
///
/// Implementations must be safe to call concurrently from many chapter tasks.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetches the series' chapter -> volume listing.
    async fn chapter_listing(&self, slug: &str) -> Result<Vec<ChapterListing>, FetchError>;

    /// Fetches the series metadata document.
    async fn series_metadata(&self, slug: &str) -> Result<Value, FetchError>;

    /// Fetches one chapter's manifest at a specific volume.
    async fn chapter_manifest(
        &self,
        slug: &str,
        number: f64,
        volume: u32,
    ) -> Result<ChapterManifest, FetchError>;

    /// Downloads one page image.
    async fn image(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}
