//! HTTP-backed [`CatalogSource`].

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};

use super::models::{ChapterListing, ChapterManifest, format_chapter_number, parse_chapter_listing};
use super::CatalogSource;
use crate::fetch::constants::{
    IMAGE_ATTEMPTS, LISTING_ATTEMPTS, MANIFEST_ATTEMPTS, SERIES_METADATA_ATTEMPTS,
};
use crate::fetch::{FetchClient, FetchError, RetryPolicy};

/// Catalog client issuing requests through a shared [`FetchClient`].
#[derive(Debug, Clone)]
pub struct CatalogClient {
    fetch: FetchClient,
    api_base: String,
}

impl CatalogClient {
    /// Creates a client for the API rooted at `api_base`.
    #[must_use]
    pub fn new(fetch: FetchClient, api_base: impl Into<String>) -> Self {
        let api_base = api_base.into().trim_end_matches('/').to_string();
        Self { fetch, api_base }
    }

    fn series_url(&self, slug: &str) -> String {
        format!("{}/{}", self.api_base, slug.trim_matches('/'))
    }
}

#[async_trait]
impl CatalogSource for CatalogClient {
    #[instrument(skip(self))]
    async fn chapter_listing(&self, slug: &str) -> Result<Vec<ChapterListing>, FetchError> {
        let url = format!("{}/chapters", self.series_url(slug));
        let body = self
            .fetch
            .fetch_json(&url, &[], RetryPolicy::with_max_attempts(LISTING_ATTEMPTS))
            .await?;
        let listing = parse_chapter_listing(&body);
        debug!(entries = listing.len(), "parsed chapter listing");
        Ok(listing)
    }

    #[instrument(skip(self))]
    async fn series_metadata(&self, slug: &str) -> Result<Value, FetchError> {
        self.fetch
            .fetch_json(
                &self.series_url(slug),
                &[],
                RetryPolicy::with_max_attempts(SERIES_METADATA_ATTEMPTS),
            )
            .await
    }

    #[instrument(skip(self))]
    async fn chapter_manifest(
        &self,
        slug: &str,
        number: f64,
        volume: u32,
    ) -> Result<ChapterManifest, FetchError> {
        let url = format!("{}/chapter", self.series_url(slug));
        let params = [
            ("number", format_chapter_number(number)),
            ("volume", volume.to_string()),
        ];
        let body = self
            .fetch
            .fetch_json(&url, &params, RetryPolicy::with_max_attempts(MANIFEST_ATTEMPTS))
            .await?;
        Ok(ChapterManifest::from_response(number, volume, &body))
    }

    async fn image(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.fetch
            .fetch_image(url, RetryPolicy::with_max_attempts(IMAGE_ATTEMPTS))
            .await
    }
}
