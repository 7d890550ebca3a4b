//! Volume resolution for chapter numbers.
//!
//! The catalog addresses a chapter manifest by `(number, volume)`, but callers
//! only know the chapter number. [`VolumeResolver`] tries strategies in a
//! fixed order and returns the first that succeeds:
//!
//! 1. the forced volume from configuration
//! 2. the [`VolumeIndex`] built from the chapter listing (exact match)
//! 3. a depth-first search of the series metadata, each candidate confirmed
//!    by fetching its manifest
//! 4. an ascending probe of the configured fallback volume range
//!
//! The index and the metadata document are fetched at most once per resolver
//! and shared read-only by every chapter task afterwards.

mod index;
mod search;

pub use index::VolumeIndex;
pub use search::{MAX_SEARCH_DEPTH, volume_candidates};

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

use crate::catalog::{CatalogSource, ChapterManifest};
use crate::fetch::{FailureType, FetchError, classify_error};

/// Pause before each fallback probe.
pub const PROBE_DELAY: Duration = Duration::from_millis(120);

/// Every resolution strategy failed for a chapter.
#[derive(Debug, Clone, Copy, Error, PartialEq)]
#[error("could not resolve a volume for chapter {chapter}")]
pub struct VolumeUnresolved {
    /// Chapter number that was being resolved.
    pub chapter: f64,
}

/// Which strategy produced a volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    /// Taken from configuration.
    Forced,
    /// Exact match in the chapter listing.
    Index,
    /// Found in series metadata and confirmed by a manifest fetch.
    Metadata,
    /// Found by probing the fallback range.
    Probe,
}

/// A resolved volume, with the manifest fetched while confirming it.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Volume the chapter belongs to.
    pub volume: u32,
    /// Strategy that produced it.
    pub source: ResolutionSource,
    /// Manifest fetched during confirmation; `None` for forced and index hits.
    pub manifest: Option<ChapterManifest>,
}

/// Resolves chapter numbers to volumes for one series.
pub struct VolumeResolver {
    catalog: Arc<dyn CatalogSource>,
    slug: String,
    forced_volume: Option<u32>,
    fallback_volumes: (u32, u32),
    probe_delay: Duration,
    index: OnceCell<Arc<VolumeIndex>>,
    metadata: OnceCell<Arc<Value>>,
}

impl std::fmt::Debug for VolumeResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VolumeResolver")
            .field("slug", &self.slug)
            .field("forced_volume", &self.forced_volume)
            .field("fallback_volumes", &self.fallback_volumes)
            .field("index_cached", &self.index.initialized())
            .field("metadata_cached", &self.metadata.initialized())
            .finish_non_exhaustive()
    }
}

impl VolumeResolver {
    /// Creates a resolver for `slug` probing `fallback_volumes` inclusively.
    #[must_use]
    pub fn new(
        catalog: Arc<dyn CatalogSource>,
        slug: impl Into<String>,
        forced_volume: Option<u32>,
        fallback_volumes: (u32, u32),
    ) -> Self {
        Self {
            catalog,
            slug: slug.into(),
            forced_volume,
            fallback_volumes,
            probe_delay: PROBE_DELAY,
            index: OnceCell::new(),
            metadata: OnceCell::new(),
        }
    }

    /// Overrides the pause before each fallback probe.
    #[must_use]
    pub fn with_probe_delay(mut self, delay: Duration) -> Self {
        self.probe_delay = delay;
        self
    }

    /// Series this resolver serves.
    #[must_use]
    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// Volume applied to every chapter, if configured.
    #[must_use]
    pub fn forced_volume(&self) -> Option<u32> {
        self.forced_volume
    }

    /// Returns the volume for `number`.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeUnresolved`] when no strategy yields a volume.
    pub async fn resolve(&self, number: f64) -> Result<u32, VolumeUnresolved> {
        self.resolve_with_manifest(number)
            .await
            .map(|resolution| resolution.volume)
    }

    /// Like [`resolve`](Self::resolve), keeping any manifest fetched as confirmation.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeUnresolved`] when no strategy yields a volume.
    #[instrument(skip(self), fields(slug = %self.slug))]
    pub async fn resolve_with_manifest(&self, number: f64) -> Result<Resolution, VolumeUnresolved> {
        if let Some(volume) = self.forced_volume {
            debug!(volume, "using forced volume");
            return Ok(Resolution {
                volume,
                source: ResolutionSource::Forced,
                manifest: None,
            });
        }

        match self.volume_index().await {
            Ok(index) => {
                if let Some(volume) = index.get(number) {
                    debug!(volume, "volume index hit");
                    return Ok(Resolution {
                        volume,
                        source: ResolutionSource::Index,
                        manifest: None,
                    });
                }
            }
            Err(error) => warn!(error = %error, "chapter listing unavailable"),
        }

        let mut rejected = Vec::new();
        match self.series_metadata().await {
            Ok(metadata) => {
                for volume in volume_candidates(&metadata, number) {
                    match self.confirm(number, volume).await {
                        Confirmation::Confirmed(manifest) => {
                            info!(volume, "volume found in series metadata");
                            return Ok(Resolution {
                                volume,
                                source: ResolutionSource::Metadata,
                                manifest: Some(manifest),
                            });
                        }
                        Confirmation::Rejected => rejected.push(volume),
                        Confirmation::Unavailable => {}
                    }
                }
            }
            Err(error) => warn!(error = %error, "series metadata unavailable"),
        }

        let (lo, hi) = self.fallback_volumes;
        debug!(lo, hi, "probing fallback volume range");
        for volume in lo..=hi {
            if rejected.contains(&volume) {
                continue;
            }
            tokio::time::sleep(self.probe_delay).await;
            if let Confirmation::Confirmed(manifest) = self.confirm(number, volume).await {
                info!(volume, "volume found by probing");
                return Ok(Resolution {
                    volume,
                    source: ResolutionSource::Probe,
                    manifest: Some(manifest),
                });
            }
        }

        warn!("volume unresolved");
        Err(VolumeUnresolved { chapter: number })
    }

    /// Returns the cached volume index, fetching the listing on first use.
    ///
    /// A failed fetch is not cached; the next caller tries again.
    ///
    /// # Errors
    ///
    /// Returns the listing fetch error.
    pub async fn volume_index(&self) -> Result<Arc<VolumeIndex>, FetchError> {
        self.index
            .get_or_try_init(|| async {
                let listing = self.catalog.chapter_listing(&self.slug).await?;
                let index = VolumeIndex::from_listing(&listing);
                info!(chapters = index.len(), "volume index loaded");
                Ok(Arc::new(index))
            })
            .await
            .cloned()
    }

    /// Returns the cached series metadata, fetching it on first use.
    ///
    /// # Errors
    ///
    /// Returns the metadata fetch error.
    pub async fn series_metadata(&self) -> Result<Arc<Value>, FetchError> {
        self.metadata
            .get_or_try_init(|| async {
                self.catalog
                    .series_metadata(&self.slug)
                    .await
                    .map(Arc::new)
            })
            .await
            .cloned()
    }

    async fn confirm(&self, number: f64, volume: u32) -> Confirmation {
        match self.catalog.chapter_manifest(&self.slug, number, volume).await {
            Ok(manifest) if manifest.contradicts_request() => {
                debug!(volume, reported = ?manifest.reported_number, "manifest reports another chapter");
                Confirmation::Rejected
            }
            Ok(manifest) => Confirmation::Confirmed(manifest),
            Err(error) if is_definitive_miss(&error) => {
                debug!(volume, error = %error, "no manifest at volume");
                Confirmation::Rejected
            }
            Err(error) => {
                debug!(volume, error = %error, "manifest unavailable at volume");
                Confirmation::Unavailable
            }
        }
    }
}

/// Result of fetching a manifest to confirm a candidate volume.
enum Confirmation {
    Confirmed(ChapterManifest),
    /// The catalog answered: this volume does not hold the chapter.
    Rejected,
    /// No answer (exhausted retries); the volume may still be right.
    Unavailable,
}

fn is_definitive_miss(error: &FetchError) -> bool {
    !matches!(error, FetchError::RetriesExhausted { .. })
        && classify_error(error) == FailureType::Permanent
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::catalog::ChapterListing;

    #[derive(Default)]
    struct FakeCatalog {
        listing: Option<Vec<ChapterListing>>,
        metadata: Option<Value>,
        /// `(chapter, volume, reported number)` triples that have a manifest.
        manifests: Vec<(f64, u32, Option<f64>)>,
        listing_calls: AtomicUsize,
        metadata_calls: AtomicUsize,
        manifest_calls: Mutex<Vec<u32>>,
        /// Leading manifest calls answered with exhausted 503 retries.
        unavailable_manifests: AtomicUsize,
    }

    fn not_found(url: &str) -> FetchError {
        FetchError::http_status(url, 404)
    }

    #[async_trait]
    impl CatalogSource for FakeCatalog {
        async fn chapter_listing(&self, _slug: &str) -> Result<Vec<ChapterListing>, FetchError> {
            self.listing_calls.fetch_add(1, Ordering::SeqCst);
            self.listing.clone().ok_or_else(|| not_found("listing"))
        }

        async fn series_metadata(&self, _slug: &str) -> Result<Value, FetchError> {
            self.metadata_calls.fetch_add(1, Ordering::SeqCst);
            self.metadata.clone().ok_or_else(|| not_found("metadata"))
        }

        async fn chapter_manifest(
            &self,
            _slug: &str,
            number: f64,
            volume: u32,
        ) -> Result<ChapterManifest, FetchError> {
            self.manifest_calls.lock().unwrap().push(volume);
            if self
                .unavailable_manifests
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(FetchError::exhausted(
                    "manifest",
                    4,
                    FetchError::http_status("manifest", 503),
                ));
            }
            self.manifests
                .iter()
                .find(|(n, v, _)| *n == number && *v == volume)
                .map(|&(_, _, reported)| {
                    let body = reported.map_or_else(|| json!({"pages": []}), |r| json!({"number": r}));
                    ChapterManifest::from_response(number, volume, &body)
                })
                .ok_or_else(|| not_found("manifest"))
        }

        async fn image(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            Err(not_found(url))
        }
    }

    fn resolver(catalog: &Arc<FakeCatalog>, forced: Option<u32>, range: (u32, u32)) -> VolumeResolver {
        let source: Arc<dyn CatalogSource> = catalog.clone();
        VolumeResolver::new(source, "series", forced, range).with_probe_delay(Duration::ZERO)
    }

    // ==================== Strategy Order ====================

    #[tokio::test]
    async fn test_forced_volume_short_circuits() {
        let catalog = Arc::new(FakeCatalog::default());
        let resolver = resolver(&catalog, Some(7), (1, 15));

        let resolution = resolver.resolve_with_manifest(54.0).await.unwrap();
        assert_eq!(resolution.volume, 7);
        assert_eq!(resolution.source, ResolutionSource::Forced);
        assert_eq!(catalog.listing_calls.load(Ordering::SeqCst), 0);
        assert!(catalog.manifest_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_index_hit_skips_metadata_and_probing() {
        let catalog = Arc::new(FakeCatalog {
            listing: Some(vec![ChapterListing {
                number: 12.0,
                volume: 3,
            }]),
            metadata: Some(json!({})),
            ..FakeCatalog::default()
        });
        let resolver = resolver(&catalog, None, (1, 15));

        assert_eq!(resolver.resolve(12.0).await.unwrap(), 3);
        assert_eq!(resolver.resolve(12.0).await.unwrap(), 3);
        assert_eq!(catalog.listing_calls.load(Ordering::SeqCst), 1);
        assert_eq!(catalog.metadata_calls.load(Ordering::SeqCst), 0);
        assert!(catalog.manifest_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_metadata_candidate_confirmed_by_manifest() {
        let catalog = Arc::new(FakeCatalog {
            listing: Some(Vec::new()),
            metadata: Some(json!({"data": {"chapters": [
                {"number": 40, "volume": 2},
                {"number": 40, "volume": 4}
            ]}})),
            manifests: vec![(40.0, 4, None)],
            ..FakeCatalog::default()
        });
        let resolver = resolver(&catalog, None, (1, 15));

        let resolution = resolver.resolve_with_manifest(40.0).await.unwrap();
        assert_eq!(resolution.volume, 4);
        assert_eq!(resolution.source, ResolutionSource::Metadata);
        assert!(resolution.manifest.is_some());
        assert_eq!(*catalog.manifest_calls.lock().unwrap(), vec![2, 4]);
    }

    #[tokio::test]
    async fn test_probe_ascends_from_low_bound() {
        let catalog = Arc::new(FakeCatalog {
            manifests: vec![(9.0, 5, None)],
            ..FakeCatalog::default()
        });
        let resolver = resolver(&catalog, None, (2, 8));

        let resolution = resolver.resolve_with_manifest(9.0).await.unwrap();
        assert_eq!(resolution.volume, 5);
        assert_eq!(resolution.source, ResolutionSource::Probe);
        assert_eq!(*catalog.manifest_calls.lock().unwrap(), vec![2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_probe_skips_volumes_rejected_during_metadata_search() {
        let catalog = Arc::new(FakeCatalog {
            metadata: Some(json!([{"number": 9, "volume": 1}])),
            manifests: vec![(9.0, 2, None)],
            ..FakeCatalog::default()
        });
        let resolver = resolver(&catalog, None, (1, 3));

        assert_eq!(resolver.resolve(9.0).await.unwrap(), 2);
        assert_eq!(*catalog.manifest_calls.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_fallback_retries_volume_unavailable_during_metadata_search() {
        let catalog = Arc::new(FakeCatalog {
            metadata: Some(json!([{"number": 9, "volume": 1}])),
            manifests: vec![(9.0, 1, None)],
            unavailable_manifests: AtomicUsize::new(1),
            ..FakeCatalog::default()
        });
        let resolver = resolver(&catalog, None, (1, 1));

        let resolution = resolver.resolve_with_manifest(9.0).await.unwrap();
        assert_eq!(resolution.volume, 1);
        assert_eq!(resolution.source, ResolutionSource::Probe);
        assert_eq!(*catalog.manifest_calls.lock().unwrap(), vec![1, 1]);
    }

    // ==================== Failure ====================

    #[tokio::test]
    async fn test_unresolved_after_exhausting_range() {
        let catalog = Arc::new(FakeCatalog::default());
        let resolver = resolver(&catalog, None, (1, 3));

        let error = resolver.resolve(99.0).await.unwrap_err();
        assert_eq!(error, VolumeUnresolved { chapter: 99.0 });
        assert_eq!(*catalog.manifest_calls.lock().unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_contradicting_manifest_is_rejected() {
        let catalog = Arc::new(FakeCatalog {
            manifests: vec![(9.0, 1, Some(8.0)), (9.0, 2, Some(9.0))],
            ..FakeCatalog::default()
        });
        let resolver = resolver(&catalog, None, (1, 3));

        assert_eq!(resolver.resolve(9.0).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_failed_listing_is_retried_by_next_caller() {
        let catalog = Arc::new(FakeCatalog::default());
        let resolver = resolver(&catalog, None, (1, 1));

        assert!(resolver.volume_index().await.is_err());
        assert!(resolver.volume_index().await.is_err());
        assert_eq!(catalog.listing_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unresolved_message() {
        let error = VolumeUnresolved { chapter: 12.5 };
        assert_eq!(error.to_string(), "could not resolve a volume for chapter 12.5");
    }
}
