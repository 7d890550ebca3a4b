//! Single-chapter retrieval.
//!
//! [`ChapterRetriever::retrieve`] runs the whole pipeline for one chapter:
//!
//! 1. resolve the volume
//! 2. fetch the manifest (reusing the one fetched during resolution, if any)
//! 3. reject manifests without pages or without usable image URLs
//! 4. download all pages into a [`TemporaryWorkspace`], at most
//!    `image_concurrency` at a time
//! 5. hand the workspace to the [`Archiver`] on a blocking thread
//!
//! Every failure is converted into a [`RetrievalOutcome::Failed`] at this
//! boundary; nothing propagates to sibling chapters.

mod error;
mod urls;
mod workspace;

pub use error::ChapterError;
pub use urls::{DEFAULT_IMAGE_EXTENSION, derive_image_url, image_extension, page_file_name};
pub use workspace::{TemporaryWorkspace, WORKSPACE_ROOT, remove_workspace_root};

use std::path::PathBuf;
use std::sync::Arc;

use futures_util::{StreamExt, TryStreamExt, stream};
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

use crate::archive::Archiver;
use crate::catalog::{CatalogSource, ChapterManifest, series_title};
use crate::config::RetrievalConfig;
use crate::volume::VolumeResolver;

/// Result of one chapter run.
#[derive(Debug)]
pub enum RetrievalOutcome {
    /// Archive written.
    Completed { chapter: f64, path: PathBuf },
    /// Chapter abandoned.
    Failed { chapter: f64, error: ChapterError },
}

impl RetrievalOutcome {
    /// Chapter number this outcome belongs to.
    #[must_use]
    pub fn chapter(&self) -> f64 {
        match self {
            Self::Completed { chapter, .. } | Self::Failed { chapter, .. } => *chapter,
        }
    }

    /// Archive path on success.
    #[must_use]
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Completed { path, .. } => Some(path),
            Self::Failed { .. } => None,
        }
    }

    /// Whether an archive was written.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Retrieves and archives chapters of one series.
pub struct ChapterRetriever {
    catalog: Arc<dyn CatalogSource>,
    resolver: Arc<VolumeResolver>,
    archiver: Archiver,
    title_override: Option<String>,
    image_host: String,
    output_dir: PathBuf,
    image_concurrency: usize,
    cleanup: bool,
    title: OnceCell<String>,
}

impl std::fmt::Debug for ChapterRetriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChapterRetriever")
            .field("slug", &self.resolver.slug())
            .field("image_host", &self.image_host)
            .field("output_dir", &self.output_dir)
            .field("image_concurrency", &self.image_concurrency)
            .field("cleanup", &self.cleanup)
            .finish_non_exhaustive()
    }
}

impl ChapterRetriever {
    /// Creates a retriever sharing `resolver`'s caches.
    #[must_use]
    pub fn new(
        config: &RetrievalConfig,
        catalog: Arc<dyn CatalogSource>,
        resolver: Arc<VolumeResolver>,
    ) -> Self {
        Self {
            catalog,
            resolver,
            archiver: Archiver::new(&config.output_dir, config.group_by_volume),
            title_override: config
                .title_override
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
            image_host: config.image_host.clone(),
            output_dir: config.output_dir.clone(),
            image_concurrency: config.image_concurrency.max(1),
            cleanup: config.cleanup_temp,
            title: OnceCell::new(),
        }
    }

    /// The shared volume resolver.
    #[must_use]
    pub fn resolver(&self) -> &Arc<VolumeResolver> {
        &self.resolver
    }

    /// Removes the shared workspace root once it is empty; no-op when workspaces are kept.
    pub async fn remove_workspace_root(&self) {
        if self.cleanup {
            remove_workspace_root(&self.output_dir).await;
        }
    }

    /// Retrieves `number`, returning the archive path or `None` on failure.
    pub async fn retrieve(&self, number: f64) -> Option<PathBuf> {
        match self.retrieve_outcome(number).await {
            RetrievalOutcome::Completed { path, .. } => Some(path),
            RetrievalOutcome::Failed { .. } => None,
        }
    }

    /// Retrieves `number`, keeping the failure reason.
    #[instrument(skip(self), fields(slug = %self.resolver.slug()))]
    pub async fn retrieve_outcome(&self, number: f64) -> RetrievalOutcome {
        match self.run(number).await {
            Ok(path) => {
                info!(path = %path.display(), "chapter archived");
                RetrievalOutcome::Completed {
                    chapter: number,
                    path,
                }
            }
            Err(error) => {
                warn!(error = %error, "chapter failed");
                RetrievalOutcome::Failed {
                    chapter: number,
                    error,
                }
            }
        }
    }

    /// Series display title: the override, else metadata, else the slug.
    pub async fn series_title(&self) -> String {
        if let Some(title) = &self.title_override {
            return title.clone();
        }
        self.title
            .get_or_init(|| async {
                match self.resolver.series_metadata().await {
                    Ok(metadata) => {
                        series_title(&metadata).unwrap_or_else(|| self.resolver.slug().to_string())
                    }
                    Err(error) => {
                        warn!(error = %error, "series title unavailable, using slug");
                        self.resolver.slug().to_string()
                    }
                }
            })
            .await
            .clone()
    }

    async fn run(&self, number: f64) -> Result<PathBuf, ChapterError> {
        let resolution = self.resolver.resolve_with_manifest(number).await?;
        let volume = resolution.volume;
        let manifest = match resolution.manifest {
            Some(manifest) => manifest,
            None => self
                .catalog
                .chapter_manifest(self.resolver.slug(), number, volume)
                .await
                .map_err(|source| ChapterError::Manifest {
                    chapter: number,
                    volume,
                    source,
                })?,
        };

        if manifest.page_count == 0 {
            return Err(ChapterError::EmptyChapter { chapter: number });
        }
        let urls: Vec<String> = manifest
            .pages
            .iter()
            .filter_map(|path| derive_image_url(path, &self.image_host))
            .collect();
        if urls.is_empty() {
            return Err(ChapterError::NoValidImages { chapter: number });
        }

        let title = self.series_title().await;
        debug!(volume, pages = urls.len(), title = %title, "downloading pages");

        let workspace = TemporaryWorkspace::create(&self.output_dir, number, self.cleanup)
            .await
            .map_err(|e| ChapterError::workspace(self.output_dir.join(WORKSPACE_ROOT), e))?;

        let result = match self.stage_pages(&workspace, urls).await {
            Ok(()) => self.archive(&workspace, manifest, title).await,
            Err(error) => Err(error),
        };
        workspace.close().await;
        result
    }

    /// Downloads every page into `workspace`, at most `image_concurrency` at a time.
    async fn stage_pages(
        &self,
        workspace: &TemporaryWorkspace,
        urls: Vec<String>,
    ) -> Result<(), ChapterError> {
        stream::iter(urls.into_iter().enumerate())
            .map(|(index, url)| async move { self.download_page(workspace, index, &url).await })
            .buffer_unordered(self.image_concurrency)
            .try_collect::<Vec<()>>()
            .await?;
        Ok(())
    }

    async fn download_page(
        &self,
        workspace: &TemporaryWorkspace,
        index: usize,
        url: &str,
    ) -> Result<(), ChapterError> {
        let bytes = self
            .catalog
            .image(url)
            .await
            .map_err(|source| ChapterError::Image {
                page: index + 1,
                url: url.to_string(),
                source,
            })?;
        let file_name = page_file_name(index, &image_extension(url));
        workspace
            .write(&file_name, &bytes)
            .await
            .map_err(|e| ChapterError::workspace(workspace.path().join(&file_name), e))?;
        debug!(page = index + 1, bytes = bytes.len(), "page staged");
        Ok(())
    }

    async fn archive(
        &self,
        workspace: &TemporaryWorkspace,
        manifest: ChapterManifest,
        title: String,
    ) -> Result<PathBuf, ChapterError> {
        let archiver = self.archiver.clone();
        let dir = workspace.path().to_path_buf();
        let path = tokio::task::spawn_blocking(move || archiver.archive(&dir, &manifest, &title))
            .await
            .map_err(|e| ChapterError::TaskJoin(e.to_string()))??;
        Ok(path)
    }
}
