//! Batch retrieval across a chapter range.
//!
//! [`BatchScheduler`] runs one [`ChapterRetriever`] task per chapter, at most
//! `chapter_concurrency` at a time. A semaphore permit is acquired before each
//! task is spawned and released when it finishes. Task failures, panics
//! included, become failed outcomes; the batch always waits for every
//! chapter before reporting.
//!
//! # Example
//!
//! ```no_run
//! use chapter_downloader_core::{BatchScheduler, RetrievalConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RetrievalConfig::new("114307--kaoru-hana-wa-rin-to-saku", 54, 60);
//! let scheduler = BatchScheduler::from_config(&config)?;
//! let report = scheduler.retrieve_range(&config).await;
//! println!("Succeeded: {}, Failed: {}", report.succeeded(), report.failed());
//! # Ok(())
//! # }
//! ```

use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;

use futures_util::FutureExt;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use crate::catalog::{CatalogClient, CatalogSource};
use crate::chapter::{ChapterError, ChapterRetriever, RetrievalOutcome};
use crate::config::{ConfigError, RetrievalConfig};
use crate::fetch::{FetchClient, FetchError};
use crate::volume::VolumeResolver;

/// Errors that prevent a batch from starting.
#[derive(Debug, Error)]
pub enum BatchError {
    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] FetchError),
}

/// Per-chapter outcomes of a finished batch, ordered by chapter number.
#[derive(Debug, Default)]
pub struct BatchReport {
    outcomes: Vec<RetrievalOutcome>,
}

impl BatchReport {
    /// Builds a report, sorting outcomes by chapter.
    #[must_use]
    pub fn new(mut outcomes: Vec<RetrievalOutcome>) -> Self {
        outcomes.sort_by(|a, b| a.chapter().total_cmp(&b.chapter()));
        Self { outcomes }
    }

    /// Number of chapters archived.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// Number of chapters that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    /// Number of chapters attempted.
    #[must_use]
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Archive paths of successful chapters, in chapter order.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.outcomes
            .iter()
            .filter_map(|o| o.path().cloned())
            .collect()
    }

    /// All outcomes, in chapter order.
    #[must_use]
    pub fn outcomes(&self) -> &[RetrievalOutcome] {
        &self.outcomes
    }

    /// Chapter numbers that failed, in chapter order.
    #[must_use]
    pub fn failed_chapters(&self) -> Vec<f64> {
        self.outcomes
            .iter()
            .filter(|o| !o.is_success())
            .map(RetrievalOutcome::chapter)
            .collect()
    }
}

/// Runs chapter retrievals under the chapter-level concurrency bound.
#[derive(Debug, Clone)]
pub struct BatchScheduler {
    retriever: Arc<ChapterRetriever>,
    semaphore: Arc<Semaphore>,
    concurrency: usize,
}

impl BatchScheduler {
    /// Creates a scheduler over `retriever`.
    #[must_use]
    pub fn new(retriever: Arc<ChapterRetriever>, chapter_concurrency: usize) -> Self {
        let concurrency = chapter_concurrency.max(1);
        Self {
            retriever,
            semaphore: Arc::new(Semaphore::new(concurrency)),
            concurrency,
        }
    }

    /// Validates `config` and wires the HTTP client, catalog, resolver and retriever.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError`] if the configuration is invalid or the HTTP
    /// client cannot be built.
    #[instrument(skip(config), fields(slug = %config.slug))]
    pub fn from_config(config: &RetrievalConfig) -> Result<Self, BatchError> {
        config.validate()?;
        let fetch = FetchClient::new(&config.fetch_settings())?;
        let catalog: Arc<dyn CatalogSource> =
            Arc::new(CatalogClient::new(fetch, config.api_base.clone()));
        let resolver = Arc::new(VolumeResolver::new(
            Arc::clone(&catalog),
            config.slug.clone(),
            config.forced_volume,
            config.fallback_volumes,
        ));
        let retriever = Arc::new(ChapterRetriever::new(config, catalog, resolver));
        Ok(Self::new(retriever, config.chapter_concurrency))
    }

    /// Maximum chapters in flight.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Retrieves every chapter in `config`'s inclusive range.
    pub async fn retrieve_range(&self, config: &RetrievalConfig) -> BatchReport {
        self.retrieve_all(config.chapters().map(f64::from)).await
    }

    /// Retrieves every chapter in `chapters` and waits for all of them.
    #[instrument(skip(self, chapters), fields(concurrency = self.concurrency))]
    pub async fn retrieve_all(&self, chapters: impl IntoIterator<Item = f64>) -> BatchReport {
        self.prewarm().await;

        let mut tasks = JoinSet::new();
        let mut requested = Vec::new();
        let mut outcomes = Vec::new();

        info!("starting batch");

        for chapter in chapters {
            let Ok(permit) = Arc::clone(&self.semaphore).acquire_owned().await else {
                outcomes.push(aborted(chapter, "semaphore closed"));
                continue;
            };

            let retriever = Arc::clone(&self.retriever);
            tasks.spawn(async move {
                let _permit = permit;
                match AssertUnwindSafe(retriever.retrieve_outcome(chapter))
                    .catch_unwind()
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        warn!(chapter, "chapter task panicked");
                        aborted(chapter, "panicked")
                    }
                }
            });
            requested.push(chapter);
            debug!(chapter, "chapter task spawned");
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(error) => warn!(error = %error, "chapter task did not complete"),
            }
        }
        // Tasks lost to cancellation still get an outcome.
        for chapter in requested {
            if !outcomes.iter().any(|o| o.chapter().total_cmp(&chapter).is_eq()) {
                outcomes.push(aborted(chapter, "cancelled"));
            }
        }
        self.retriever.remove_workspace_root().await;

        let report = BatchReport::new(outcomes);
        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            total = report.total(),
            "batch complete"
        );
        report
    }

    /// Loads the volume index once for the whole batch; failures only log.
    async fn prewarm(&self) {
        let resolver = self.retriever.resolver();
        if resolver.forced_volume().is_some() {
            return;
        }
        if let Err(error) = resolver.volume_index().await {
            warn!(error = %error, "volume index pre-warm failed, continuing");
        }
    }
}

fn aborted(chapter: f64, reason: &str) -> RetrievalOutcome {
    RetrievalOutcome::Failed {
        chapter,
        error: ChapterError::TaskJoin(reason.to_string()),
    }
}
