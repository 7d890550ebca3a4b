//! Chapter-fatal errors.

use std::path::PathBuf;

use thiserror::Error;

use crate::archive::ArchiveError;
use crate::fetch::FetchError;
use crate::volume::VolumeUnresolved;

/// Why one chapter could not be archived.
#[derive(Debug, Error)]
pub enum ChapterError {
    /// No resolution strategy produced a volume.
    #[error(transparent)]
    VolumeUnresolved(#[from] VolumeUnresolved),

    /// The manifest request failed.
    #[error("manifest for chapter {chapter} volume {volume} unavailable: {source}")]
    Manifest {
        chapter: f64,
        volume: u32,
        #[source]
        source: FetchError,
    },

    /// The manifest lists no pages.
    #[error("chapter {chapter} has no pages")]
    EmptyChapter { chapter: f64 },

    /// None of the listed pages produced a usable URL.
    #[error("chapter {chapter} has no valid image URLs")]
    NoValidImages { chapter: f64 },

    /// A page image could not be downloaded.
    #[error("page {page} ({url}) failed: {source}")]
    Image {
        /// One-based page position.
        page: usize,
        url: String,
        #[source]
        source: FetchError,
    },

    /// The staging directory could not be created or written.
    #[error("workspace I/O failed at {path}: {source}")]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Archive assembly failed.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// The chapter task panicked or was cancelled.
    #[error("chapter task aborted: {0}")]
    TaskJoin(String),
}

impl ChapterError {
    /// Creates a workspace error for `path`.
    pub fn workspace(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Workspace {
            path: path.into(),
            source,
        }
    }
}
