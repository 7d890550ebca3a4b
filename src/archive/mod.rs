//! CBZ archive assembly.
//!
//! An archive is a deflate-compressed ZIP holding:
//!
//! ```text
//! metadata.json    machine-readable chapter record
//! ComicInfo.xml    comic-reader sidecar
//! 001.jpg          staged pages, in file-name order
//! 002.png
//! ...
//! ```
//!
//! The file is written under a `.cbz.part` name and renamed into place once
//! the container is finished, so readers never observe a truncated archive.

mod metadata;
mod naming;

pub use metadata::{ArchiveMetadata, COMIC_INFO_ENTRY, METADATA_ENTRY, xml_escape};
pub use naming::{
    ARCHIVE_EXTENSION, MAX_FILE_NAME_CHARS, archive_file_name, sanitize_component,
    volume_dir_name,
};

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, instrument};
use zip::CompressionMethod;
use zip::write::{FileOptions, ZipWriter};

use crate::catalog::ChapterManifest;

/// Errors raised while writing an archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Filesystem operation failed.
    #[error("archive I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// ZIP container could not be written.
    #[error("zip write failed: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Metadata record could not be serialized.
    #[error("metadata serialization failed: {0}")]
    Metadata(#[from] serde_json::Error),

    /// The workspace held no page images.
    #[error("no staged images in {path}")]
    EmptyWorkspace { path: PathBuf },
}

impl ArchiveError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Writes chapter archives beneath an output directory.
#[derive(Debug, Clone)]
pub struct Archiver {
    output_dir: PathBuf,
    group_by_volume: bool,
}

impl Archiver {
    /// Creates an archiver rooted at `output_dir`.
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>, group_by_volume: bool) -> Self {
        Self {
            output_dir: output_dir.into(),
            group_by_volume,
        }
    }

    /// Directory an archive for `series` at `volume` is written into.
    #[must_use]
    pub fn target_dir(&self, series: &str, volume: u32) -> PathBuf {
        let dir = self.output_dir.join(sanitize_component(series));
        if self.group_by_volume {
            dir.join(volume_dir_name(volume))
        } else {
            dir
        }
    }

    /// Packages the images staged in `workspace` into a CBZ and returns its path.
    ///
    /// An existing archive with the same name is replaced.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] if the workspace is empty or unreadable, or if
    /// the container cannot be written.
    #[instrument(skip(self, manifest), fields(chapter = manifest.number, volume = manifest.volume))]
    pub fn archive(
        &self,
        workspace: &Path,
        manifest: &ChapterManifest,
        series: &str,
    ) -> Result<PathBuf, ArchiveError> {
        let images = staged_images(workspace)?;
        if images.is_empty() {
            return Err(ArchiveError::EmptyWorkspace {
                path: workspace.to_path_buf(),
            });
        }

        let dir = self.target_dir(series, manifest.volume);
        fs::create_dir_all(&dir).map_err(|e| ArchiveError::io(&dir, e))?;

        let file_name = archive_file_name(manifest.number, &manifest.display_name(), manifest.volume);
        let final_path = dir.join(&file_name);
        let part_path = dir.join(format!("{file_name}.part"));

        let metadata = ArchiveMetadata::new(series, manifest, images.len(), Utc::now());
        if let Err(error) = write_container(&part_path, &metadata, &images) {
            let _ = fs::remove_file(&part_path);
            return Err(error);
        }
        if let Err(error) = fs::rename(&part_path, &final_path) {
            let _ = fs::remove_file(&part_path);
            return Err(ArchiveError::io(&final_path, error));
        }

        info!(path = %final_path.display(), pages = images.len(), "archive written");
        Ok(final_path)
    }
}

/// Page files in `workspace`, sorted by file name.
fn staged_images(workspace: &Path) -> Result<Vec<PathBuf>, ArchiveError> {
    let entries = fs::read_dir(workspace).map_err(|e| ArchiveError::io(workspace, e))?;
    let mut images = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ArchiveError::io(workspace, e))?;
        let path = entry.path();
        let is_hidden = entry.file_name().to_string_lossy().starts_with('.');
        if path.is_file() && !is_hidden {
            images.push(path);
        }
    }
    images.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(images)
}

fn write_container(
    path: &Path,
    metadata: &ArchiveMetadata,
    images: &[PathBuf],
) -> Result<(), ArchiveError> {
    let file = File::create(path).map_err(|e| ArchiveError::io(path, e))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file(METADATA_ENTRY, options)?;
    zip.write_all(&serde_json::to_vec_pretty(metadata)?)
        .map_err(|e| ArchiveError::io(path, e))?;

    zip.start_file(COMIC_INFO_ENTRY, options)?;
    zip.write_all(metadata.comic_info_xml().as_bytes())
        .map_err(|e| ArchiveError::io(path, e))?;

    for image in images {
        let name = image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let bytes = fs::read(image).map_err(|e| ArchiveError::io(image, e))?;
        zip.start_file(name.as_str(), options)?;
        zip.write_all(&bytes).map_err(|e| ArchiveError::io(path, e))?;
        debug!(entry = %name, bytes = bytes.len(), "added page");
    }

    let mut writer = zip.finish()?;
    writer.flush().map_err(|e| ArchiveError::io(path, e))?;
    Ok(())
}
