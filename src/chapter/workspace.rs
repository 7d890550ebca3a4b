//! Per-chapter staging directory.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, warn};

use crate::catalog::pad_chapter_number;

/// Directory under the output root that holds chapter workspaces.
pub const WORKSPACE_ROOT: &str = ".tmp";

static NEXT_WORKSPACE: AtomicU64 = AtomicU64::new(0);

/// Staging directory owned by one chapter run.
///
/// [`close`](Self::close) removes the directory when cleanup is enabled. A
/// workspace dropped without being closed (a cancelled task) has its removal
/// handed to the blocking pool.
#[derive(Debug)]
pub struct TemporaryWorkspace {
    path: PathBuf,
    cleanup: bool,
}

impl TemporaryWorkspace {
    /// Creates `{output_dir}/.tmp/ch{NNN}-{pid}-{seq}`.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the directory cannot be created.
    pub async fn create(output_dir: &Path, chapter: f64, cleanup: bool) -> std::io::Result<Self> {
        let unique = format!(
            "ch{}-{}-{}",
            pad_chapter_number(chapter, 3),
            std::process::id(),
            NEXT_WORKSPACE.fetch_add(1, Ordering::Relaxed)
        );
        let path = output_dir.join(WORKSPACE_ROOT).join(unique);
        tokio::fs::create_dir_all(&path).await?;
        debug!(path = %path.display(), "workspace created");
        Ok(Self { path, cleanup })
    }

    /// Directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes one staged file.
    ///
    /// # Errors
    ///
    /// Returns the I/O error from the write.
    pub async fn write(&self, file_name: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
        let target = self.path.join(file_name);
        tokio::fs::write(&target, bytes).await?;
        Ok(target)
    }

    /// Removes the directory if cleanup is enabled; failures are logged.
    pub async fn close(mut self) {
        if !self.cleanup {
            debug!(path = %self.path.display(), "keeping workspace");
            return;
        }
        self.cleanup = false;
        match tokio::fs::remove_dir_all(&self.path).await {
            Ok(()) => debug!(path = %self.path.display(), "workspace removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove workspace"),
        }
    }
}

impl Drop for TemporaryWorkspace {
    fn drop(&mut self) {
        if !self.cleanup {
            return;
        }
        let path = std::mem::take(&mut self.path);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || remove_blocking(&path));
            }
            Err(_) => remove_blocking(&path),
        }
    }
}

fn remove_blocking(path: &Path) {
    match std::fs::remove_dir_all(path) {
        Ok(()) => debug!(path = %path.display(), "abandoned workspace removed"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove workspace"),
    }
}

/// Removes `{output_dir}/.tmp` if no workspace is left in it.
///
/// Call once no chapter can still create a workspace.
pub async fn remove_workspace_root(output_dir: &Path) {
    let root = output_dir.join(WORKSPACE_ROOT);
    match tokio::fs::remove_dir(&root).await {
        Ok(()) => debug!(path = %root.display(), "workspace root removed"),
        Err(e) => debug!(path = %root.display(), error = %e, "workspace root left in place"),
    }
}
