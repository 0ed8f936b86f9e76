// src/directory.rs

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::models::ThreadReference;

#[derive(Debug, Error)]
#[error("cannot create directory {}: {source}", path.display())]
pub struct FilesystemError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Create `path` and any missing parents. Existing directories are left alone.
pub async fn ensure_dir(path: &Path) -> Result<(), FilesystemError> {
    if tokio::fs::metadata(path).await.map(|m| m.is_dir()).unwrap_or(false) {
        return Ok(());
    }
    debug!("creating directory {}", path.display());
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|source| FilesystemError {
            path: path.to_path_buf(),
            source,
        })
}

/// `base/<board>_<threadId>`, created if absent.
pub async fn ensure_thread_dir(
    base: &Path,
    thread: &ThreadReference,
) -> Result<PathBuf, FilesystemError> {
    let dir = base.join(thread.dir_name());
    ensure_dir(&dir).await?;
    Ok(dir)
}
