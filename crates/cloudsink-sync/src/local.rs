//! Local directory listing
//!
//! Lists one directory level into [`LocalEntry`] values, in the order the
//! operating system returns them. Each entry is resolved with a `stat` call
//! (following symlinks), so a symlink to a directory is listed as a
//! directory. Entries that cannot be stat'ed, such as dangling symlinks, are
//! skipped with a warning.

use std::path::Path;

use tracing::{debug, instrument, warn};

use cloudsink_core::domain::LocalEntry;

use crate::SyncError;

/// Lists the entries of `dir` in directory-listing order
///
/// # Errors
/// [`SyncError::Io`] if `dir` itself cannot be read.
#[instrument(skip_all, fields(dir = %dir.display()))]
pub async fn list_local_entries(dir: &Path) -> Result<Vec<LocalEntry>, SyncError> {
    let io_err = |source| SyncError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut reader = tokio::fs::read_dir(dir).await.map_err(io_err)?;
    let mut entries = Vec::new();

    while let Some(entry) = reader.next_entry().await.map_err(io_err)? {
        let absolute_path = entry.path();
        let metadata = match tokio::fs::metadata(&absolute_path).await {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(path = %absolute_path.display(), error = %e, "Skipping unreadable entry");
                continue;
            }
        };

        if !metadata.is_dir() && !metadata.is_file() {
            debug!(path = %absolute_path.display(), "Skipping special file");
            continue;
        }

        entries.push(LocalEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            parent_path: dir.to_path_buf(),
            absolute_path,
            is_directory: metadata.is_dir(),
            size: if metadata.is_file() { metadata.len() } else { 0 },
            modified: metadata.modified().ok(),
            created: metadata.created().ok(),
        });
    }

    debug!(count = entries.len(), "Listed local directory");
    Ok(entries)
}
