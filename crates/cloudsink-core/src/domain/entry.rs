//! Local directory entries
//!
//! A [`LocalEntry`] is built fresh every time a directory is listed and
//! discarded once it has been reconciled.

use std::path::PathBuf;
use std::time::SystemTime;

/// Extension used for cached fingerprint side-car files
pub const SIDECAR_EXTENSION: &str = "md5";

/// One entry of a local directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalEntry {
    /// File or directory name (lossy UTF-8)
    pub name: String,
    /// Absolute path of the containing directory
    pub parent_path: PathBuf,
    /// Absolute path of the entry itself
    pub absolute_path: PathBuf,
    /// Resolved with a stat call, so symlinks to directories count as directories
    pub is_directory: bool,
    /// Size in bytes (0 for directories)
    pub size: u64,
    pub modified: Option<SystemTime>,
    pub created: Option<SystemTime>,
}

impl LocalEntry {
    /// Lowercased extension including the leading dot, e.g. `.jpg`
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        self.absolute_path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy().to_ascii_lowercase()))
    }

    /// For a `<name>.md5` file, the `<name>` it would be the side-car of
    ///
    /// The entry is only a side-car when that file sits in the same directory.
    #[must_use]
    pub fn sidecar_source(&self) -> Option<&str> {
        if self.is_directory {
            return None;
        }
        let (stem, ext) = self.name.rsplit_once('.')?;
        (!stem.is_empty() && ext.eq_ignore_ascii_case(SIDECAR_EXTENSION)).then_some(stem)
    }

    /// True when this entry is the side-car of a file among `siblings`
    #[must_use]
    pub fn is_sidecar_among(&self, siblings: &[LocalEntry]) -> bool {
        self.sidecar_source().is_some_and(|source| {
            siblings
                .iter()
                .any(|sibling| !sibling.is_directory && sibling.name == source)
        })
    }
}
