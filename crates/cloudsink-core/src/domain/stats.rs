//! Run statistics

use serde::{Deserialize, Serialize};

/// Counters accumulated over one sync run
///
/// Owned by the sync driver and only mutated by the single active task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStats {
    /// New files uploaded
    pub uploaded: u64,
    /// Existing remote files whose content was replaced
    pub updated: u64,
    /// Remote folders created
    pub folders_created: u64,
    /// Files ignored because their extension is not tracked
    pub skipped: u64,
    /// Files whose remote fingerprint already matched
    pub already_present: u64,
    /// Files not synced because fingerprinting or the upload (after its retry) failed
    pub failed: u64,
    /// Content bytes of successful uploads: the size the store reports,
    /// or the local size when it reports none
    pub bytes_uploaded: u64,
    /// Folders whose children were reconciled (the sync root included)
    pub folders_processed: u64,
    /// File entries examined, skipped ones included
    pub files_processed: u64,
}

impl SyncStats {
    /// Number of write operations performed (or planned in dry-run)
    #[must_use]
    pub fn changes(&self) -> u64 {
        self.uploaded + self.updated + self.folders_created
    }
}
