//! One-way synchronization driver
//!
//! The [`SyncDriver`] mirrors a local directory tree into a remote folder.
//!
//! ## Sync Flow
//!
//! 1. **Locate**: find the remote root and resolve the target path,
//!    creating missing folders
//! 2. **Reconcile** each folder: list remote children and local entries,
//!    pair them by name (first remote match wins) and process the local
//!    entries one at a time in directory-listing order
//! 3. **Report**: return the accumulated [`SyncStats`] and per-file errors
//!
//! ## Per-entry decisions
//!
//! | local     | remote match   | action                               |
//! |-----------|----------------|--------------------------------------|
//! | directory | none           | create folder, recurse               |
//! | directory | folder         | recurse                              |
//! | file      | none           | upload as new (tracked types only)   |
//! | file      | file, same md5 | nothing, counted as already present  |
//! | file      | file, other md5| replace content                      |
//! | any       | other kind     | [`SyncError::Conflict`], run aborts  |
//!
//! An entry's whole subtree is finished before the next entry starts.
//! Upload failures are recorded and do not stop sibling processing; a
//! failure to list or create a subfolder skips that subtree only. Rejected
//! credentials ([`SyncError::Auth`]) abort the run like a conflict, since
//! every later call would fail the same way. A directory link leading back
//! to one of its ancestors is skipped instead of followed.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use cloudsink_core::domain::{LocalEntry, MimeTable, NodeKind, RemoteNode, RemotePath, SyncStats};
use cloudsink_core::ports::{
    ChildFilter, IRemoteStore, RemoteError, UploadRequest, UploadSource, UploadTarget,
};

use crate::fingerprint::FingerprintCache;
use crate::local::list_local_entries;
use crate::resolver::{lookup_path, resolve_path};
use crate::SyncError;

// ============================================================================
// SyncReport
// ============================================================================

/// Summary of a completed sync run
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub stats: SyncStats,
    /// Per-file and per-subtree failures that did not abort the run
    pub errors: Vec<String>,
    /// Wall-clock duration of the run in milliseconds
    pub duration_ms: u64,
    /// Whether the run only planned its changes
    pub dry_run: bool,
}

/// Mutable state threaded through one run
#[derive(Debug, Default)]
struct RunState {
    stats: SyncStats,
    errors: Vec<String>,
    /// Canonical paths of the directories currently being reconciled, outermost first
    ancestors: Vec<PathBuf>,
}

impl RunState {
    /// Counts a file that could not be synced; `stage` names the failed step
    fn record_failure(&mut self, path: &Path, stage: &str, err: &anyhow::Error) {
        error!(path = %path.display(), stage, error = %format!("{err:#}"), "File not synced");
        self.stats.failed += 1;
        self.errors.push(format!("{}: {stage}: {err:#}", path.display()));
    }

    fn record_skipped_folder(&mut self, path: &Path, reason: impl std::fmt::Display) {
        warn!(path = %path.display(), error = %reason, "Skipping folder");
        self.errors.push(format!("{}: {reason}", path.display()));
    }
}

/// Symlinks resolved; the path itself when it cannot be resolved
async fn canonical(path: &Path) -> PathBuf {
    tokio::fs::canonicalize(path)
        .await
        .unwrap_or_else(|_| path.to_path_buf())
}

type FolderFuture<'a> = Pin<Box<dyn Future<Output = Result<(), SyncError>> + Send + 'a>>;

// ============================================================================
// SyncDriver
// ============================================================================

/// Options that change how a run behaves
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Count planned changes without any mutating remote call
    pub dry_run: bool,
    /// Write `.md5` side-cars for computed fingerprints
    pub persist_hashes: bool,
}

/// Recursive reconciliation of a local tree against a remote folder
pub struct SyncDriver {
    store: Arc<dyn IRemoteStore>,
    mime: MimeTable,
    fingerprints: FingerprintCache,
    dry_run: bool,
}

impl SyncDriver {
    /// Creates a driver over `store`, uploading only extensions present in `mime`
    pub fn new(store: Arc<dyn IRemoteStore>, mime: MimeTable, options: SyncOptions) -> Self {
        Self {
            store,
            mime,
            fingerprints: FingerprintCache::new(options.persist_hashes && !options.dry_run),
            dry_run: options.dry_run,
        }
    }

    /// Syncs `source` into the remote folder at `target`
    ///
    /// # Errors
    /// - [`SyncError::Conflict`] as soon as a kind mismatch is found
    /// - [`SyncError::Auth`] as soon as the store rejects the credentials
    /// - [`SyncError::Remote`] if the target cannot be located or its
    ///   top-level listing fails
    /// - [`SyncError::Io`] if `source` cannot be read
    #[tracing::instrument(skip_all, fields(source = %source.display(), remote = %target))]
    pub async fn run(&self, source: &Path, target: &RemotePath) -> Result<SyncReport, SyncError> {
        let start = Instant::now();
        let mut run = RunState::default();

        info!(dry_run = self.dry_run, "Starting sync run");

        let root = self
            .store
            .root()
            .await
            .context("Failed to look up the remote root")?;
        let segments = target.segments();

        let target_node = if self.dry_run {
            let lookup = lookup_path(self.store.as_ref(), root, &segments).await?;
            run.stats.folders_created += lookup.missing as u64;
            lookup.is_complete().then_some(lookup.node)
        } else {
            let resolved = resolve_path(self.store.as_ref(), root, &segments).await?;
            run.stats.folders_created += resolved.created.len() as u64;
            Some(resolved.node)
        };

        self.sync_folder(target_node.as_ref(), source, &mut run).await?;

        let report = SyncReport {
            stats: run.stats,
            errors: run.errors,
            duration_ms: start.elapsed().as_millis() as u64,
            dry_run: self.dry_run,
        };

        info!(
            uploaded = report.stats.uploaded,
            updated = report.stats.updated,
            folders_created = report.stats.folders_created,
            skipped = report.stats.skipped,
            already_present = report.stats.already_present,
            failed = report.stats.failed,
            duration_ms = report.duration_ms,
            "Sync run complete"
        );

        Ok(report)
    }

    /// Syncs one local directory into an already known remote folder
    ///
    /// # Errors
    /// Same as [`run`](Self::run), minus target resolution.
    pub async fn run_folder(&self, remote: &RemoteNode, local: &Path) -> Result<SyncReport, SyncError> {
        let start = Instant::now();
        let mut run = RunState::default();
        self.sync_folder(Some(remote), local, &mut run).await?;
        Ok(SyncReport {
            stats: run.stats,
            errors: run.errors,
            duration_ms: start.elapsed().as_millis() as u64,
            dry_run: self.dry_run,
        })
    }

    /// Reconciles one folder level and recurses into subdirectories
    ///
    /// `remote` is `None` only in dry-run, for folders that would be created.
    fn sync_folder<'a>(
        &'a self,
        remote: Option<&'a RemoteNode>,
        local: &'a Path,
        run: &'a mut RunState,
    ) -> FolderFuture<'a> {
        Box::pin(async move {
            run.ancestors.push(canonical(local).await);
            let result = self.reconcile(remote, local, run).await;
            run.ancestors.pop();
            result
        })
    }

    async fn reconcile(
        &self,
        remote: Option<&RemoteNode>,
        local: &Path,
        run: &mut RunState,
    ) -> Result<(), SyncError> {
        run.stats.folders_processed += 1;

        let remote_children = match remote {
            Some(folder) => self
                .store
                .list_children(&folder.id, ChildFilter::All)
                .await
                .with_context(|| format!("Failed to list remote folder for {}", local.display()))?,
            None => Vec::new(),
        };
        let entries = list_local_entries(local).await?;

        debug!(
            path = %local.display(),
            local = entries.len(),
            remote = remote_children.len(),
            "Reconciling folder"
        );

        for entry in &entries {
            if entry.is_sidecar_among(&entries) {
                continue;
            }
            let remote_match = remote_children.iter().find(|child| child.name == entry.name);

            if entry.is_directory {
                self.sync_directory(remote, remote_match, entry, run).await?;
            } else {
                self.sync_file(remote, remote_match, entry, run).await?;
            }
        }

        Ok(())
    }

    async fn sync_directory(
        &self,
        parent: Option<&RemoteNode>,
        remote_match: Option<&RemoteNode>,
        entry: &LocalEntry,
        run: &mut RunState,
    ) -> Result<(), SyncError> {
        if let Some(node) = remote_match.filter(|node| !node.is_folder()) {
            return Err(conflict(entry, node));
        }

        if run.ancestors.contains(&canonical(&entry.absolute_path).await) {
            run.record_skipped_folder(&entry.absolute_path, "links back to an ancestor directory");
            return Ok(());
        }

        let created;
        let folder = match remote_match {
            Some(node) => Some(node),
            None => match parent {
                Some(parent) if !self.dry_run => {
                    match self.store.create_folder(&parent.id, &entry.name).await {
                        Ok(node) => {
                            info!(path = %entry.absolute_path.display(), id = %node.id, "Created remote folder");
                            run.stats.folders_created += 1;
                            created = node;
                            Some(&created)
                        }
                        Err(err) => {
                            let err = SyncError::from(err);
                            if err.is_fatal() {
                                return Err(err);
                            }
                            run.record_skipped_folder(&entry.absolute_path, err);
                            return Ok(());
                        }
                    }
                }
                _ => {
                    info!(path = %entry.absolute_path.display(), "Would create remote folder");
                    run.stats.folders_created += 1;
                    None
                }
            },
        };

        match self.sync_folder(folder, &entry.absolute_path, run).await {
            Err(err) if !err.is_fatal() => {
                run.record_skipped_folder(&entry.absolute_path, err);
                Ok(())
            }
            result => result,
        }
    }

    async fn sync_file(
        &self,
        parent: Option<&RemoteNode>,
        remote_match: Option<&RemoteNode>,
        entry: &LocalEntry,
        run: &mut RunState,
    ) -> Result<(), SyncError> {
        run.stats.files_processed += 1;

        let content_type = entry
            .extension()
            .and_then(|ext| self.mime.content_type(&ext).map(str::to_string));
        let Some(content_type) = content_type else {
            debug!(path = %entry.absolute_path.display(), "Skipping untracked file type");
            run.stats.skipped += 1;
            return Ok(());
        };

        let target = match remote_match {
            Some(node) if !node.is_file() => return Err(conflict(entry, node)),
            Some(node) => {
                let local = match self.fingerprints.fingerprint_of(&entry.absolute_path).await {
                    Ok(fingerprint) => fingerprint,
                    Err(err) => {
                        run.record_failure(&entry.absolute_path, "fingerprint", &err);
                        return Ok(());
                    }
                };
                if node.fingerprint.as_ref() == Some(&local) {
                    debug!(path = %entry.absolute_path.display(), "Already present");
                    run.stats.already_present += 1;
                    return Ok(());
                }
                UploadTarget::Replace {
                    node_id: node.id.clone(),
                }
            }
            None => match parent {
                Some(parent) => UploadTarget::New {
                    parent_id: parent.id.clone(),
                    name: entry.name.clone(),
                },
                None => {
                    info!(path = %entry.absolute_path.display(), "Would upload");
                    count_upload(run, false, entry.size);
                    return Ok(());
                }
            },
        };

        let replace = target.is_replace();
        if self.dry_run {
            info!(path = %entry.absolute_path.display(), replace, "Would upload");
            count_upload(run, replace, entry.size);
            return Ok(());
        }

        let request = UploadRequest {
            source: UploadSource::File(entry.absolute_path.clone()),
            target,
            content_type,
        };
        match self.store.upload(request).await {
            Ok(node) => {
                info!(path = %entry.absolute_path.display(), id = %node.id, replace, "Uploaded file");
                count_upload(run, replace, node.size.unwrap_or(entry.size));
            }
            Err(err) if RemoteError::is_unauthorized(&err) => {
                error!(path = %entry.absolute_path.display(), error = %format!("{err:#}"), "Aborting sync run");
                return Err(SyncError::Auth(err));
            }
            Err(err) => run.record_failure(&entry.absolute_path, "upload", &err),
        }

        Ok(())
    }
}

/// `size` is the stored size reported by the store, or the local size when
/// the store reports none (and always in dry-run)
fn count_upload(run: &mut RunState, replace: bool, size: u64) {
    if replace {
        run.stats.updated += 1;
    } else {
        run.stats.uploaded += 1;
    }
    run.stats.bytes_uploaded += size;
}

fn conflict(entry: &LocalEntry, node: &RemoteNode) -> SyncError {
    let err = SyncError::Conflict {
        path: entry.absolute_path.clone(),
        local: NodeKind::for_local(entry.is_directory),
        remote: node.kind,
    };
    error!(error = %err, "Aborting sync run");
    err
}

// ============================================================================
// Tests
// ============================================================================
