//! Fingerprint cache
//!
//! Computes the MD5 fingerprint of a local file, reusing a `<file>.md5`
//! side-car when it is at least as recent as the file itself. The side-car
//! only saves rehashing time; a missing, stale or unreadable side-car just
//! means the digest is computed again.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use md5::{Digest, Md5};
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

use cloudsink_core::domain::{Fingerprint, SIDECAR_EXTENSION};

/// Read buffer for streaming digests
const CHUNK_SIZE: usize = 64 * 1024;

/// Side-car path for `file`: the full file name with `.md5` appended
#[must_use]
pub fn sidecar_path(file: &Path) -> PathBuf {
    let mut name = file.as_os_str().to_os_string();
    name.push(".");
    name.push(SIDECAR_EXTENSION);
    PathBuf::from(name)
}

/// Fingerprint lookup with optional side-car persistence
#[derive(Debug, Clone, Copy)]
pub struct FingerprintCache {
    persist: bool,
}

impl FingerprintCache {
    /// `persist` controls whether freshly computed digests are written to side-cars
    #[must_use]
    pub fn new(persist: bool) -> Self {
        Self { persist }
    }

    /// Returns the fingerprint of `file`
    ///
    /// # Errors
    /// Returns an error if the file itself cannot be read.
    pub async fn fingerprint_of(&self, file: &Path) -> Result<Fingerprint> {
        let sidecar = sidecar_path(file);

        if let Some(cached) = read_fresh_sidecar(file, &sidecar).await {
            debug!(path = %file.display(), "Reusing cached fingerprint");
            return Ok(cached);
        }

        let fingerprint = compute(file).await?;
        debug!(path = %file.display(), md5 = %fingerprint, "Computed fingerprint");

        if self.persist {
            if let Err(e) = tokio::fs::write(&sidecar, fingerprint.as_str()).await {
                warn!(path = %sidecar.display(), error = %e, "Failed to write fingerprint side-car");
            }
        }

        Ok(fingerprint)
    }
}

/// Streams `file` through MD5
async fn compute(file: &Path) -> Result<Fingerprint> {
    let mut reader = tokio::fs::File::open(file)
        .await
        .with_context(|| format!("Failed to open {}", file.display()))?;
    let mut hasher = Md5::new();
    let mut buf = vec![0u8; CHUNK_SIZE];

    loop {
        let n = reader
            .read(&mut buf)
            .await
            .with_context(|| format!("Failed to read {}", file.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(Fingerprint::new(hex::encode(hasher.finalize()))?)
}

/// The side-car's digest, unless the side-car is absent, invalid or older than `file`
async fn read_fresh_sidecar(file: &Path, sidecar: &Path) -> Option<Fingerprint> {
    let sidecar_modified = modified(sidecar).await?;
    let file_modified = modified(file).await?;
    if file_modified > sidecar_modified {
        debug!(path = %file.display(), "Fingerprint side-car is stale");
        return None;
    }

    let content = tokio::fs::read_to_string(sidecar).await.ok()?;
    match Fingerprint::new(&content) {
        Ok(fingerprint) => Some(fingerprint),
        Err(e) => {
            warn!(path = %sidecar.display(), error = %e, "Ignoring malformed fingerprint side-car");
            None
        }
    }
}

async fn modified(path: &Path) -> Option<SystemTime> {
    tokio::fs::metadata(path).await.ok()?.modified().ok()
}
