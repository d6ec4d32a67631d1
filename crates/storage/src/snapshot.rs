// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot persistence for crash recovery.
//!
//! A snapshot is the complete document collections at a point in time,
//! tagged with the store revision that produced it. The coordinator loads
//! the latest snapshot at startup and checkpoints periodically; between
//! checkpoints the claim discipline makes re-done work harmless (a reaped
//! or replayed claim simply becomes available again).
//!
//! Writes go through a tmp file that is fsynced, renamed over the previous
//! snapshot, and made durable with a directory fsync, so a crash mid-write
//! never costs the prior snapshot.

use crate::collections::Collections;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Bump when the snapshot layout changes incompatibly. A mismatched file is
/// moved aside rather than migrated; the store starts fresh.
pub const CURRENT_SNAPSHOT_VERSION: u32 = 1;

/// zstd level for snapshot bodies; collections are JSON and compress well
/// without reaching for the slow levels.
const COMPRESSION_LEVEL: i32 = 3;

/// Errors that can occur in snapshot operations
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("compression error: {0}")]
    Compress(String),
}

/// The document collections at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    /// Store revision at the time of snapshot.
    pub revision: u64,
    pub collections: Collections,
    pub created_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(revision: u64, collections: Collections) -> Self {
        Self {
            version: CURRENT_SNAPSHOT_VERSION,
            revision,
            collections,
            created_at: Utc::now(),
        }
    }

    /// Serialize, compress, and durably replace the snapshot at `path`.
    ///
    /// Returns the compressed size in bytes. Serialization and compression
    /// happen before any file is touched, so a failure there leaves the
    /// previous snapshot in place untouched.
    pub fn write(&self, path: &Path) -> Result<u64, SnapshotError> {
        let json = serde_json::to_vec(self)?;
        let compressed = zstd::encode_all(json.as_slice(), COMPRESSION_LEVEL)
            .map_err(|e| SnapshotError::Compress(e.to_string()))?;

        let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
        if let Some(parent) = parent {
            fs::create_dir_all(parent)?;
        }

        // tmp write + fsync, then rename over the old snapshot, then fsync
        // the directory so the rename survives power loss.
        let tmp = path.with_extension("tmp");
        {
            let mut file = File::create(&tmp)?;
            file.write_all(&compressed)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, path)?;
        if let Some(parent) = parent {
            File::open(parent)?.sync_all()?;
        }

        Ok(compressed.len() as u64)
    }

    /// Load a zstd-compressed snapshot if one exists.
    ///
    /// Returns `Ok(None)` when the file is missing, corrupt, or from an
    /// incompatible version. Unusable files are moved aside so the
    /// coordinator can start with empty collections instead of crashing.
    pub fn load(path: &Path) -> Result<Option<Self>, SnapshotError> {
        if !path.exists() {
            return Ok(None);
        }

        let file = File::open(path)?;
        // Both a bad zstd frame and bad JSON mean the same thing: the file
        // is unusable and gets moved aside.
        let parsed: Result<Snapshot, String> = zstd::stream::read::Decoder::new(BufReader::new(file))
            .map_err(|e| e.to_string())
            .and_then(|decoder| serde_json::from_reader(decoder).map_err(|e| e.to_string()));
        match parsed {
            Ok(snapshot) if snapshot.version == CURRENT_SNAPSHOT_VERSION => Ok(Some(snapshot)),
            Ok(snapshot) => {
                let bak_path = sideline(path)?;
                warn!(
                    version = snapshot.version,
                    expected = CURRENT_SNAPSHOT_VERSION,
                    bak = %bak_path.display(),
                    "snapshot version mismatch, moving aside and starting fresh",
                );
                Ok(None)
            }
            Err(e) => {
                let bak_path = sideline(path)?;
                warn!(
                    error = %e,
                    path = %path.display(),
                    bak = %bak_path.display(),
                    "corrupt snapshot, moving aside and starting fresh",
                );
                Ok(None)
            }
        }
    }
}

/// Move an unusable snapshot out of the way, keeping the two most recent
/// rejects as `.bak` and `.bak2`. Anything older is dropped; the rejects
/// exist only for post-mortems, not for recovery.
fn sideline(path: &Path) -> Result<PathBuf, SnapshotError> {
    let newest = path.with_extension("bak");
    if newest.exists() {
        let older = path.with_extension("bak2");
        let _ = fs::remove_file(&older);
        let _ = fs::rename(&newest, &older);
    }
    fs::rename(path, &newest)?;
    Ok(newest)
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
