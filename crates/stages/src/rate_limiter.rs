// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rate limiter: admit bundles into the staging area under a byte quota.
//!
//! Moves the artifact (and its manifest side-car) from the outbox into
//! `RSE_BASE_PATH`. A full quota or a not-yet-present artifact defers the
//! bundle instead of quarantining it; both conditions clear on their own.

use crate::archive;
use async_trait::async_trait;
use lta_core::BundleUpdate;
use lta_harness::{
    ConfigError, Outcome, Stage, StageContext, StageError, Update, Work, WorkerConfig,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const STAGE: &str = "rate-limiter";

/// Default staging quota: 500 GiB.
const DEFAULT_QUOTA_BYTES: u64 = 500 * 1024 * 1024 * 1024;

pub struct RateLimiter {
    staging_dir: PathBuf,
    quota_bytes: u64,
}

impl RateLimiter {
    pub fn from_config(config: &WorkerConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            PathBuf::from(config.var("RSE_BASE_PATH")?),
            config.var_num("RATE_LIMITER_QUOTA_BYTES", DEFAULT_QUOTA_BYTES)?,
        ))
    }

    pub fn new(staging_dir: PathBuf, quota_bytes: u64) -> Self {
        Self {
            staging_dir,
            quota_bytes,
        }
    }

    /// Bytes currently staged.
    fn staged_bytes(&self) -> u64 {
        let Ok(entries) = std::fs::read_dir(&self.staging_dir) else {
            return 0;
        };
        entries
            .flatten()
            .filter_map(|entry| entry.metadata().ok())
            .filter(|meta| meta.is_file())
            .map(|meta| meta.len())
            .sum()
    }
}

/// Move a file across directories: link-then-unlink where possible,
/// copy-then-unlink across filesystems.
fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if let Some(parent) = to.parent() {
        std::fs::create_dir_all(parent)?;
    }
    match std::fs::hard_link(from, to) {
        Ok(()) => {}
        Err(_) => {
            std::fs::copy(from, to)?;
        }
    }
    std::fs::remove_file(from)
}

#[async_trait]
impl Stage for RateLimiter {
    fn name(&self) -> &'static str {
        "rate-limiter"
    }

    async fn run(&self, work: Work, ctx: &StageContext) -> Result<Outcome, StageError> {
        let bundle = crate::expect_bundle(STAGE, work)?;

        let Some(artifact) = bundle.bundle_path.clone() else {
            debug!(bundle = %bundle.uuid, "no artifact recorded yet, deferring");
            return Ok(Outcome::Defer);
        };
        if !artifact.exists() {
            // The artifact may live on another host's outbox; skip rather
            // than quarantine.
            debug!(bundle = %bundle.uuid, path = %artifact.display(), "artifact not present, deferring");
            return Ok(Outcome::Defer);
        }

        let size = bundle
            .size
            .or_else(|| std::fs::metadata(&artifact).ok().map(|m| m.len()))
            .unwrap_or(0);
        let staged = self.staged_bytes();
        if staged + size > self.quota_bytes {
            info!(
                bundle = %bundle.uuid,
                staged,
                size,
                quota = self.quota_bytes,
                "staging quota exhausted, deferring"
            );
            return Ok(Outcome::Defer);
        }

        let file_name = artifact
            .file_name()
            .ok_or_else(|| StageError::new(STAGE, "artifact path has no file name"))?;
        let staged_path = self.staging_dir.join(file_name);
        move_file(&artifact, &staged_path)
            .map_err(|e| StageError::new(STAGE, format!("staging move failed: {e}")))?;

        // The side-car travels with the archive.
        let manifest_src = archive::manifest_path_for(&artifact);
        if manifest_src.exists() {
            let manifest_dst = archive::manifest_path_for(&staged_path);
            move_file(&manifest_src, &manifest_dst)
                .map_err(|e| StageError::new(STAGE, format!("manifest move failed: {e}")))?;
        }

        info!(bundle = %bundle.uuid, path = %staged_path.display(), "bundle staged");

        let mut update = BundleUpdate::advance(crate::output_status(STAGE, ctx)?);
        update.bundle_path = Some(staged_path);
        Ok(Outcome::Advance(Update::Bundle(update)))
    }
}

#[cfg(test)]
#[path = "rate_limiter_tests.rs"]
mod tests;
