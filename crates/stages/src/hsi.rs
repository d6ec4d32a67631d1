// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HPSS tape access via `hsi`.
//!
//! Tape is driven through subprocesses because that is the only supported
//! interface at NERSC. The [`TapeClient`] trait is the seam; stage tests
//! use a fake, production uses [`Hsi`].

use crate::subprocess::{failure_summary, run_with_timeout, HPSS_AVAIL_TIMEOUT};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Tape operations the NERSC stages need.
#[async_trait]
pub trait TapeClient: Send + Sync {
    /// Preflight: is HPSS accepting work right now?
    async fn available(&self) -> bool;

    /// Write a local file to the given tape path.
    async fn put(&self, local: &Path, tape_path: &str) -> Result<(), String>;

    /// Recall a tape path to a local file.
    async fn get(&self, tape_path: &str, local: &Path) -> Result<(), String>;
}

/// Production tape client shelling out to `hsi` / `hpss_avail`.
pub struct Hsi {
    /// Path to the `hpss_avail` binary.
    pub avail_path: PathBuf,
    pub timeout: Duration,
}

#[async_trait]
impl TapeClient for Hsi {
    async fn available(&self) -> bool {
        let mut cmd = Command::new(&self.avail_path);
        cmd.arg("archive");
        match run_with_timeout(cmd, HPSS_AVAIL_TIMEOUT, "hpss_avail").await {
            Ok(output) => output.status.success(),
            Err(reason) => {
                debug!(reason, "hpss_avail probe failed");
                false
            }
        }
    }

    async fn put(&self, local: &Path, tape_path: &str) -> Result<(), String> {
        let mut cmd = Command::new("hsi");
        cmd.arg("put")
            .arg(local)
            .arg(":")
            .arg(tape_path);
        let output = run_with_timeout(cmd, self.timeout, "hsi put").await?;
        if output.status.success() {
            Ok(())
        } else {
            Err(format!("hsi put: {}", failure_summary(&output)))
        }
    }

    async fn get(&self, tape_path: &str, local: &Path) -> Result<(), String> {
        if let Some(parent) = local.parent() {
            std::fs::create_dir_all(parent).map_err(|e| format!("hsi get: {e}"))?;
        }
        let mut cmd = Command::new("hsi");
        cmd.arg("get")
            .arg(local)
            .arg(":")
            .arg(tape_path);
        let output = run_with_timeout(cmd, self.timeout, "hsi get").await?;
        if output.status.success() {
            Ok(())
        } else {
            Err(format!("hsi get: {}", failure_summary(&output)))
        }
    }
}
