// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! GridFTP byte mover.
//!
//! `globus-url-copy` is known to return spurious non-zero codes on
//! transfers that actually completed, so the mover exposes a completion
//! probe besides the copy itself; the replicator consults it before
//! declaring failure.

use crate::subprocess::{failure_summary, run_with_timeout};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;

/// A remote byte mover.
#[async_trait]
pub trait ByteMover: Send + Sync {
    /// Copy a local file to the remote URL.
    async fn copy(&self, local: &Path, remote_url: &str) -> Result<(), String>;

    /// Whether the remote copy is actually complete at the expected size.
    async fn completed(&self, local: &Path, remote_url: &str) -> bool;
}

/// Production mover shelling out to `globus-url-copy`.
pub struct GridFtp {
    pub timeout: Duration,
}

fn file_url(local: &Path) -> String {
    format!("file://{}", local.display())
}

#[async_trait]
impl ByteMover for GridFtp {
    async fn copy(&self, local: &Path, remote_url: &str) -> Result<(), String> {
        let mut cmd = Command::new("globus-url-copy");
        cmd.arg("-fast")
            .arg(file_url(local))
            .arg(remote_url);
        let output = run_with_timeout(cmd, self.timeout, "globus-url-copy").await?;
        if output.status.success() {
            Ok(())
        } else {
            Err(format!("globus-url-copy: {}", failure_summary(&output)))
        }
    }

    async fn completed(&self, local: &Path, remote_url: &str) -> bool {
        // A sync-mode copy transfers nothing when source and destination
        // already match; success therefore means the remote copy is whole.
        let mut cmd = Command::new("globus-url-copy");
        cmd.arg("-sync")
            .arg("-sync-level")
            .arg("1")
            .arg(file_url(local))
            .arg(remote_url);
        match run_with_timeout(cmd, self.timeout, "globus-url-copy -sync").await {
            Ok(output) => output.status.success(),
            Err(_) => false,
        }
    }
}
