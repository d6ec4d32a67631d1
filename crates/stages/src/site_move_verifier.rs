// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Site-move verifier: independently re-checksum a received artifact.
//!
//! Runs at the destination after the replicator. The artifact is expected
//! under `DEST_BASE_PATH`; its digest must match the checksum recorded at
//! bundling time. `OUTPUT_STATUS` decides whether the bundle continues to
//! tape (`taping`) or to the unpacker (`unpacking`).

use crate::checksum::checksum_file;
use async_trait::async_trait;
use lta_core::BundleUpdate;
use lta_harness::{
    ConfigError, Outcome, Stage, StageContext, StageError, Update, Work, WorkerConfig,
};
use std::path::PathBuf;
use tracing::info;

const STAGE: &str = "site-move-verifier";

pub struct SiteMoveVerifier {
    dest_dir: PathBuf,
}

impl SiteMoveVerifier {
    pub fn from_config(config: &WorkerConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(PathBuf::from(config.var("DEST_BASE_PATH")?)))
    }

    pub fn new(dest_dir: PathBuf) -> Self {
        Self { dest_dir }
    }
}

#[async_trait]
impl Stage for SiteMoveVerifier {
    fn name(&self) -> &'static str {
        "site-move-verifier"
    }

    async fn run(&self, work: Work, ctx: &StageContext) -> Result<Outcome, StageError> {
        let bundle = crate::expect_bundle(STAGE, work)?;

        let expected = bundle
            .checksum
            .clone()
            .ok_or_else(|| StageError::new(STAGE, "bundle has no recorded checksum"))?;
        let file_name = bundle
            .bundle_path
            .as_deref()
            .and_then(|p| p.file_name())
            .ok_or_else(|| StageError::new(STAGE, "bundle has no artifact path"))?;
        let received = self.dest_dir.join(file_name);

        let (actual, size) =
            checksum_file(&received).map_err(|e| StageError::new(STAGE, e.to_string()))?;
        if actual != expected {
            return Err(StageError::new(
                STAGE,
                format!(
                    "checksum mismatch on received artifact (expected sha512 {}, got {})",
                    expected.sha512, actual.sha512
                ),
            ));
        }
        if let Some(expected_size) = bundle.size {
            if expected_size != size {
                return Err(StageError::new(
                    STAGE,
                    format!("size mismatch (expected {expected_size}, got {size})"),
                ));
            }
        }

        info!(bundle = %bundle.uuid, path = %received.display(), "received artifact verified");

        let mut update = BundleUpdate::advance(crate::output_status(STAGE, ctx)?);
        update.bundle_path = Some(received);
        Ok(Outcome::Advance(Update::Bundle(update)))
    }
}

#[cfg(test)]
#[path = "site_move_verifier_tests.rs"]
mod tests;
