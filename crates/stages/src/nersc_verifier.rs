// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! NERSC verifier: re-read a taped bundle, checksum it, and register the
//! archived replicas in the File Catalog.
//!
//! This is the stage that makes an archival real: only after the tape copy
//! checks out does every constituent file gain an archive location with
//! `date_archived` set.

use crate::catalog::{CatalogLocation, FileCatalog};
use crate::checksum::checksum_file;
use crate::hsi::TapeClient;
use async_trait::async_trait;
use chrono::Utc;
use lta_core::BundleUpdate;
use lta_harness::{
    ConfigError, Outcome, Stage, StageContext, StageError, Update, Work, WorkerConfig,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

const STAGE: &str = "nersc-verifier";

pub struct NerscVerifier {
    tape: Arc<dyn TapeClient>,
    catalog: Arc<dyn FileCatalog>,
    scratch_dir: PathBuf,
    /// Record `tape_path:logical_name` locations instead of the bare
    /// bundle path (`USE_FULL_BUNDLE_PATH`).
    use_full_bundle_path: bool,
}

impl NerscVerifier {
    pub fn from_config(config: &WorkerConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            crate::nersc_mover::tape_from_config(config)?,
            crate::locator::catalog_from_config(config)?,
            PathBuf::from(config.var_opt("VERIFIER_SCRATCH_PATH").unwrap_or("/tmp/lta-verify")),
            config.var_opt("USE_FULL_BUNDLE_PATH").is_some_and(|v| v == "TRUE" || v == "true"),
        ))
    }

    pub fn new(
        tape: Arc<dyn TapeClient>,
        catalog: Arc<dyn FileCatalog>,
        scratch_dir: PathBuf,
        use_full_bundle_path: bool,
    ) -> Self {
        Self {
            tape,
            catalog,
            scratch_dir,
            use_full_bundle_path,
        }
    }
}

#[async_trait]
impl Stage for NerscVerifier {
    fn name(&self) -> &'static str {
        "nersc-verifier"
    }

    async fn preflight(&self, _ctx: &StageContext) -> bool {
        self.tape.available().await
    }

    async fn run(&self, work: Work, ctx: &StageContext) -> Result<Outcome, StageError> {
        let bundle = crate::expect_bundle(STAGE, work)?;
        let expected = bundle
            .checksum
            .clone()
            .ok_or_else(|| StageError::new(STAGE, "bundle has no recorded checksum"))?;
        let tape_path = bundle
            .bundle_path
            .as_deref()
            .and_then(|p| p.to_str())
            .ok_or_else(|| StageError::new(STAGE, "bundle has no tape path"))?
            .to_string();
        let file_name = std::path::Path::new(&tape_path)
            .file_name()
            .ok_or_else(|| StageError::new(STAGE, "tape path has no file name"))?;

        // Re-read the bytes that actually landed on tape.
        let scratch = self.scratch_dir.join(file_name);
        self.tape
            .get(&tape_path, &scratch)
            .await
            .map_err(|reason| StageError::new(STAGE, reason))?;
        let verify_result = checksum_file(&scratch);
        let _ = std::fs::remove_file(&scratch);
        let (actual, _) = verify_result.map_err(|e| StageError::new(STAGE, e.to_string()))?;
        if actual != expected {
            return Err(StageError::new(
                STAGE,
                format!(
                    "tape checksum mismatch (expected sha512 {}, got {})",
                    expected.sha512, actual.sha512
                ),
            ));
        }

        // Register an archived replica for every constituent file.
        let rows = ctx
            .coordinator
            .list_metadata(bundle.uuid.as_str())
            .await
            .map_err(|e| StageError::new(STAGE, e.to_string()))?;
        let now = Utc::now();
        for row in &rows {
            let file = self
                .catalog
                .file(&row.file_catalog_uuid)
                .await
                .map_err(|e| StageError::new(STAGE, e.to_string()))?;
            let path = if self.use_full_bundle_path {
                format!("{}:{}", tape_path, file.logical_name)
            } else {
                tape_path.clone()
            };
            self.catalog
                .add_location(
                    &file.uuid,
                    CatalogLocation {
                        site: bundle.dest.clone(),
                        path,
                        archive: true,
                        date_archived: Some(now),
                    },
                )
                .await
                .map_err(|e| StageError::new(STAGE, e.to_string()))?;
        }

        info!(
            bundle = %bundle.uuid,
            files = rows.len(),
            tape_path,
            "tape copy verified, replicas registered"
        );

        let mut update = BundleUpdate::advance(crate::output_status(STAGE, ctx)?);
        update.verified = Some(true);
        Ok(Outcome::Advance(Update::Bundle(update)))
    }
}

#[cfg(test)]
#[path = "nersc_verifier_tests.rs"]
mod tests;
