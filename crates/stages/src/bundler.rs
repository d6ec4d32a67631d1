// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bundler: materialize a specified bundle into a tar artifact.
//!
//! Reads the bundle's file list from the Metadata side-table, resolves each
//! file's on-disk replica through the File Catalog, builds the tar plus the
//! manifest side-car in the outbox, and records size and checksums. Partial
//! artifacts from a crashed prior attempt are deleted before building, so a
//! retried bundle produces byte-identical output.

use crate::archive::{self, BundleManifest, ManifestFile};
use crate::catalog::FileCatalog;
use crate::checksum::checksum_file;
use async_trait::async_trait;
use lta_core::{Bundle, BundleUpdate};
use lta_harness::{
    ConfigError, Outcome, Stage, StageContext, StageError, Update, Work, WorkerConfig,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

const STAGE: &str = "bundler";

pub struct Bundler {
    catalog: Arc<dyn FileCatalog>,
    outbox: PathBuf,
}

impl Bundler {
    pub fn from_config(config: &WorkerConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            crate::locator::catalog_from_config(config)?,
            PathBuf::from(config.var("BUNDLER_OUTBOX_PATH")?),
        ))
    }

    pub fn new(catalog: Arc<dyn FileCatalog>, outbox: PathBuf) -> Self {
        Self { catalog, outbox }
    }

    fn archive_path(&self, bundle: &Bundle) -> PathBuf {
        self.outbox.join(format!("{}.tar", bundle.uuid))
    }

    fn remove_partial_artifacts(&self, archive_path: &Path) {
        for path in [
            archive_path.to_path_buf(),
            archive::manifest_path_for(archive_path),
        ] {
            if path.exists() {
                warn!(path = %path.display(), "removing partial artifact from prior attempt");
                let _ = std::fs::remove_file(&path);
            }
        }
    }
}

#[async_trait]
impl Stage for Bundler {
    fn name(&self) -> &'static str {
        "bundler"
    }

    async fn run(&self, work: Work, ctx: &StageContext) -> Result<Outcome, StageError> {
        let bundle = crate::expect_bundle(STAGE, work)?;
        let archive_path = self.archive_path(&bundle);

        self.remove_partial_artifacts(&archive_path);

        let rows = ctx
            .coordinator
            .list_metadata(bundle.uuid.as_str())
            .await
            .map_err(|e| StageError::new(STAGE, e.to_string()))?;
        if rows.is_empty() {
            return Err(StageError::new(
                STAGE,
                format!("bundle {} has no metadata rows", bundle.uuid),
            ));
        }

        // Resolve every constituent file to its disk replica at the source.
        let mut entries: Vec<(PathBuf, String)> = Vec::with_capacity(rows.len());
        let mut manifest_files: Vec<ManifestFile> = Vec::with_capacity(rows.len());
        for row in &rows {
            let file = self
                .catalog
                .file(&row.file_catalog_uuid)
                .await
                .map_err(|e| StageError::new(STAGE, e.to_string()))?;
            let location = file.disk_location_at(&bundle.source).ok_or_else(|| {
                StageError::new(
                    STAGE,
                    format!("{} has no disk replica at {}", file.logical_name, bundle.source),
                )
            })?;
            let sha512 = file.sha512().ok_or_else(|| {
                StageError::new(
                    STAGE,
                    format!("checksum mismatch on source file {}", file.logical_name),
                )
            })?;
            entries.push((PathBuf::from(&location.path), file.logical_name.clone()));
            manifest_files.push(ManifestFile {
                uuid: file.uuid.clone(),
                logical_name: file.logical_name.clone(),
                size: file.file_size,
                sha512: sha512.to_string(),
            });
        }
        entries.sort_by(|a, b| a.1.cmp(&b.1));
        manifest_files.sort_by(|a, b| a.logical_name.cmp(&b.logical_name));

        let size = archive::write_archive(&archive_path, &entries)
            .map_err(|e| StageError::new(STAGE, e.to_string()))?;
        let (checksum, checked_size) =
            checksum_file(&archive_path).map_err(|e| StageError::new(STAGE, e.to_string()))?;
        if checked_size != size {
            return Err(StageError::new(
                STAGE,
                format!("archive size changed during checksum ({size} vs {checked_size})"),
            ));
        }

        let manifest = BundleManifest {
            uuid: bundle.uuid.to_string(),
            request: bundle.request.to_string(),
            source: bundle.source.clone(),
            dest: bundle.dest.clone(),
            path: bundle.path.clone(),
            files: manifest_files,
            checksum: Some(checksum.clone()),
        };
        archive::write_manifest(&archive::manifest_path_for(&archive_path), &manifest)
            .map_err(|e| StageError::new(STAGE, e.to_string()))?;

        info!(
            bundle = %bundle.uuid,
            size,
            path = %archive_path.display(),
            "bundle materialized"
        );

        let mut update = BundleUpdate::advance(crate::output_status(STAGE, ctx)?);
        update.bundle_path = Some(archive_path);
        update.size = Some(size);
        update.checksum = Some(checksum);
        Ok(Outcome::Advance(Update::Bundle(update)))
    }
}

#[cfg(test)]
#[path = "bundler_tests.rs"]
mod tests;
