// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unpacker: expand a retrieved archive back into the warehouse.
//!
//! Reads the manifest side-car, extracts the tar, verifies every file
//! against its manifest checksum, and registers the unpacked files in the
//! File Catalog under their logical names (optionally remapped through
//! `PATH_MAP_JSON`).

use crate::archive;
use crate::catalog::{CatalogFile, CatalogLocation, FileCatalog};
use crate::checksum::sha512_file;
use async_trait::async_trait;
use lta_core::BundleUpdate;
use lta_harness::{
    ConfigError, Outcome, Stage, StageContext, StageError, Update, Work, WorkerConfig,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

const STAGE: &str = "unpacker";

pub struct Unpacker {
    catalog: Arc<dyn FileCatalog>,
    warehouse_dir: PathBuf,
    /// Logical-name prefix remaps applied before registration.
    path_map: Vec<(String, String)>,
}

impl Unpacker {
    pub fn from_config(config: &WorkerConfig) -> Result<Self, ConfigError> {
        let path_map = match config.var_opt("PATH_MAP_JSON") {
            None => Vec::new(),
            Some(raw) => {
                let parsed: HashMap<String, String> =
                    serde_json::from_str(raw).map_err(|e| ConfigError::Invalid {
                        name: "PATH_MAP_JSON".to_string(),
                        value: e.to_string(),
                    })?;
                let mut pairs: Vec<_> = parsed.into_iter().collect();
                // Longest prefix first, so nested remaps win.
                pairs.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
                pairs
            }
        };
        Ok(Self::new(
            crate::locator::catalog_from_config(config)?,
            PathBuf::from(config.var("UNPACKER_WAREHOUSE_PATH")?),
            path_map,
        ))
    }

    pub fn new(
        catalog: Arc<dyn FileCatalog>,
        warehouse_dir: PathBuf,
        path_map: Vec<(String, String)>,
    ) -> Self {
        Self {
            catalog,
            warehouse_dir,
            path_map,
        }
    }

    fn remap(&self, logical_name: &str) -> String {
        for (from, to) in &self.path_map {
            if let Some(rest) = logical_name.strip_prefix(from) {
                return format!("{to}{rest}");
            }
        }
        logical_name.to_string()
    }
}

#[async_trait]
impl Stage for Unpacker {
    fn name(&self) -> &'static str {
        "unpacker"
    }

    async fn run(&self, work: Work, ctx: &StageContext) -> Result<Outcome, StageError> {
        let bundle = crate::expect_bundle(STAGE, work)?;
        let artifact = bundle
            .bundle_path
            .clone()
            .ok_or_else(|| StageError::new(STAGE, "bundle has no artifact to unpack"))?;
        let manifest = archive::read_manifest(&archive::manifest_path_for(&artifact))
            .map_err(|e| StageError::new(STAGE, format!("manifest: {e}")))?;

        archive::unpack_archive(&artifact, &self.warehouse_dir)
            .map_err(|e| StageError::new(STAGE, e.to_string()))?;

        // Verify and register each unpacked file.
        for entry in &manifest.files {
            let relative = entry.logical_name.trim_start_matches('/');
            let unpacked = self.warehouse_dir.join(relative);
            let actual = sha512_file(&unpacked)
                .map_err(|e| StageError::new(STAGE, format!("{relative}: {e}")))?;
            if actual != entry.sha512 {
                return Err(StageError::new(
                    STAGE,
                    format!("checksum mismatch on unpacked file {relative}"),
                ));
            }

            let logical_name = self.remap(&entry.logical_name);
            let warehouse_path = unpacked.to_string_lossy().to_string();
            self.catalog
                .create_file(CatalogFile {
                    uuid: entry.uuid.clone(),
                    logical_name: logical_name.clone(),
                    file_size: entry.size,
                    checksum: HashMap::from([("sha512".to_string(), entry.sha512.clone())]),
                    locations: vec![CatalogLocation {
                        site: bundle.dest.clone(),
                        path: warehouse_path,
                        archive: false,
                        date_archived: None,
                    }],
                })
                .await
                .map_err(|e| StageError::new(STAGE, e.to_string()))?;
        }

        info!(
            bundle = %bundle.uuid,
            files = manifest.files.len(),
            warehouse = %self.warehouse_dir.display(),
            "bundle unpacked and registered"
        );

        Ok(Outcome::Advance(Update::Bundle(BundleUpdate::advance(
            crate::output_status(STAGE, ctx)?,
        ))))
    }
}

#[cfg(test)]
#[path = "unpacker_tests.rs"]
mod tests;
