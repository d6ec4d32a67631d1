// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Locator: expand a retrieval request into located bundles.
//!
//! The symmetric twin of the picker: instead of inventing new bundles from
//! loose files, it finds the archived bundles that already cover the
//! requested path and creates one `located` bundle per distinct archive.

use crate::catalog::{CatalogError, FileCatalog, HttpFileCatalog};
use async_trait::async_trait;
use lta_core::{BundleStatus, NewBundle, RequestStatus, RequestUpdate};
use lta_harness::{
    ConfigError, Outcome, Stage, StageContext, StageError, Update, Work, WorkSource, WorkerConfig,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

const STAGE: &str = "locator";

/// Build the shared File Catalog client from worker config.
pub(crate) fn catalog_from_config(
    config: &WorkerConfig,
) -> Result<Arc<dyn FileCatalog>, ConfigError> {
    let base_url = config.var("FILE_CATALOG_REST_URL")?.to_string();
    let bearer = config.var_opt("FILE_CATALOG_REST_TOKEN").map(str::to_string);
    HttpFileCatalog::new(&base_url, bearer)
        .map(|catalog| Arc::new(catalog) as Arc<dyn FileCatalog>)
        .map_err(|e: CatalogError| ConfigError::Invalid {
            name: "FILE_CATALOG_REST_URL".to_string(),
            value: e.to_string(),
        })
}

pub struct Locator {
    catalog: Arc<dyn FileCatalog>,
}

impl Locator {
    pub fn from_config(config: &WorkerConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(catalog_from_config(config)?))
    }

    pub fn new(catalog: Arc<dyn FileCatalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Stage for Locator {
    fn name(&self) -> &'static str {
        "locator"
    }

    fn source(&self) -> WorkSource {
        WorkSource::TransferRequests
    }

    async fn run(&self, work: Work, ctx: &StageContext) -> Result<Outcome, StageError> {
        let request = crate::expect_request(STAGE, work)?;

        let files = self
            .catalog
            .files_under(&request.path)
            .await
            .map_err(|e| StageError::new(STAGE, e.to_string()))?;

        // Group files by the archive that holds their replica at the
        // retrieval source site.
        let mut by_archive: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for file in &files {
            if let Some(location) = file.archive_location_at(&request.source) {
                by_archive
                    .entry(location.path.clone())
                    .or_default()
                    .push(file.uuid.clone());
            }
        }
        if by_archive.is_empty() {
            return Err(StageError::new(
                STAGE,
                format!(
                    "no archived bundles at {} cover {}",
                    request.source, request.path
                ),
            ));
        }

        let bundles: Vec<NewBundle> = by_archive
            .into_iter()
            .map(|(archive_path, files)| NewBundle {
                request: request.uuid.clone(),
                source: request.source.clone(),
                dest: request.dest.clone(),
                path: request.path.clone(),
                status: BundleStatus::Located,
                files,
                bundle_path: Some(archive_path.into()),
                size: None,
                checksum: None,
            })
            .collect();

        let created = ctx
            .coordinator
            .bulk_create_bundles(bundles)
            .await
            .map_err(|e| StageError::new(STAGE, e.to_string()))?;

        info!(
            request = %request.uuid,
            bundles = created.len(),
            "located archived bundles"
        );

        Ok(Outcome::Advance(Update::Request(RequestUpdate::advance(
            RequestStatus::Processing,
        ))))
    }
}

#[cfg(test)]
#[path = "locator_tests.rs"]
mod tests;
