// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Picker: expand an archival transfer request into specified bundles.
//!
//! Queries the File Catalog for every file under the request path, batches
//! them by size and count, and bulk-creates one bundle per batch. The file
//! lists ride along in the bulk-create and land in the Metadata side-table.

use crate::catalog::FileCatalog;
use async_trait::async_trait;
use lta_core::{BundleStatus, NewBundle, RequestStatus, RequestUpdate};
use lta_harness::{
    ConfigError, Outcome, Stage, StageContext, StageError, Update, Work, WorkSource, WorkerConfig,
};
use std::sync::Arc;
use tracing::info;

const STAGE: &str = "picker";

/// Default cap on one bundle's payload: 100 GiB.
const DEFAULT_MAX_BUNDLE_SIZE: u64 = 100 * 1024 * 1024 * 1024;
/// Default cap on files per bundle.
const DEFAULT_MAX_BUNDLE_COUNT: u64 = 10_000;

pub struct Picker {
    catalog: Arc<dyn FileCatalog>,
    max_bundle_size: u64,
    max_bundle_count: usize,
}

impl Picker {
    pub fn from_config(config: &WorkerConfig) -> Result<Self, ConfigError> {
        let catalog = crate::locator::catalog_from_config(config)?;
        Ok(Self::new(
            catalog,
            config.var_num("PICKER_MAX_BUNDLE_SIZE", DEFAULT_MAX_BUNDLE_SIZE)?,
            config.var_num("PICKER_MAX_BUNDLE_COUNT", DEFAULT_MAX_BUNDLE_COUNT)? as usize,
        ))
    }

    pub fn new(
        catalog: Arc<dyn FileCatalog>,
        max_bundle_size: u64,
        max_bundle_count: usize,
    ) -> Self {
        Self {
            catalog,
            max_bundle_size,
            max_bundle_count: max_bundle_count.max(1),
        }
    }
}

#[async_trait]
impl Stage for Picker {
    fn name(&self) -> &'static str {
        "picker"
    }

    fn source(&self) -> WorkSource {
        WorkSource::TransferRequests
    }

    async fn run(&self, work: Work, ctx: &StageContext) -> Result<Outcome, StageError> {
        let request = crate::expect_request(STAGE, work)?;

        let mut files = self
            .catalog
            .files_under(&request.path)
            .await
            .map_err(|e| StageError::new(STAGE, e.to_string()))?;
        if files.is_empty() {
            return Err(StageError::new(
                STAGE,
                format!("no files in catalog under {}", request.path),
            ));
        }
        files.sort_by(|a, b| a.logical_name.cmp(&b.logical_name));

        // Greedy batching: a bundle closes when either cap would overflow.
        let mut bundles: Vec<NewBundle> = Vec::new();
        let mut batch: Vec<String> = Vec::new();
        let mut batch_size: u64 = 0;
        for file in &files {
            let would_overflow = !batch.is_empty()
                && (batch_size + file.file_size > self.max_bundle_size
                    || batch.len() >= self.max_bundle_count);
            if would_overflow {
                bundles.push(self.new_bundle(&request, std::mem::take(&mut batch)));
                batch_size = 0;
            }
            batch.push(file.uuid.clone());
            batch_size += file.file_size;
        }
        if !batch.is_empty() {
            bundles.push(self.new_bundle(&request, batch));
        }

        let created = ctx
            .coordinator
            .bulk_create_bundles(bundles)
            .await
            .map_err(|e| StageError::new(STAGE, e.to_string()))?;

        info!(
            request = %request.uuid,
            files = files.len(),
            bundles = created.len(),
            "expanded transfer request"
        );

        Ok(Outcome::Advance(Update::Request(RequestUpdate::advance(
            RequestStatus::Processing,
        ))))
    }
}

impl Picker {
    fn new_bundle(&self, request: &lta_core::TransferRequest, files: Vec<String>) -> NewBundle {
        NewBundle {
            request: request.uuid.clone(),
            source: request.source.clone(),
            dest: request.dest.clone(),
            path: request.path.clone(),
            status: BundleStatus::Specified,
            files,
            bundle_path: None,
            size: None,
            checksum: None,
        }
    }
}

#[cfg(test)]
#[path = "picker_tests.rs"]
mod tests;
