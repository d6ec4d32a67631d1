// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! DESY verifier: re-read a replicated bundle over WebDAV, checksum it,
//! and register the archived replicas.
//!
//! The disk-destination twin of the NERSC verifier. The artifact is
//! streamed back over HTTP and hashed chunk by chunk; nothing touches the
//! local filesystem.

use crate::catalog::{CatalogLocation, FileCatalog};
use async_trait::async_trait;
use chrono::Utc;
use lta_core::{BundleChecksums, BundleUpdate};
use lta_harness::{
    ConfigError, Outcome, Stage, StageContext, StageError, Update, Work, WorkerConfig,
};
use sha2::{Digest, Sha512};
use std::sync::Arc;
use tracing::info;

const STAGE: &str = "desy-verifier";

pub struct DesyVerifier {
    catalog: Arc<dyn FileCatalog>,
    http: reqwest::Client,
    webdav_url: String,
}

impl DesyVerifier {
    pub fn from_config(config: &WorkerConfig) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ConfigError::Invalid {
                name: "WEBDAV_DEST_URL".to_string(),
                value: e.to_string(),
            })?;
        Ok(Self {
            catalog: crate::locator::catalog_from_config(config)?,
            http,
            webdav_url: config.var("WEBDAV_DEST_URL")?.trim_end_matches('/').to_string(),
        })
    }

    /// Stream the remote artifact and hash it.
    async fn remote_checksums(&self, url: &str) -> Result<(BundleChecksums, u64), StageError> {
        let mut response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| StageError::new(STAGE, format!("webdav read: {e}")))?;
        if !response.status().is_success() {
            return Err(StageError::new(
                STAGE,
                format!("webdav read: {} on {url}", response.status()),
            ));
        }

        let mut sha = Sha512::new();
        let mut adler = adler32::RollingAdler32::new();
        let mut total: u64 = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| StageError::new(STAGE, format!("webdav read: {e}")))?
        {
            sha.update(&chunk);
            adler.update_buffer(&chunk);
            total += chunk.len() as u64;
        }
        Ok((
            BundleChecksums {
                sha512: hex::encode(sha.finalize()),
                adler32: format!("{:08x}", adler.hash()),
            },
            total,
        ))
    }
}

#[async_trait]
impl Stage for DesyVerifier {
    fn name(&self) -> &'static str {
        "desy-verifier"
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
            .and_then(|n| n.to_str())
            .ok_or_else(|| StageError::new(STAGE, "bundle has no artifact path"))?;
        let url = format!("{}/{}", self.webdav_url, file_name);

        let (actual, size) = self.remote_checksums(&url).await?;
        if actual != expected {
            return Err(StageError::new(
                STAGE,
                format!(
                    "destination checksum mismatch (expected sha512 {}, got {})",
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

        let rows = ctx
            .coordinator
            .list_metadata(bundle.uuid.as_str())
            .await
            .map_err(|e| StageError::new(STAGE, e.to_string()))?;
        let now = Utc::now();
        for row in &rows {
            self.catalog
                .add_location(
                    &row.file_catalog_uuid,
                    CatalogLocation {
                        site: bundle.dest.clone(),
                        path: url.clone(),
                        archive: true,
                        date_archived: Some(now),
                    },
                )
                .await
                .map_err(|e| StageError::new(STAGE, e.to_string()))?;
        }

        info!(bundle = %bundle.uuid, url, "destination copy verified, replicas registered");

        let mut update = BundleUpdate::advance(crate::output_status(STAGE, ctx)?);
        update.verified = Some(true);
        Ok(Outcome::Advance(Update::Bundle(update)))
    }
}
