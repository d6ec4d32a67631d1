// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fakes and fixtures for stage tests.

use crate::catalog::{CatalogError, CatalogFile, CatalogLocation, FileCatalog};
use crate::gridftp::ByteMover;
use crate::hsi::TapeClient;
use async_trait::async_trait;
use lta_harness::test_support::FakeCoordinator;
use lta_harness::{StageContext, WorkerConfig};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Build a stage context around a fake coordinator.
pub fn stage_ctx(coordinator: Arc<FakeCoordinator>, output_status: &str) -> StageContext {
    let vars: HashMap<String, String> = [
        ("COMPONENT_NAME", "test-worker"),
        ("SOURCE_SITE", "WIPAC"),
        ("DEST_SITE", "NERSC"),
        ("INPUT_STATUS", "specified"),
        ("OUTPUT_STATUS", output_status),
        ("LTA_REST_URL", "http://localhost:8080"),
        ("LTA_AUTH_OPENID_URL", "http://localhost:8081"),
        ("CLIENT_ID", "test"),
        ("CLIENT_SECRET", "test"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    StageContext {
        coordinator,
        config: WorkerConfig::from_vars(vars).unwrap(),
    }
}

pub fn write_file(dir: &Path, relative: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(relative.trim_start_matches('/'));
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, contents).unwrap();
    path
}

pub fn catalog_file(
    uuid: &str,
    logical_name: &str,
    size: u64,
    sha512: &str,
    locations: Vec<CatalogLocation>,
) -> CatalogFile {
    CatalogFile {
        uuid: uuid.to_string(),
        logical_name: logical_name.to_string(),
        file_size: size,
        checksum: HashMap::from([("sha512".to_string(), sha512.to_string())]),
        locations,
    }
}

pub fn disk_location(site: &str, path: &Path) -> CatalogLocation {
    CatalogLocation {
        site: site.to_string(),
        path: path.to_string_lossy().to_string(),
        archive: false,
        date_archived: None,
    }
}

pub fn archive_location(site: &str, path: &str) -> CatalogLocation {
    CatalogLocation {
        site: site.to_string(),
        path: path.to_string(),
        archive: true,
        date_archived: None,
    }
}

/// In-memory File Catalog.
#[derive(Default)]
pub struct FakeCatalog {
    pub files: Mutex<Vec<CatalogFile>>,
    pub created: Mutex<Vec<CatalogFile>>,
    pub added_locations: Mutex<Vec<(String, CatalogLocation)>>,
}

impl FakeCatalog {
    pub fn with_files(files: Vec<CatalogFile>) -> Arc<Self> {
        Arc::new(Self {
            files: Mutex::new(files),
            ..Self::default()
        })
    }
}

#[async_trait]
impl FileCatalog for FakeCatalog {
    async fn files_under(&self, path: &str) -> Result<Vec<CatalogFile>, CatalogError> {
        Ok(self
            .files
            .lock()
            .iter()
            .filter(|f| f.logical_name.starts_with(path))
            .cloned()
            .collect())
    }

    async fn file(&self, uuid: &str) -> Result<CatalogFile, CatalogError> {
        self.files
            .lock()
            .iter()
            .find(|f| f.uuid == uuid)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(uuid.to_string()))
    }

    async fn add_location(
        &self,
        uuid: &str,
        location: CatalogLocation,
    ) -> Result<(), CatalogError> {
        self.added_locations
            .lock()
            .push((uuid.to_string(), location));
        Ok(())
    }

    async fn create_file(&self, file: CatalogFile) -> Result<(), CatalogError> {
        self.created.lock().push(file);
        Ok(())
    }
}

/// In-memory tape: `put` captures bytes, `get` writes them back.
pub struct FakeTape {
    pub available: bool,
    pub store: Mutex<HashMap<String, Vec<u8>>>,
}

impl FakeTape {
    pub fn empty() -> Arc<Self> {
        Arc::new(Self {
            available: true,
            store: Mutex::new(HashMap::new()),
        })
    }
}

#[async_trait]
impl TapeClient for FakeTape {
    async fn available(&self) -> bool {
        self.available
    }

    async fn put(&self, local: &Path, tape_path: &str) -> Result<(), String> {
        let bytes = std::fs::read(local).map_err(|e| e.to_string())?;
        self.store.lock().insert(tape_path.to_string(), bytes);
        Ok(())
    }

    async fn get(&self, tape_path: &str, local: &Path) -> Result<(), String> {
        let bytes = self
            .store
            .lock()
            .get(tape_path)
            .cloned()
            .ok_or_else(|| format!("no such tape file: {tape_path}"))?;
        if let Some(parent) = local.parent() {
            std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        std::fs::write(local, bytes).map_err(|e| e.to_string())
    }
}

/// Scriptable byte mover.
#[derive(Default)]
pub struct FakeMover {
    /// Copies that fail before the first success.
    pub failures_remaining: Mutex<u32>,
    /// What `completed` answers after a failed copy.
    pub complete_despite_failure: bool,
    pub copied: Mutex<Vec<(PathBuf, String)>>,
}

#[async_trait]
impl ByteMover for FakeMover {
    async fn copy(&self, local: &Path, remote_url: &str) -> Result<(), String> {
        let mut failures = self.failures_remaining.lock();
        if *failures > 0 {
            *failures -= 1;
            return Err("globus-url-copy: exit code 1".to_string());
        }
        self.copied
            .lock()
            .push((local.to_path_buf(), remote_url.to_string()));
        Ok(())
    }

    async fn completed(&self, _local: &Path, _remote_url: &str) -> bool {
        self.complete_despite_failure
    }
}
