// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bundle archive I/O: the tar container and its JSON manifest side-car.
//!
//! The container is a plain uncompressed tar holding the constituent files
//! under their warehouse-relative names. The side-car
//! (`<uuid>.metadata.json`) carries the bundle's manifest and is read back
//! verbatim by the verifiers and the unpacker.

use lta_core::BundleChecksums;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("manifest error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One constituent file of a bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestFile {
    /// File Catalog identifier.
    pub uuid: String,
    /// Warehouse-relative logical name; doubles as the tar entry name.
    pub logical_name: String,
    pub size: u64,
    pub sha512: String,
}

/// The side-car manifest written alongside every bundle archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleManifest {
    pub uuid: String,
    pub request: String,
    pub source: String,
    pub dest: String,
    pub path: String,
    pub files: Vec<ManifestFile>,
    /// Checksums of the archive itself, filled in after the tar is built.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<BundleChecksums>,
}

/// Side-car path for a given archive path (`x.tar` → `x.metadata.json`).
pub fn manifest_path_for(archive_path: &Path) -> PathBuf {
    archive_path.with_extension("metadata.json")
}

/// Build the tar container from `(disk_path, entry_name)` pairs.
///
/// Entry names keep the warehouse-relative layout so the unpacker restores
/// files where they came from. Returns the archive size in bytes.
pub fn write_archive(
    archive_path: &Path,
    entries: &[(PathBuf, String)],
) -> Result<u64, ArchiveError> {
    if let Some(parent) = archive_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(archive_path)?;
    let mut builder = tar::Builder::new(BufWriter::new(file));
    for (disk_path, entry_name) in entries {
        let mut source = File::open(disk_path)?;
        builder.append_file(entry_name.trim_start_matches('/'), &mut source)?;
    }
    let writer = builder.into_inner()?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    Ok(std::fs::metadata(archive_path)?.len())
}

/// Unpack the container into `dest_dir`, returning the extracted paths.
pub fn unpack_archive(archive_path: &Path, dest_dir: &Path) -> Result<Vec<PathBuf>, ArchiveError> {
    std::fs::create_dir_all(dest_dir)?;
    let file = File::open(archive_path)?;
    let mut archive = tar::Archive::new(BufReader::new(file));
    let mut extracted = Vec::new();
    for entry in archive.entries()? {
        let mut entry = entry?;
        let relative = entry.path()?.into_owned();
        entry.unpack_in(dest_dir)?;
        extracted.push(dest_dir.join(relative));
    }
    Ok(extracted)
}

pub fn write_manifest(path: &Path, manifest: &BundleManifest) -> Result<(), ArchiveError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), manifest)?;
    Ok(())
}

pub fn read_manifest(path: &Path) -> Result<BundleManifest, ArchiveError> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

#[cfg(test)]
#[path = "archive_tests.rs"]
mod tests;
