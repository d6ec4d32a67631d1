// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Metadata side-table: one row per (bundle, File-Catalog file).

use crate::id::BundleId;
use serde::{Deserialize, Serialize};

/// One entry of `POST /Metadata/actions/bulk_create`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMetadataRecord {
    pub bundle_uuid: BundleId,
    pub file_catalog_uuid: String,
}

/// A metadata row associating a File-Catalog file with a bundle.
///
/// Rows are created when a bundle is materialized and bulk-deleted when the
/// bundle becomes terminal; they are never updated in between.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub uuid: String,
    pub bundle_uuid: BundleId,
    pub file_catalog_uuid: String,
}
