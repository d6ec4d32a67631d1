// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File Catalog client.
//!
//! The catalog is an external service recording where every warehouse file
//! lives. Stages consult it through the [`FileCatalog`] trait so tests can
//! substitute an in-memory fake; [`HttpFileCatalog`] is the production
//! implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("file catalog unavailable: {0}")]
    Unavailable(String),
    #[error("not found in file catalog: {0}")]
    NotFound(String),
    #[error("bad file catalog response: {0}")]
    BadResponse(String),
}

/// One replica of a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogLocation {
    pub site: String,
    pub path: String,
    /// True when the replica lives inside an archived bundle.
    #[serde(default)]
    pub archive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_archived: Option<DateTime<Utc>>,
}

/// A catalog record for one warehouse file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogFile {
    pub uuid: String,
    pub logical_name: String,
    pub file_size: u64,
    /// Checksums keyed by algorithm; `sha512` is always present.
    #[serde(default)]
    pub checksum: HashMap<String, String>,
    #[serde(default)]
    pub locations: Vec<CatalogLocation>,
}

impl CatalogFile {
    pub fn sha512(&self) -> Option<&str> {
        self.checksum.get("sha512").map(String::as_str)
    }

    /// The on-disk replica at `site`, if one exists outside an archive.
    pub fn disk_location_at(&self, site: &str) -> Option<&CatalogLocation> {
        self.locations
            .iter()
            .find(|loc| loc.site == site && !loc.archive)
    }

    /// The archived replica at `site`, if one exists.
    pub fn archive_location_at(&self, site: &str) -> Option<&CatalogLocation> {
        self.locations
            .iter()
            .find(|loc| loc.site == site && loc.archive)
    }
}

/// What the stages ask of the File Catalog.
#[async_trait]
pub trait FileCatalog: Send + Sync {
    /// All files whose logical name falls under `path`.
    async fn files_under(&self, path: &str) -> Result<Vec<CatalogFile>, CatalogError>;

    async fn file(&self, uuid: &str) -> Result<CatalogFile, CatalogError>;

    /// Register a new replica of an existing file.
    async fn add_location(&self, uuid: &str, location: CatalogLocation)
        -> Result<(), CatalogError>;

    /// Register a brand-new file (unpacked retrievals).
    async fn create_file(&self, file: CatalogFile) -> Result<(), CatalogError>;
}

/// Production client over reqwest.
pub struct HttpFileCatalog {
    http: reqwest::Client,
    base_url: String,
    bearer: Option<String>,
}

impl HttpFileCatalog {
    pub fn new(base_url: &str, bearer: Option<String>) -> Result<Self, CatalogError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| CatalogError::BadResponse(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            bearer,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(bearer) = &self.bearer {
            builder = builder.bearer_auth(bearer);
        }
        builder
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, CatalogError> {
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(
                response.url().path().to_string(),
            ));
        }
        if !status.is_success() {
            return Err(CatalogError::Unavailable(format!("{status}")));
        }
        Ok(response)
    }
}

#[async_trait]
impl FileCatalog for HttpFileCatalog {
    async fn files_under(&self, path: &str) -> Result<Vec<CatalogFile>, CatalogError> {
        #[derive(Deserialize)]
        struct Results {
            files: Vec<CatalogFile>,
        }
        let response = self
            .request(reqwest::Method::GET, "/api/files")
            .query(&[("directory", path)])
            .send()
            .await
            .map_err(|e| CatalogError::Unavailable(e.to_string()))?;
        let results: Results = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| CatalogError::BadResponse(e.to_string()))?;
        Ok(results.files)
    }

    async fn file(&self, uuid: &str) -> Result<CatalogFile, CatalogError> {
        let response = self
            .request(reqwest::Method::GET, &format!("/api/files/{uuid}"))
            .send()
            .await
            .map_err(|e| CatalogError::Unavailable(e.to_string()))?;
        Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| CatalogError::BadResponse(e.to_string()))
    }

    async fn add_location(
        &self,
        uuid: &str,
        location: CatalogLocation,
    ) -> Result<(), CatalogError> {
        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/api/files/{uuid}/locations"),
            )
            .json(&serde_json::json!({ "locations": [location] }))
            .send()
            .await
            .map_err(|e| CatalogError::Unavailable(e.to_string()))?;
        Self::check(response).await?;
        Ok(())
    }

    async fn create_file(&self, file: CatalogFile) -> Result<(), CatalogError> {
        let response = self
            .request(reqwest::Method::POST, "/api/files")
            .json(&file)
            .send()
            .await
            .map_err(|e| CatalogError::Unavailable(e.to_string()))?;
        Self::check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod tests;
