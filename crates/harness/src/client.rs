// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordinator HTTP client.
//!
//! The [`Coordinator`] trait is the seam between the harness and the REST
//! service; stages and the work loop only see the trait, so tests drive
//! them with an in-memory fake. The [`HttpCoordinator`] implementation
//! retries transient failures with exponential backoff and maps a 409 to
//! [`ClientError::ClaimLost`], which callers treat as "the work was
//! reassigned, drop it".

use crate::token::TokenSource;
use async_trait::async_trait;
use lta_core::{
    Bundle, BundleUpdate, MetadataRecord, NewBundle, NewMetadataRecord, RequestUpdate,
    TransferRequest,
};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Credentials rejected; fatal for the worker.
    #[error("authentication failed: {0}")]
    Auth(String),
    /// The claim was reassigned while we held it; drop the work.
    #[error("claim lost: {0}")]
    ClaimLost(String),
    /// Coordinator unreachable or 5xx after all retries.
    #[error("coordinator unavailable: {0}")]
    Unavailable(String),
    /// The coordinator answered with something unusable.
    #[error("bad response: {0}")]
    BadResponse(String),
}

/// Everything a worker asks of the coordinator.
#[async_trait]
pub trait Coordinator: Send + Sync {
    async fn pop_request(
        &self,
        source: &str,
        dest: &str,
        claimant: &str,
    ) -> Result<Option<TransferRequest>, ClientError>;

    async fn pop_bundle(
        &self,
        status: &str,
        source: &str,
        dest: &str,
        claimant: &str,
    ) -> Result<Option<Bundle>, ClientError>;

    async fn update_request(
        &self,
        uuid: &str,
        claimant: &str,
        update: RequestUpdate,
    ) -> Result<TransferRequest, ClientError>;

    async fn update_bundle(
        &self,
        uuid: &str,
        claimant: &str,
        update: BundleUpdate,
    ) -> Result<Bundle, ClientError>;

    async fn bulk_create_bundles(&self, bundles: Vec<NewBundle>) -> Result<Vec<Bundle>, ClientError>;

    async fn bulk_create_metadata(
        &self,
        records: Vec<NewMetadataRecord>,
    ) -> Result<usize, ClientError>;

    async fn bulk_delete_metadata(&self, uuids: Vec<String>) -> Result<usize, ClientError>;

    /// List bundles, optionally narrowed to one request and/or status.
    async fn list_bundles(
        &self,
        request: Option<&str>,
        status: Option<&str>,
    ) -> Result<Vec<Bundle>, ClientError>;

    async fn list_metadata(&self, bundle_uuid: &str) -> Result<Vec<MetadataRecord>, ClientError>;

    async fn record_heartbeat(
        &self,
        component_type: &str,
        component_name: &str,
        payload: serde_json::Value,
        timeout: Duration,
    ) -> Result<(), ClientError>;
}

/// Production client over reqwest.
pub struct HttpCoordinator {
    http: reqwest::Client,
    base_url: String,
    tokens: TokenSource,
    retries: u32,
    timeout: Duration,
}

impl HttpCoordinator {
    pub fn new(
        base_url: &str,
        tokens: TokenSource,
        retries: u32,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ClientError::BadResponse(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
            retries,
            timeout,
        })
    }

    /// Issue one request with per-attempt timeout, retrying transport
    /// errors and 5xx with exponential backoff.
    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<serde_json::Value>,
        timeout: Duration,
        retries: u32,
    ) -> Result<reqwest::Response, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        let mut delay = Duration::from_secs(1);

        for attempt in 0..=retries {
            let bearer = self.tokens.bearer().await?;
            let mut request = self
                .http
                .request(method.clone(), &url)
                .query(query)
                .bearer_auth(bearer)
                .timeout(timeout);
            if let Some(body) = &body {
                request = request.json(body);
            }

            match request.send().await {
                Ok(response) if response.status().is_server_error() => {
                    warn!(
                        attempt,
                        status = %response.status(),
                        %url,
                        "coordinator returned server error, retrying"
                    );
                }
                Ok(response) => return Ok(response),
                Err(e) => {
                    warn!(attempt, error = %e, %url, "coordinator request failed, retrying");
                }
            }

            if attempt < retries {
                tokio::time::sleep(delay).await;
                delay = delay.saturating_mul(2);
            }
        }

        Err(ClientError::Unavailable(format!(
            "{url} failed after {} attempts",
            retries + 1
        )))
    }

    async fn json_or_error<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        if status == StatusCode::CONFLICT {
            let detail = response.text().await.unwrap_or_default();
            return Err(ClientError::ClaimLost(detail));
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ClientError::Auth(format!("coordinator returned {status}")));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ClientError::BadResponse(format!("{status}: {detail}")));
        }
        response
            .json()
            .await
            .map_err(|e| ClientError::BadResponse(e.to_string()))
    }
}

#[async_trait]
impl Coordinator for HttpCoordinator {
    async fn pop_request(
        &self,
        source: &str,
        dest: &str,
        claimant: &str,
    ) -> Result<Option<TransferRequest>, ClientError> {
        let response = self
            .send(
                Method::POST,
                "/TransferRequests/actions/pop",
                &[("source", source), ("dest", dest), ("claimant", claimant)],
                None,
                self.timeout,
                self.retries,
            )
            .await?;
        Self::json_or_error(response).await
    }

    async fn pop_bundle(
        &self,
        status: &str,
        source: &str,
        dest: &str,
        claimant: &str,
    ) -> Result<Option<Bundle>, ClientError> {
        let response = self
            .send(
                Method::POST,
                "/Bundles/actions/pop",
                &[
                    ("status", status),
                    ("source", source),
                    ("dest", dest),
                    ("claimant", claimant),
                ],
                None,
                self.timeout,
                self.retries,
            )
            .await?;
        Self::json_or_error(response).await
    }

    async fn update_request(
        &self,
        uuid: &str,
        claimant: &str,
        update: RequestUpdate,
    ) -> Result<TransferRequest, ClientError> {
        let response = self
            .send(
                Method::PATCH,
                &format!("/TransferRequests/{uuid}"),
                &[("claimant", claimant)],
                Some(serde_json::json!(update)),
                self.timeout,
                self.retries,
            )
            .await?;
        Self::json_or_error(response).await
    }

    async fn update_bundle(
        &self,
        uuid: &str,
        claimant: &str,
        update: BundleUpdate,
    ) -> Result<Bundle, ClientError> {
        let response = self
            .send(
                Method::PATCH,
                &format!("/Bundles/{uuid}"),
                &[("claimant", claimant)],
                Some(serde_json::json!(update)),
                self.timeout,
                self.retries,
            )
            .await?;
        Self::json_or_error(response).await
    }

    async fn bulk_create_bundles(
        &self,
        bundles: Vec<NewBundle>,
    ) -> Result<Vec<Bundle>, ClientError> {
        #[derive(serde::Deserialize)]
        struct Created {
            bundles: Vec<Bundle>,
        }
        let response = self
            .send(
                Method::POST,
                "/Bundles/actions/bulk_create",
                &[],
                Some(serde_json::json!({ "bundles": bundles })),
                self.timeout,
                self.retries,
            )
            .await?;
        let created: Created = Self::json_or_error(response).await?;
        Ok(created.bundles)
    }

    async fn bulk_create_metadata(
        &self,
        records: Vec<NewMetadataRecord>,
    ) -> Result<usize, ClientError> {
        #[derive(serde::Deserialize)]
        struct Created {
            metadata: Vec<MetadataRecord>,
        }
        let response = self
            .send(
                Method::POST,
                "/Metadata/actions/bulk_create",
                &[],
                Some(serde_json::json!({ "metadata": records })),
                self.timeout,
                self.retries,
            )
            .await?;
        let created: Created = Self::json_or_error(response).await?;
        Ok(created.metadata.len())
    }

    async fn bulk_delete_metadata(&self, uuids: Vec<String>) -> Result<usize, ClientError> {
        #[derive(serde::Deserialize)]
        struct Deleted {
            count: usize,
        }
        let response = self
            .send(
                Method::POST,
                "/Metadata/actions/bulk_delete",
                &[],
                Some(serde_json::json!({ "metadata": uuids })),
                self.timeout,
                self.retries,
            )
            .await?;
        let deleted: Deleted = Self::json_or_error(response).await?;
        Ok(deleted.count)
    }

    async fn list_bundles(
        &self,
        request: Option<&str>,
        status: Option<&str>,
    ) -> Result<Vec<Bundle>, ClientError> {
        #[derive(serde::Deserialize)]
        struct Results {
            results: Vec<Bundle>,
        }
        let mut query: Vec<(&str, &str)> = Vec::new();
        if let Some(request) = request {
            query.push(("request", request));
        }
        if let Some(status) = status {
            query.push(("status", status));
        }
        let response = self
            .send(
                Method::GET,
                "/Bundles",
                &query,
                None,
                self.timeout,
                self.retries,
            )
            .await?;
        let results: Results = Self::json_or_error(response).await?;
        Ok(results.results)
    }

    async fn list_metadata(&self, bundle_uuid: &str) -> Result<Vec<MetadataRecord>, ClientError> {
        #[derive(serde::Deserialize)]
        struct Results {
            results: Vec<MetadataRecord>,
        }
        let response = self
            .send(
                Method::GET,
                "/Metadata",
                &[("bundle_uuid", bundle_uuid)],
                None,
                self.timeout,
                self.retries,
            )
            .await?;
        let results: Results = Self::json_or_error(response).await?;
        Ok(results.results)
    }

    async fn record_heartbeat(
        &self,
        component_type: &str,
        component_name: &str,
        payload: serde_json::Value,
        timeout: Duration,
    ) -> Result<(), ClientError> {
        let mut body = serde_json::Map::new();
        body.insert(component_name.to_string(), payload);
        let response = self
            .send(
                Method::PATCH,
                &format!("/status/{component_type}"),
                &[],
                Some(serde_json::Value::Object(body)),
                timeout,
                // The heartbeat loop drives its own retry budget.
                0,
            )
            .await?;
        let _: serde_json::Value = Self::json_or_error(response).await?;
        Ok(())
    }
}
