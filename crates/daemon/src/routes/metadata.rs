// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/Metadata` routes for the per-bundle file side-table.

use crate::auth::{AuthContext, Role};
use crate::error::ApiError;
use crate::AppState;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use lta_core::NewMetadataRecord;
use serde::Deserialize;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/Metadata", get(list))
        .route("/Metadata/actions/bulk_create", post(bulk_create))
        .route("/Metadata/actions/bulk_delete", post(bulk_delete))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    bundle_uuid: Option<String>,
}

async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    ctx.require(Role::Read)?;
    let results = state.store.list_metadata(query.bundle_uuid.as_deref());
    Ok(Json(serde_json::json!({ "results": results })))
}

#[derive(Debug, Deserialize)]
struct BulkCreateBody {
    metadata: Vec<NewMetadataRecord>,
}

async fn bulk_create(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(body): Json<BulkCreateBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    ctx.require(Role::System)?;
    if body.metadata.is_empty() {
        return Err(ApiError::BadRequest(
            "metadata must be non-empty".to_string(),
        ));
    }
    let created = state.store.bulk_create_metadata(body.metadata);
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "metadata": created })),
    ))
}

#[derive(Debug, Deserialize)]
struct BulkDeleteBody {
    metadata: Vec<String>,
}

async fn bulk_delete(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(body): Json<BulkDeleteBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    ctx.require(Role::System)?;
    let count = state.store.bulk_delete_metadata(&body.metadata);
    Ok(Json(serde_json::json!({ "count": count })))
}
