// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/Bundles` routes, including the POP claim primitive.

use crate::auth::{AuthContext, Role};
use crate::error::ApiError;
use crate::routes::{fence_for, project};
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use lta_core::{Bundle, BundleStatus, BundleUpdate, NewBundle};
use lta_storage::{BundleFilter, Page};
use serde::Deserialize;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/Bundles", get(list))
        .route("/Bundles/actions/bulk_create", post(bulk_create))
        .route("/Bundles/actions/pop", post(pop))
        .route("/Bundles/:uuid", get(get_one).patch(patch).delete(delete))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    status: Option<String>,
    source: Option<String>,
    dest: Option<String>,
    verified: Option<bool>,
    request: Option<String>,
    after: Option<String>,
    limit: Option<usize>,
    fields: Option<String>,
}

async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    ctx.require(Role::Read)?;
    let filter = BundleFilter {
        status: parse_status(query.status.as_deref())?,
        source: query.source,
        dest: query.dest,
        verified: query.verified,
        request: query.request,
    };
    let page = Page {
        after: query.after,
        limit: query.limit,
    };
    let results: Vec<_> = state
        .store
        .list_bundles(&filter, &page)
        .into_iter()
        .map(|b| project(serde_json::json!(b), query.fields.as_deref()))
        .collect();
    Ok(Json(serde_json::json!({ "results": results })))
}

#[derive(Debug, Deserialize)]
struct BulkCreateBody {
    bundles: Vec<NewBundle>,
}

async fn bulk_create(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(body): Json<BulkCreateBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    ctx.require(Role::System)?;
    if body.bundles.is_empty() {
        return Err(ApiError::BadRequest("bundles must be non-empty".to_string()));
    }
    let created = state.store.bulk_create_bundles(body.bundles);
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "bundles": created })),
    ))
}

async fn get_one(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(uuid): Path<String>,
) -> Result<Json<Bundle>, ApiError> {
    ctx.require(Role::Read)?;
    Ok(Json(state.store.get_bundle(&uuid)?))
}

#[derive(Debug, Deserialize)]
struct PatchQuery {
    claimant: Option<String>,
}

async fn patch(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(uuid): Path<String>,
    Query(query): Query<PatchQuery>,
    Json(update): Json<BundleUpdate>,
) -> Result<Json<Bundle>, ApiError> {
    ctx.require(Role::System)?;
    // Un-quarantining is admin recovery, never worker traffic. The check
    // keys off the stored status, so naming a claimant cannot route
    // around it (a quarantined bundle is always unclaimed).
    let current = state.store.get_bundle(&uuid)?;
    if current.status == BundleStatus::Quarantined
        && update.status.is_some_and(|s| s != BundleStatus::Quarantined)
    {
        ctx.require(Role::Admin)?;
    }
    let fence = fence_for(&ctx, query.claimant.as_deref())?;
    Ok(Json(state.store.update_bundle(&uuid, fence, update)?))
}

async fn delete(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(uuid): Path<String>,
) -> Result<StatusCode, ApiError> {
    ctx.require(Role::Admin)?;
    state.store.delete_bundle(&uuid)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct PopQuery {
    status: String,
    source: Option<String>,
    dest: Option<String>,
    claimant: Option<String>,
}

async fn pop(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<PopQuery>,
) -> Result<Json<Option<Bundle>>, ApiError> {
    ctx.require(Role::System)?;
    let claimant = query
        .claimant
        .as_deref()
        .ok_or_else(|| ApiError::BadRequest("claimant is required".to_string()))?;
    let status: BundleStatus = query
        .status
        .parse()
        .map_err(|e: lta_core::StatusParseError| ApiError::BadRequest(e.to_string()))?;
    Ok(Json(state.store.pop_bundle(
        status,
        query.source.as_deref(),
        query.dest.as_deref(),
        claimant,
    )))
}

fn parse_status(raw: Option<&str>) -> Result<Option<BundleStatus>, ApiError> {
    raw.map(str::parse)
        .transpose()
        .map_err(|e: lta_core::StatusParseError| ApiError::BadRequest(e.to_string()))
}
