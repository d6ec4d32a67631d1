// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/TransferRequests` routes.

use crate::auth::{AuthContext, Role};
use crate::error::ApiError;
use crate::routes::{fence_for, project};
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use lta_core::{NewTransferRequest, RequestStatus, RequestUpdate, TransferRequest};
use lta_storage::RequestFilter;
use serde::Deserialize;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/TransferRequests", get(list).post(create))
        .route(
            "/TransferRequests/:uuid",
            get(get_one).patch(patch).delete(delete),
        )
        .route("/TransferRequests/actions/pop", post(pop))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    status: Option<String>,
    source: Option<String>,
    dest: Option<String>,
    fields: Option<String>,
}

async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    ctx.require(Role::Read)?;
    let filter = RequestFilter {
        status: query
            .status
            .as_deref()
            .map(str::parse)
            .transpose()
            .map_err(|e: lta_core::StatusParseError| ApiError::BadRequest(e.to_string()))?,
        source: query.source,
        dest: query.dest,
    };
    let results: Vec<_> = state
        .store
        .list_requests(&filter)
        .into_iter()
        .map(|r| project(serde_json::json!(r), query.fields.as_deref()))
        .collect();
    Ok(Json(serde_json::json!({ "results": results })))
}

async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(new): Json<NewTransferRequest>,
) -> Result<(StatusCode, Json<TransferRequest>), ApiError> {
    ctx.require(Role::System)?;
    let request = state.store.create_request(new);
    Ok((StatusCode::CREATED, Json(request)))
}

async fn get_one(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(uuid): Path<String>,
) -> Result<Json<TransferRequest>, ApiError> {
    ctx.require(Role::Read)?;
    Ok(Json(state.store.get_request(&uuid)?))
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
    Json(update): Json<RequestUpdate>,
) -> Result<Json<TransferRequest>, ApiError> {
    ctx.require(Role::System)?;
    // Un-quarantining is admin recovery, never worker traffic. The check
    // keys off the stored status, so naming a claimant cannot route
    // around it (a quarantined request is always unclaimed).
    let current = state.store.get_request(&uuid)?;
    if current.status == RequestStatus::Quarantined
        && update.status.is_some_and(|s| s != RequestStatus::Quarantined)
    {
        ctx.require(Role::Admin)?;
    }
    let fence = fence_for(&ctx, query.claimant.as_deref())?;
    Ok(Json(state.store.update_request(&uuid, fence, update)?))
}

async fn delete(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(uuid): Path<String>,
) -> Result<StatusCode, ApiError> {
    ctx.require(Role::Admin)?;
    state.store.delete_request(&uuid)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct PopQuery {
    source: Option<String>,
    dest: Option<String>,
    claimant: Option<String>,
}

async fn pop(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<PopQuery>,
) -> Result<Json<Option<TransferRequest>>, ApiError> {
    ctx.require(Role::System)?;
    let claimant = query
        .claimant
        .as_deref()
        .ok_or_else(|| ApiError::BadRequest("claimant is required".to_string()))?;
    Ok(Json(state.store.pop_request(
        query.source.as_deref(),
        query.dest.as_deref(),
        claimant,
    )))
}
