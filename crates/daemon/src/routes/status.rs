// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/status` routes: heartbeat upserts and dashboard aggregates.

use crate::auth::{AuthContext, Role};
use crate::error::ApiError;
use crate::AppState;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Extension, Json, Router};
use lta_core::HeartbeatRecord;
use serde_json::{json, Value};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/status", get(overall))
        .route("/status/nersc", get(nersc))
        .route("/status/:component_type", get(component).patch(heartbeat))
        .route("/status/:component_type/count", get(count))
}

/// Dashboard summary: bundle counts per status, live workers per type.
async fn overall(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<Value>, ApiError> {
    ctx.require(Role::Read)?;
    Ok(Json(json!({
        "health": "OK",
        "bundles": state.store.bundle_status_counts(),
        "components": state.store.component_counts(),
    })))
}

fn records_as_object(records: Vec<HeartbeatRecord>) -> Value {
    let mut map = serde_json::Map::new();
    for record in records {
        map.insert(
            record.component_name.clone(),
            json!({
                "timestamp": record.timestamp,
                "payload": record.payload,
            }),
        );
    }
    Value::Object(map)
}

async fn component(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(component_type): Path<String>,
) -> Result<Json<Value>, ApiError> {
    ctx.require(Role::Read)?;
    Ok(Json(records_as_object(
        state.store.heartbeats_for(&component_type),
    )))
}

async fn count(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(component_type): Path<String>,
) -> Result<Json<Value>, ApiError> {
    ctx.require(Role::Read)?;
    let count = state
        .store
        .component_counts()
        .get(&component_type)
        .copied()
        .unwrap_or(0);
    Ok(Json(json!({
        "component_type": component_type,
        "count": count,
    })))
}

/// Tape-pipeline dashboard: every `nersc-*` component's latest heartbeat.
async fn nersc(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<Value>, ApiError> {
    ctx.require(Role::Read)?;
    let mut map = serde_json::Map::new();
    for record in state.store.heartbeats() {
        if record.component_type.starts_with("nersc-") {
            map.entry(record.component_type.clone())
                .or_insert_with(|| Value::Object(serde_json::Map::new()));
            if let Some(Value::Object(by_name)) = map.get_mut(&record.component_type) {
                by_name.insert(
                    record.component_name.clone(),
                    json!({
                        "timestamp": record.timestamp,
                        "payload": record.payload,
                    }),
                );
            }
        }
    }
    Ok(Json(Value::Object(map)))
}

/// Heartbeat upsert: body maps component names to status payloads.
async fn heartbeat(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(component_type): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    ctx.require(Role::System)?;
    let Value::Object(entries) = body else {
        return Err(ApiError::BadRequest(
            "heartbeat body must map component names to payloads".to_string(),
        ));
    };
    for (component_name, payload) in entries {
        state
            .store
            .record_heartbeat(&component_type, &component_name, payload);
    }
    Ok(Json(json!({ "status": "OK" })))
}
