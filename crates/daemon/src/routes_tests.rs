// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::auth::TokenClaims;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::TimeZone;
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use lta_core::{FakeClock, LabeledIds};
use lta_storage::Store;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const SECRET: &str = "test-secret";

fn test_app() -> (axum::Router, Store, FakeClock) {
    let clock = FakeClock::at(chrono::Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap());
    let store = Store::with_parts(
        Arc::new(clock.clone()),
        Arc::new(LabeledIds::new("doc")),
    );
    let state = AppState::new(
        store.clone(),
        crate::auth::AuthConfig {
            secret: SECRET.to_string(),
            audience: "long-term-archive".to_string(),
        },
    );
    (router(state), store, clock)
}

fn token(roles: &[&str]) -> String {
    let claims = TokenClaims {
        sub: "test-caller".to_string(),
        aud: "long-term-archive".to_string(),
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
        roles: roles.iter().map(|r| r.to_string()).collect(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

fn request(method: &str, uri: &str, roles: &[&str], body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token(roles)));
    match body {
        Some(value) => builder
            .header("content-type", "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &axum::Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn new_request_body() -> Value {
    json!({
        "source": "WIPAC",
        "dest": "NERSC",
        "path": "/data/exp/IceCube/2013/filtered/PFFilt/1109",
    })
}

fn bulk_create_body(status: &str, files: Vec<&str>) -> Value {
    json!({
        "bundles": [{
            "request": "req-1",
            "source": "WIPAC",
            "dest": "NERSC",
            "path": "/data/exp/IceCube/2013/filtered/PFFilt/1109",
            "status": status,
            "files": files,
        }]
    })
}

// === Auth ===

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let (app, _, _) = test_app();
    let req = Request::builder()
        .method("GET")
        .uri("/TransferRequests")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn read_scope_cannot_mutate() {
    let (app, _, _) = test_app();
    let (status, _) = send(
        &app,
        request("POST", "/TransferRequests", &[], Some(new_request_body())),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn read_scope_can_list() {
    let (app, _, _) = test_app();
    let (status, body) = send(&app, request("GET", "/TransferRequests", &[], None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"], json!([]));
}

// === Transfer requests ===

#[tokio::test]
async fn create_then_pop_claims_the_request() {
    let (app, _, _) = test_app();
    let (status, created) = send(
        &app,
        request(
            "POST",
            "/TransferRequests",
            &["system"],
            Some(new_request_body()),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "ethereal");

    let (status, popped) = send(
        &app,
        request(
            "POST",
            "/TransferRequests/actions/pop?source=WIPAC&claimant=picker-01",
            &["system"],
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(popped["uuid"], created["uuid"]);
    assert_eq!(popped["claimed"], true);
    assert_eq!(popped["claimant"], "picker-01");

    // Nothing else to claim.
    let (_, empty) = send(
        &app,
        request(
            "POST",
            "/TransferRequests/actions/pop?claimant=picker-01",
            &["system"],
            None,
        ),
    )
    .await;
    assert_eq!(empty, Value::Null);
}

#[tokio::test]
async fn pop_without_claimant_is_bad_request() {
    let (app, _, _) = test_app();
    let (status, _) = send(
        &app,
        request("POST", "/TransferRequests/actions/pop", &["system"], None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unfenced_patch_requires_admin() {
    let (app, _, _) = test_app();
    let (_, created) = send(
        &app,
        request(
            "POST",
            "/TransferRequests",
            &["system"],
            Some(new_request_body()),
        ),
    )
    .await;
    let uuid = created["uuid"].as_str().unwrap();

    let (status, _) = send(
        &app,
        request(
            "PATCH",
            &format!("/TransferRequests/{uuid}"),
            &["system"],
            Some(json!({"work_priority_timestamp": "2026-02-01T00:00:00Z"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        request(
            "PATCH",
            &format!("/TransferRequests/{uuid}"),
            &["admin"],
            Some(json!({"work_priority_timestamp": "2026-02-01T00:00:00Z"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn delete_requires_admin() {
    let (app, _, _) = test_app();
    let (_, created) = send(
        &app,
        request(
            "POST",
            "/TransferRequests",
            &["system"],
            Some(new_request_body()),
        ),
    )
    .await;
    let uuid = created["uuid"].as_str().unwrap();

    let (status, _) = send(
        &app,
        request(
            "DELETE",
            &format!("/TransferRequests/{uuid}"),
            &["system"],
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        request(
            "DELETE",
            &format!("/TransferRequests/{uuid}"),
            &["admin"],
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

// === Bundles ===

#[tokio::test]
async fn bulk_create_externalizes_files_into_metadata() {
    let (app, _, _) = test_app();
    let (status, body) = send(
        &app,
        request(
            "POST",
            "/Bundles/actions/bulk_create",
            &["system"],
            Some(bulk_create_body("specified", vec!["f-1", "f-2"])),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let bundle = &body["bundles"][0];
    assert_eq!(bundle["status"], "specified");
    assert!(bundle.get("files").is_none() || bundle["files"] == json!([]));

    let uuid = bundle["uuid"].as_str().unwrap();
    let (_, metadata) = send(
        &app,
        request("GET", &format!("/Metadata?bundle_uuid={uuid}"), &[], None),
    )
    .await;
    assert_eq!(metadata["results"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn pop_patch_cycle_advances_a_bundle() {
    let (app, _, _) = test_app();
    let (_, created) = send(
        &app,
        request(
            "POST",
            "/Bundles/actions/bulk_create",
            &["system"],
            Some(bulk_create_body("specified", vec![])),
        ),
    )
    .await;
    let uuid = created["bundles"][0]["uuid"].as_str().unwrap();

    let (status, popped) = send(
        &app,
        request(
            "POST",
            "/Bundles/actions/pop?status=specified&source=WIPAC&claimant=bundler-01",
            &["system"],
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(popped["uuid"], uuid);

    let (status, patched) = send(
        &app,
        request(
            "PATCH",
            &format!("/Bundles/{uuid}?claimant=bundler-01"),
            &["system"],
            Some(json!({
                "status": "created",
                "bundle_path": "/outbox/doc-1.tar",
                "size": 1024,
                "checksum": {"sha512": "aa", "adler32": "01"},
                "claimed": false,
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched["status"], "created");
    assert_eq!(patched["claimed"], false);
    assert_eq!(patched["checksum"]["sha512"], "aa");
}

#[tokio::test]
async fn patch_with_wrong_claimant_conflicts() {
    let (app, _, _) = test_app();
    let (_, created) = send(
        &app,
        request(
            "POST",
            "/Bundles/actions/bulk_create",
            &["system"],
            Some(bulk_create_body("specified", vec![])),
        ),
    )
    .await;
    let uuid = created["bundles"][0]["uuid"].as_str().unwrap();
    send(
        &app,
        request(
            "POST",
            "/Bundles/actions/pop?status=specified&claimant=bundler-01",
            &["system"],
            None,
        ),
    )
    .await;

    let (status, body) = send(
        &app,
        request(
            "PATCH",
            &format!("/Bundles/{uuid}?claimant=bundler-02"),
            &["system"],
            Some(json!({"status": "created", "claimed": false})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("claim conflict"));
}

#[tokio::test]
async fn invalid_pop_status_is_bad_request() {
    let (app, _, _) = test_app();
    let (status, _) = send(
        &app,
        request(
            "POST",
            "/Bundles/actions/pop?status=archived&claimant=w",
            &["system"],
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn quarantine_and_admin_restore_round_trip() {
    let (app, _, _) = test_app();
    let (_, created) = send(
        &app,
        request(
            "POST",
            "/Bundles/actions/bulk_create",
            &["system"],
            Some(bulk_create_body("specified", vec![])),
        ),
    )
    .await;
    let uuid = created["bundles"][0]["uuid"].as_str().unwrap();
    send(
        &app,
        request(
            "POST",
            "/Bundles/actions/pop?status=specified&claimant=bundler-01",
            &["system"],
            None,
        ),
    )
    .await;

    let (status, quarantined) = send(
        &app,
        request(
            "PATCH",
            &format!("/Bundles/{uuid}?claimant=bundler-01"),
            &["system"],
            Some(json!({
                "status": "quarantined",
                "reason": "bundler: checksum mismatch on source file",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quarantined["status"], "quarantined");
    assert_eq!(quarantined["original_status"], "specified");
    assert_eq!(quarantined["claimed"], false);

    let (status, restored) = send(
        &app,
        request(
            "PATCH",
            &format!("/Bundles/{uuid}"),
            &["admin"],
            Some(json!({"status": "specified"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(restored["status"], "specified");
    assert!(restored.get("original_status").is_none());
    assert!(restored.get("reason").is_none());
}

#[tokio::test]
async fn restore_is_admin_only_even_with_a_claimant() {
    let (app, _, _) = test_app();
    let (_, created) = send(
        &app,
        request(
            "POST",
            "/Bundles/actions/bulk_create",
            &["system"],
            Some(bulk_create_body("specified", vec![])),
        ),
    )
    .await;
    let uuid = created["bundles"][0]["uuid"].as_str().unwrap();
    send(
        &app,
        request(
            "POST",
            "/Bundles/actions/pop?status=specified&claimant=bundler-01",
            &["system"],
            None,
        ),
    )
    .await;
    send(
        &app,
        request(
            "PATCH",
            &format!("/Bundles/{uuid}?claimant=bundler-01"),
            &["system"],
            Some(json!({"status": "quarantined", "reason": "bundler: boom"})),
        ),
    )
    .await;

    // A system token cannot sneak a restore through by naming a claimant;
    // the quarantined bundle is unclaimed, so the fence alone would let
    // this through.
    let (status, _) = send(
        &app,
        request(
            "PATCH",
            &format!("/Bundles/{uuid}?claimant=bundler-01"),
            &["system"],
            Some(json!({"status": "specified"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Setting quarantine fields again (e.g. refining the reason) stays
    // open to workers.
    let (status, _) = send(
        &app,
        request(
            "PATCH",
            &format!("/Bundles/{uuid}?claimant=bundler-01"),
            &["system"],
            Some(json!({"status": "quarantined", "reason": "bundler: still broken"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Admins restore, claimant named or not.
    let (status, restored) = send(
        &app,
        request(
            "PATCH",
            &format!("/Bundles/{uuid}"),
            &["admin"],
            Some(json!({"status": "specified"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(restored["status"], "specified");
}

#[tokio::test]
async fn request_restore_is_admin_only_even_with_a_claimant() {
    let (app, _, _) = test_app();
    let (_, created) = send(
        &app,
        request(
            "POST",
            "/TransferRequests",
            &["system"],
            Some(new_request_body()),
        ),
    )
    .await;
    let uuid = created["uuid"].as_str().unwrap();
    send(
        &app,
        request(
            "PATCH",
            &format!("/TransferRequests/{uuid}?claimant=picker-01"),
            &["system"],
            Some(json!({"status": "quarantined", "reason": "picker: boom"})),
        ),
    )
    .await;

    let (status, _) = send(
        &app,
        request(
            "PATCH",
            &format!("/TransferRequests/{uuid}?claimant=picker-01"),
            &["system"],
            Some(json!({"status": "ethereal"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        request(
            "PATCH",
            &format!("/TransferRequests/{uuid}"),
            &["admin"],
            Some(json!({"status": "ethereal"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn list_bundles_supports_projection_and_paging() {
    let (app, _, _) = test_app();
    for _ in 0..3 {
        send(
            &app,
            request(
                "POST",
                "/Bundles/actions/bulk_create",
                &["system"],
                Some(bulk_create_body("specified", vec![])),
            ),
        )
        .await;
    }

    let (_, page) = send(
        &app,
        request("GET", "/Bundles?limit=2&fields=uuid,status", &[], None),
    )
    .await;
    let results = page["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    // Only the projected fields survive.
    assert_eq!(
        results[0].as_object().unwrap().keys().len(),
        2,
        "projection should strip other fields"
    );
    assert!(results[0].get("uuid").is_some());
    assert!(results[0].get("status").is_some());

    let after = results[1]["uuid"].as_str().unwrap();
    let (_, rest) = send(
        &app,
        request("GET", &format!("/Bundles?after={after}"), &[], None),
    )
    .await;
    assert_eq!(rest["results"].as_array().unwrap().len(), 1);
}

// === Status ===

#[tokio::test]
async fn heartbeat_upsert_feeds_status_routes() {
    let (app, _, _) = test_app();
    let (status, _) = send(
        &app,
        request(
            "PATCH",
            "/status/bundler",
            &["system"],
            Some(json!({"bundler-01": {"busy": false, "last_work_begin": "2026-01-15T12:00:00Z"}})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, component) = send(&app, request("GET", "/status/bundler", &[], None)).await;
    assert_eq!(component["bundler-01"]["payload"]["busy"], false);

    let (_, count) = send(&app, request("GET", "/status/bundler/count", &[], None)).await;
    assert_eq!(count["count"], 1);

    let (_, overall) = send(&app, request("GET", "/status", &[], None)).await;
    assert_eq!(overall["health"], "OK");
    assert_eq!(overall["components"]["bundler"], 1);
}

#[tokio::test]
async fn nersc_status_filters_tape_components() {
    let (app, _, _) = test_app();
    send(
        &app,
        request(
            "PATCH",
            "/status/nersc-mover",
            &["system"],
            Some(json!({"nersc-mover-01": {"quota": "ok"}})),
        ),
    )
    .await;
    send(
        &app,
        request(
            "PATCH",
            "/status/bundler",
            &["system"],
            Some(json!({"bundler-01": {}})),
        ),
    )
    .await;

    let (_, nersc) = send(&app, request("GET", "/status/nersc", &[], None)).await;
    assert!(nersc.get("nersc-mover").is_some());
    assert!(nersc.get("bundler").is_none());
}

#[tokio::test]
async fn status_counts_bundles_by_state() {
    let (app, _, _) = test_app();
    send(
        &app,
        request(
            "POST",
            "/Bundles/actions/bulk_create",
            &["system"],
            Some(bulk_create_body("specified", vec![])),
        ),
    )
    .await;

    let (_, overall) = send(&app, request("GET", "/status", &[], None)).await;
    assert_eq!(overall["bundles"]["specified"], 1);
}
