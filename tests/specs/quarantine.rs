//! Scenario: quarantine round-trip after a bundler failure.

use crate::prelude::*;
use axum::http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn quarantine_preserves_state_and_unquarantine_restores_it() {
    let c = coordinator();
    let request = new_request(&c, "WIPAC", "NERSC", "/data/exp").await;
    let (_, created) = send(
        &c,
        "POST",
        "/Bundles/actions/bulk_create",
        &["system"],
        Some(json!({
            "bundles": [{
                "request": request,
                "source": "WIPAC",
                "dest": "NERSC",
                "path": "/data/exp",
                "status": "specified",
            }]
        })),
    )
    .await;
    let uuid = created["bundles"][0]["uuid"].as_str().unwrap().to_string();

    // The bundler claims, fails, and quarantines with its reason.
    pop_bundle(&c, "specified", "bundler-01").await;
    let (status, quarantined) = send(
        &c,
        "PATCH",
        &format!("/Bundles/{uuid}?claimant=bundler-01"),
        &["system"],
        Some(json!({
            "status": "quarantined",
            "reason": "bundler: checksum mismatch on source file",
            "claimed": false,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quarantined["status"], "quarantined");
    assert_eq!(quarantined["original_status"], "specified");
    assert_eq!(
        quarantined["reason"],
        "bundler: checksum mismatch on source file"
    );
    assert_eq!(quarantined["claimed"], false);

    // Quarantine is a sink: no POP hands it out.
    assert_eq!(
        pop_bundle(&c, "specified", "bundler-02").await,
        serde_json::Value::Null
    );
    assert_eq!(
        pop_bundle(&c, "quarantined", "bundler-02").await,
        serde_json::Value::Null
    );

    // A system token cannot restore, not even by naming a claimant (the
    // quarantined bundle is unclaimed, so only the role check stands in
    // the way).
    let (status, _) = send(
        &c,
        "PATCH",
        &format!("/Bundles/{uuid}?claimant=bundler-01"),
        &["system"],
        Some(json!({ "status": "specified" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Admin un-quarantines; status, reason, original_status all reset.
    let (status, restored) = send(
        &c,
        "PATCH",
        &format!("/Bundles/{uuid}"),
        &["admin"],
        Some(json!({ "status": "specified" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(restored["status"], "specified");
    assert!(restored.get("reason").is_none());
    assert!(restored.get("original_status").is_none());

    // The next bundler claim succeeds.
    let reclaimed = pop_bundle(&c, "specified", "bundler-02").await;
    assert_eq!(reclaimed["uuid"].as_str().unwrap(), uuid);
}

#[tokio::test]
async fn quarantined_requests_round_trip_too() {
    let c = coordinator();
    let request = new_request(&c, "WIPAC", "NERSC", "/data/exp").await;

    send(
        &c,
        "POST",
        "/TransferRequests/actions/pop?claimant=picker-01",
        &["system"],
        None,
    )
    .await;
    let (_, quarantined) = send(
        &c,
        "PATCH",
        &format!("/TransferRequests/{request}?claimant=picker-01"),
        &["system"],
        Some(json!({
            "status": "quarantined",
            "reason": "picker: file catalog unreachable",
            "claimed": false,
        })),
    )
    .await;
    assert_eq!(quarantined["status"], "quarantined");
    assert_eq!(quarantined["original_status"], "ethereal");

    // System tokens cannot restore requests either.
    let (status, _) = send(
        &c,
        "PATCH",
        &format!("/TransferRequests/{request}?claimant=picker-01"),
        &["system"],
        Some(json!({ "status": "ethereal" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, restored) = send(
        &c,
        "PATCH",
        &format!("/TransferRequests/{request}"),
        &["admin"],
        Some(json!({ "status": "ethereal" })),
    )
    .await;
    assert_eq!(restored["status"], "ethereal");

    // Claimable again.
    let (_, popped) = send(
        &c,
        "POST",
        "/TransferRequests/actions/pop?claimant=picker-02",
        &["system"],
        None,
    )
    .await;
    assert_eq!(popped["uuid"].as_str().unwrap(), request);
}
