//! Scenario: happy archival, WIPAC → NERSC.

use crate::prelude::*;
use axum::http::StatusCode;
use serde_json::json;

const ARCHIVAL_WALK: [(&str, &str, &str); 9] = [
    ("specified", "created", "bundler-01"),
    ("created", "staged", "rate-limiter-01"),
    ("staged", "transferring", "replicator-01"),
    ("transferring", "taping", "site-move-verifier-01"),
    ("taping", "verifying", "nersc-mover-01"),
    ("verifying", "completed", "nersc-verifier-01"),
    ("completed", "source-deleted", "deleter-01"),
    ("source-deleted", "deleted", "deleter-02"),
    ("deleted", "finished", "finisher-01"),
];

#[tokio::test]
async fn request_expands_walks_the_pipeline_and_finishes() {
    let c = coordinator();
    let request = new_request(
        &c,
        "WIPAC",
        "NERSC",
        "/data/exp/IceCube/2013/filtered/PFFilt/1109",
    )
    .await;

    // Picker: claim the request, expand it into two bundles, mark it
    // processing.
    let (_, popped) = send(
        &c,
        "POST",
        "/TransferRequests/actions/pop?source=WIPAC&claimant=picker-01",
        &["system"],
        None,
    )
    .await;
    assert_eq!(popped["uuid"], json!(request.clone()));

    let (status, created) = send(
        &c,
        "POST",
        "/Bundles/actions/bulk_create",
        &["system"],
        Some(json!({
            "bundles": [
                {
                    "request": request,
                    "source": "WIPAC",
                    "dest": "NERSC",
                    "path": "/data/exp/IceCube/2013/filtered/PFFilt/1109",
                    "status": "specified",
                    "files": ["f-1", "f-2"],
                },
                {
                    "request": request,
                    "source": "WIPAC",
                    "dest": "NERSC",
                    "path": "/data/exp/IceCube/2013/filtered/PFFilt/1109",
                    "status": "specified",
                    "files": ["f-3"],
                },
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let bundles: Vec<String> = created["bundles"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["uuid"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(bundles.len(), 2);

    let (status, _) = send(
        &c,
        "PATCH",
        &format!("/TransferRequests/{request}?claimant=picker-01"),
        &["system"],
        Some(json!({ "status": "processing", "claimed": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // The metadata side-table covers exactly the expanded file set.
    let (_, metadata) = send(&c, "GET", "/Metadata", &[], None).await;
    assert_eq!(metadata["results"].as_array().unwrap().len(), 3);

    // Walk every bundle through the full archival pipeline.
    for (input, output, claimant) in ARCHIVAL_WALK {
        for _ in 0..bundles.len() {
            let popped = pop_bundle(&c, input, claimant).await;
            let uuid = popped["uuid"].as_str().unwrap();
            assert!(bundles.contains(&uuid.to_string()));

            let extra = match output {
                "created" => json!({
                    "bundle_path": format!("/outbox/{uuid}.tar"),
                    "size": 1024,
                    "checksum": {"sha512": "aa", "adler32": "01"},
                }),
                "completed" => json!({ "verified": true }),
                _ => json!({}),
            };
            let (status, _) = advance_bundle(&c, uuid, claimant, output, extra).await;
            assert_eq!(status, StatusCode::OK, "{input} -> {output} for {uuid}");
        }
        // The stage drained its input status.
        assert_eq!(pop_bundle(&c, input, claimant).await, serde_json::Value::Null);
    }

    // Finisher bookkeeping: metadata dropped, request finished.
    let (_, rows) = send(&c, "GET", "/Metadata", &[], None).await;
    let uuids: Vec<String> = rows["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["uuid"].as_str().unwrap().to_string())
        .collect();
    let (_, deleted) = send(
        &c,
        "POST",
        "/Metadata/actions/bulk_delete",
        &["system"],
        Some(json!({ "metadata": uuids })),
    )
    .await;
    assert_eq!(deleted["count"], 3);

    let (status, _) = send(
        &c,
        "PATCH",
        &format!("/TransferRequests/{request}?claimant=finisher-01"),
        &["system"],
        Some(json!({ "status": "finished" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Terminal states all round.
    for uuid in &bundles {
        let (_, bundle) = send(&c, "GET", &format!("/Bundles/{uuid}"), &[], None).await;
        assert_eq!(bundle["status"], "finished");
        assert_eq!(bundle["verified"], true);
        assert_eq!(bundle["claimed"], false);
    }
    let (_, finished) = send(&c, "GET", &format!("/TransferRequests/{request}"), &[], None).await;
    assert_eq!(finished["status"], "finished");

    // Dashboard agrees.
    let (_, overall) = send(&c, "GET", "/status", &[], None).await;
    assert_eq!(overall["bundles"]["finished"], 2);
}

#[tokio::test]
async fn observed_status_sequence_is_a_valid_pipeline_path() {
    // Every consecutive pair in the walk is a legal forward edge.
    use lta_core::BundleStatus;
    for window in ARCHIVAL_WALK.windows(2) {
        let (_, output_a, _) = window[0];
        let (input_b, _, _) = window[1];
        assert_eq!(output_a, input_b, "pipeline stages must chain");
    }
    for (input, output, _) in ARCHIVAL_WALK {
        let from: BundleStatus = input.parse().unwrap();
        let to: BundleStatus = output.parse().unwrap();
        assert!(from.can_advance_to(to), "{from} -> {to}");
    }
}
