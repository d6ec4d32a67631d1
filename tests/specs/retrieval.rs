//! Scenario: retrieval, NERSC tape back to the WIPAC warehouse.

use crate::prelude::*;
use axum::http::StatusCode;
use serde_json::json;

const RETRIEVAL_WALK: [(&str, &str, &str); 8] = [
    ("located", "staged", "nersc-retriever-01"),
    ("staged", "transferring", "replicator-01"),
    ("transferring", "unpacking", "site-move-verifier-01"),
    ("unpacking", "completed", "unpacker-01"),
    ("completed", "source-deleted", "deleter-01"),
    ("source-deleted", "deleted", "deleter-02"),
    ("deleted", "finished", "finisher-01"),
    // Guard row: the walk above must have drained everything.
    ("located", "finished", "nobody"),
];

#[tokio::test]
async fn located_bundles_rejoin_the_pipeline_and_finish() {
    let c = coordinator();
    let request = new_request(&c, "NERSC", "WIPAC", "/data/exp/IceCube/2013").await;

    // Locator: claim the request, register the archived bundle it found.
    let (_, popped) = send(
        &c,
        "POST",
        "/TransferRequests/actions/pop?source=NERSC&dest=WIPAC&claimant=locator-01",
        &["system"],
        None,
    )
    .await;
    assert_eq!(popped["uuid"].as_str().unwrap(), request);

    let (status, created) = send(
        &c,
        "POST",
        "/Bundles/actions/bulk_create",
        &["system"],
        Some(json!({
            "bundles": [{
                "request": request,
                "source": "NERSC",
                "dest": "WIPAC",
                "path": "/data/exp/IceCube/2013",
                "status": "located",
                "files": ["f-1", "f-2"],
                "bundle_path": "/tape/lta/b-1.tar",
                "size": 2048,
                "checksum": {"sha512": "bb", "adler32": "02"},
            }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let uuid = created["bundles"][0]["uuid"].as_str().unwrap().to_string();

    send(
        &c,
        "PATCH",
        &format!("/TransferRequests/{request}?claimant=locator-01"),
        &["system"],
        Some(json!({ "status": "processing", "claimed": false })),
    )
    .await;

    for (input, output, claimant) in RETRIEVAL_WALK {
        if claimant == "nobody" {
            assert_eq!(
                pop_bundle(&c, input, "anyone").await,
                serde_json::Value::Null
            );
            continue;
        }
        let popped = pop_bundle(&c, input, claimant).await;
        assert_eq!(popped["uuid"].as_str().unwrap(), uuid, "pop in {input}");

        let extra = match output {
            "completed" => json!({ "verified": true }),
            _ => json!({}),
        };
        let (status, _) = advance_bundle(&c, &uuid, claimant, output, extra).await;
        assert_eq!(status, StatusCode::OK, "{input} -> {output}");
    }

    let (_, bundle) = send(&c, "GET", &format!("/Bundles/{uuid}"), &[], None).await;
    assert_eq!(bundle["status"], "finished");
    // The checksum recorded at archival time never changed.
    assert_eq!(bundle["checksum"]["sha512"], "bb");

    let (status, _) = send(
        &c,
        "PATCH",
        &format!("/TransferRequests/{request}?claimant=finisher-01"),
        &["system"],
        Some(json!({ "status": "finished" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}
