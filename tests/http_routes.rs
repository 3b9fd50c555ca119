mod common;

use std::sync::atomic::Ordering;

use axum::http::{
    StatusCode,
    header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE},
};
use serde_json::json;

use common::{ANIMATION, BASE_URL, FakeDatabase, Harness, NOTCH_UUID, TEXTURE, body_bytes, body_json};
use narnia::application::hashing::sha256_hex;

#[tokio::test]
async fn descriptor_lists_file_urls_and_backfills_the_hash() {
    let harness = Harness::new();

    let response = harness.get("/Notch.json").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let hash = sha256_hex(TEXTURE);
    assert_eq!(
        body_json(response).await,
        json!({
            "cape": {
                "id": "cape-1",
                "texture": format!("{BASE_URL}/file/tex"),
                "name": "Founder",
                "render": format!("{BASE_URL}/file/render"),
                "capeHash": hash,
                "animation": {"frametime": 2, "interpolate": true},
                "emissive": false,
                "specular": false,
                "normal": false
            },
            "cosmetics": []
        })
    );
    assert_eq!(harness.db.stored_hash("tex"), Some(hash));
    assert!(!harness.cached("file:tex").await);
    assert!(harness.cached(&format!("cape:{NOTCH_UUID}")).await);
}

#[tokio::test]
async fn every_identifier_form_resolves_to_the_same_descriptor() {
    let harness = Harness::new();

    let by_name = body_json(harness.get("/Notch").await).await;
    let by_uuid = body_json(harness.get(&format!("/{NOTCH_UUID}")).await).await;
    let by_hyphenated = body_json(
        harness
            .get("/069a79f4-44e9-4726-a5be-fca90e38aaf5.json")
            .await,
    )
    .await;
    let by_internal_id = body_json(harness.get("/wuid%3B12345.json").await).await;

    assert_eq!(by_name, by_uuid);
    assert_eq!(by_name, by_hyphenated);
    assert_eq!(by_name, by_internal_id);
}

#[tokio::test]
async fn uppercase_uuids_share_the_canonical_identity_entry() {
    let harness = Harness::new();

    let response = harness
        .get("/069A79F4-44E9-4726-A5BE-FCA90E38AAF5.json")
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(harness.cached(&format!("user:{NOTCH_UUID}")).await);
    assert!(!harness.cached("user:069A79F444E94726A5BEFCA90E38AAF5").await);

    let again = harness.get(&format!("/{NOTCH_UUID}")).await;
    assert_eq!(again.status(), StatusCode::OK);
    assert_eq!(harness.db.account_lookups.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unusable_animation_metadata_degrades_to_false() {
    for file_id in ["gone", "orphan", "garbled", "still"] {
        let db = FakeDatabase::seeded().with_animation_file(NOTCH_UUID, file_id);
        let harness = Harness::with_database(db);

        let response = harness.get("/Notch.json").await;
        assert_eq!(response.status(), StatusCode::OK, "animation file {file_id}");

        let descriptor = body_json(response).await;
        assert_eq!(
            descriptor["cape"]["animation"],
            json!(false),
            "animation file {file_id}"
        );
        assert_eq!(descriptor["cape"]["texture"], format!("{BASE_URL}/file/tex"));
    }
}

#[tokio::test]
async fn descriptor_segment_is_decoded_only_once() {
    let harness = Harness::new();

    let response = harness.get("/Notc%2568.json").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_bytes(response).await, "User not found");
}

#[tokio::test]
async fn identity_lookups_are_served_from_cache() {
    let harness = Harness::new();

    for _ in 0..3 {
        assert_eq!(harness.get("/Notch").await.status(), StatusCode::OK);
    }

    assert_eq!(harness.db.account_lookups.load(Ordering::SeqCst), 1);
    assert_eq!(harness.db.cape_lookups.load(Ordering::SeqCst), 1);
    assert!(harness.cached("user:Notch").await);
}

#[tokio::test]
async fn descriptor_errors_distinguish_invalid_missing_and_capeless() {
    let harness = Harness::new();

    let invalid = harness.get("/this_name_is_far_too_long").await;
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

    let unknown = harness.get("/Herobrine").await;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_bytes(unknown).await, "User not found");

    let capeless = harness.get("/Jeb_").await;
    assert_eq!(capeless.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_bytes(capeless).await, "Cape not found");

    assert!(!harness.cached("user:Herobrine").await);
    assert!(harness.cached("user:Jeb_").await);
}

#[tokio::test]
async fn file_route_serves_content_with_headers_and_caches_it() {
    let harness = Harness::new();

    let response = harness.get("/file/tex").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_TYPE], "image/png");
    assert_eq!(
        response.headers()[CONTENT_DISPOSITION],
        "inline; filename=\"cape.png\""
    );
    assert_eq!(
        response.headers()[CONTENT_LENGTH],
        TEXTURE.len().to_string().as_str()
    );
    assert!(response.headers().get("x-hash").is_none());
    assert_eq!(body_bytes(response).await, TEXTURE);
    assert!(harness.cached("file:tex").await);

    let again = harness.get("/file/tex").await;
    assert_eq!(body_bytes(again).await, TEXTURE);
    assert_eq!(harness.blobs.reads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn hash_header_appears_after_backfill() {
    let harness = Harness::new();

    assert_eq!(harness.get("/Notch").await.status(), StatusCode::OK);

    let response = harness.get("/file/tex").await;
    assert_eq!(response.headers()["x-hash"], sha256_hex(TEXTURE).as_str());
}

#[tokio::test]
async fn non_image_files_download_as_attachments() {
    let harness = Harness::new();

    let response = harness.get("/file/pack").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_TYPE], "application/octet-stream");
    assert_eq!(
        response.headers()[CONTENT_DISPOSITION],
        "attachment; filename=\"pack.zip\""
    );

    let meta = harness.get("/file/meta").await;
    assert_eq!(
        meta.headers()[CONTENT_DISPOSITION],
        "attachment; filename=\"cape.mcmeta\""
    );
    assert_eq!(body_bytes(meta).await, ANIMATION);
}

#[tokio::test]
async fn uncacheable_and_bypassed_files_never_reach_the_cache() {
    let harness = Harness::new();

    assert_eq!(harness.get("/file/render").await.status(), StatusCode::OK);
    assert!(!harness.cached("file:render").await);

    assert_eq!(
        harness.get("/file/tex?bypass_cache=true").await.status(),
        StatusCode::OK
    );
    assert!(!harness.cached("file:tex").await);
}

#[tokio::test]
async fn unknown_files_are_not_found() {
    let harness = Harness::new();

    let response = harness.get("/file/nope").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_bytes(response).await, "File not found");
}

#[tokio::test]
async fn cape_routes_deliver_texture_and_render() {
    let harness = Harness::new();

    let texture = harness.get("/cape/byuser/Notch").await;
    assert_eq!(texture.status(), StatusCode::OK);
    assert_eq!(body_bytes(texture).await, TEXTURE);

    let render = harness.get("/cape/byuser/wuid;12345/render").await;
    assert_eq!(render.status(), StatusCode::OK);
    assert_eq!(body_bytes(render).await, "render-png");

    let uploaded = harness.get("/cape/byid/cape-2").await;
    assert_eq!(body_bytes(uploaded).await, TEXTURE);

    let no_render = harness.get("/cape/byid/cape-2/render").await;
    assert_eq!(no_render.status(), StatusCode::NOT_FOUND);

    let no_cape = harness.get("/cape/byid/missing").await;
    assert_eq!(no_cape.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_bytes(no_cape).await, "Cape not found");
}

#[tokio::test]
async fn admin_identity_clear_reports_dropped_keys() {
    let harness = Harness::new();
    assert_eq!(harness.get("/Notch").await.status(), StatusCode::OK);

    let response = harness.admin_post("/cache/clear/Notch").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({
            "invalidated": [
                "user:Notch",
                format!("user:{NOTCH_UUID}"),
                "user:wuid;12345",
                format!("cape:{NOTCH_UUID}"),
                "file:tex",
                "file:render",
                "file:meta"
            ]
        })
    );
    assert!(!harness.cached("user:Notch").await);
    assert!(!harness.cached("file:meta").await);

    let unknown = harness.admin_post("/cache/clear/Herobrine").await;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_full_clear_empties_the_cache() {
    let harness = Harness::new();
    assert_eq!(harness.get("/Notch").await.status(), StatusCode::OK);
    assert!(!harness.store.is_empty());

    let response = harness.admin_post("/cache/clear").await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(harness.store.is_empty());
}

#[tokio::test]
async fn health_probe_reflects_database_state() {
    let healthy = Harness::new();
    assert_eq!(
        healthy.get("/_health/db").await.status(),
        StatusCode::NO_CONTENT
    );

    let mut db = FakeDatabase::seeded();
    db.healthy = false;
    let unhealthy = Harness::with_database(db);
    assert_eq!(
        unhealthy.get("/_health/db").await.status(),
        StatusCode::SERVICE_UNAVAILABLE
    );
    assert_eq!(
        common::send(&unhealthy.admin, "GET", "/_health/db")
            .await
            .status(),
        StatusCode::SERVICE_UNAVAILABLE
    );
}
