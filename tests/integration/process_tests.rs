//! End-to-end tests for `POST /process`.
//!
//! Tests verify:
//! - Slice count, order and dimensions as published to the store
//! - Skipped areas do not affect their neighbours
//! - Request validation (missing fields, file types, invalid images)
//! - Batch abort on bad regions and storage failures, with cleanup

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use image::ImageFormat;
use tempfile::TempDir;
use tower::ServiceExt;

use imagemapper::RouterConfig;

use super::test_utils::{
    banded_map, create_image, create_png, leftover_workspaces, process_request, test_router,
    test_router_with_config, MockImageStore, MultipartBuilder, StoredSlice,
};

async fn body_string(response: axum::response::Response) -> String {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(body.to_vec()).unwrap()
}

fn output_files(root: &TempDir) -> usize {
    std::fs::read_dir(root.path().join("data/output"))
        .map(|entries| entries.count())
        .unwrap_or(0)
}

// =============================================================================
// Success Paths
// =============================================================================

#[tokio::test]
async fn test_process_two_rects() {
    let root = TempDir::new().unwrap();
    let store = MockImageStore::new();
    let recorder = store.recorder();
    let router = test_router(store, &root);

    let map = r#"<map name="promo">
        <area shape="rect" coords="0,0,300,150" href="https://shop.test/a" alt="Hero">
        <area shape="rect" coords="0,150,300,400" href="https://shop.test/b" alt="Footer">
    </map>"#;
    let response = router
        .oneshot(process_request("promo.png", &create_png(300, 400), map))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let page = body_string(response).await;
    assert!(page.contains("2 slice(s) generated"));
    assert!(page.contains("https://shop.test/a"));

    let stored = recorder.read().await.clone();
    assert_eq!(stored.len(), 2);
    assert_eq!((stored[0].width, stored[0].height), (300, 150));
    assert_eq!((stored[1].width, stored[1].height), (300, 250));
    assert!(stored[0].public_id.ends_with("_slice_0"));
    assert!(stored[1].public_id.ends_with("_slice_1"));

    // Both slices share one session id
    let session = stored[0].public_id.trim_end_matches("_slice_0");
    assert_eq!(stored[1].public_id, format!("{}_slice_1", session));

    assert_eq!(leftover_workspaces(&root), 0);
    assert_eq!(output_files(&root), 2);
}

#[tokio::test]
async fn test_process_preserves_document_order() {
    let root = TempDir::new().unwrap();
    let store = MockImageStore::new();
    let recorder = store.recorder();
    let router = test_router(store, &root);

    // Bottom band first in the markup
    let map = r#"
        <area coords="0,50,100,100" href="/bottom">
        <area coords="0,0,100,10" href="/top">
    "#;
    let response = router
        .oneshot(process_request("a.png", &create_png(100, 100), map))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let page = body_string(response).await;
    let bottom = page.find("/bottom").unwrap();
    let top = page.find("/top").unwrap();
    assert!(bottom < top);

    let stored = recorder.read().await.clone();
    assert_eq!(stored[0].height, 50);
    assert_eq!(stored[1].height, 10);
}

#[tokio::test]
async fn test_process_skips_bad_areas_in_isolation() {
    let root = TempDir::new().unwrap();
    let store = MockImageStore::new();
    let recorder = store.recorder();
    let router = test_router(store, &root);

    let map = r#"<map name="m">
        <area shape="rect" coords="0,0,50,50" href="/one">
        <area shape="circle" coords="25,25,10" href="/circle">
        <area shape="rect" coords="0,0,abc,50" href="/garbage">
        <area shape="rect" coords="0,0,10" href="/short">
        <area shape="RECT" coords=" 0 , 50 , 50 , 100 " href="/two">
    </map>"#;
    let response = router
        .oneshot(process_request("a.png", &create_png(50, 100), map))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let page = body_string(response).await;
    assert!(page.contains("2 slice(s) generated, 3 area(s) skipped"));

    let stored = recorder.read().await.clone();
    assert_eq!(
        stored
            .iter()
            .map(|s| (s.width, s.height))
            .collect::<Vec<_>>(),
        vec![(50, 50), (50, 50)]
    );
}

#[tokio::test]
async fn test_process_full_image_round_trip() {
    let root = TempDir::new().unwrap();
    let store = MockImageStore::new();
    let recorder = store.recorder();
    let router = test_router(store, &root);

    let response = router
        .oneshot(process_request(
            "whole.png",
            &create_png(123, 77),
            r#"<area coords="0,0,123,77">"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let stored = recorder.read().await.clone();
    assert_eq!(stored.len(), 1);
    assert_eq!((stored[0].width, stored[0].height), (123, 77));
}

#[tokio::test]
async fn test_process_accepts_jpeg_and_gif() {
    for (name, format) in [("photo.JPG", ImageFormat::Jpeg), ("anim.gif", ImageFormat::Gif)] {
        let root = TempDir::new().unwrap();
        let store = MockImageStore::new();
        let recorder = store.recorder();
        let router = test_router(store, &root);

        let response = router
            .oneshot(process_request(
                name,
                &create_image(64, 32, format),
                &banded_map(64, 2, 16),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{}", name);
        assert_eq!(recorder.read().await.len(), 2, "{}", name);
    }
}

// =============================================================================
// Request Validation
// =============================================================================

#[tokio::test]
async fn test_missing_image_field() {
    let root = TempDir::new().unwrap();
    let router = test_router(MockImageStore::new(), &root);

    let request = MultipartBuilder::new()
        .text("map_html", r#"<area coords="0,0,1,1">"#)
        .into_request();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let page = body_string(response).await;
    assert!(page.contains("banner error"));
    assert!(page.contains("No image file provided"));
}

#[tokio::test]
async fn test_empty_file_name() {
    let root = TempDir::new().unwrap();
    let router = test_router(MockImageStore::new(), &root);

    let request = process_request("", &create_png(10, 10), r#"<area coords="0,0,1,1">"#);
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_map() {
    let root = TempDir::new().unwrap();
    let router = test_router(MockImageStore::new(), &root);

    let request = MultipartBuilder::new()
        .file("image", "a.png", "image/png", &create_png(10, 10))
        .text("map_html", "   ")
        .into_request();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_string(response).await.contains("No HTML map markup provided"));
}

#[tokio::test]
async fn test_unsupported_extension() {
    let root = TempDir::new().unwrap();
    let router = test_router(MockImageStore::new(), &root);

    let response = router
        .oneshot(process_request(
            "banner.bmp",
            &create_png(10, 10),
            r#"<area coords="0,0,1,1">"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn test_not_an_image() {
    let root = TempDir::new().unwrap();
    let router = test_router(MockImageStore::new(), &root);

    let response = router
        .oneshot(process_request(
            "fake.png",
            b"definitely not a png",
            r#"<area coords="0,0,1,1">"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_string(response).await.contains("not a valid image"));
    assert_eq!(leftover_workspaces(&root), 0);
}

#[tokio::test]
async fn test_no_valid_areas() {
    let root = TempDir::new().unwrap();
    let router = test_router(MockImageStore::new(), &root);

    let map = r#"<map><area shape="poly" coords="0,0,5,5,0,5"><area href="/x"></map>"#;
    let response = router
        .oneshot(process_request("a.png", &create_png(10, 10), map))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_string(response).await.contains("No valid area tags"));
    assert_eq!(output_files(&root), 0);
}

#[tokio::test]
async fn test_upload_too_large() {
    let root = TempDir::new().unwrap();
    let config = RouterConfig::new()
        .with_tracing(false)
        .with_max_upload_bytes(1024);
    let router = test_router_with_config(MockImageStore::new(), &root, config);

    let response = router
        .oneshot(process_request(
            "big.png",
            &vec![0u8; 8 * 1024],
            r#"<area coords="0,0,1,1">"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(body_string(response).await.contains("File too large"));
}

#[tokio::test]
async fn test_not_multipart() {
    let root = TempDir::new().unwrap();
    let router = test_router(MockImageStore::new(), &root);

    let request = Request::builder()
        .method("POST")
        .uri("/process")
        .header("content-type", "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert!(response.status().is_client_error());
}

// =============================================================================
// Batch Abort
// =============================================================================

#[tokio::test]
async fn test_out_of_bounds_aborts_batch() {
    let root = TempDir::new().unwrap();
    let store = MockImageStore::new();
    let recorder = store.recorder();
    let router = test_router(store, &root);

    let map = r#"
        <area coords="0,0,100,50">
        <area coords="0,50,101,100">
        <area coords="0,0,10,10">
    "#;
    let response = router
        .oneshot(process_request("a.png", &create_png(100, 100), map))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_string(response).await.contains("Slice 2 failed"));

    // The first slice was published before the failure; nothing after it
    assert_eq!(recorder.read().await.len(), 1);
    assert_eq!(leftover_workspaces(&root), 0);
    assert_eq!(output_files(&root), 0);
}

#[tokio::test]
async fn test_overflowing_coordinate_aborts_batch() {
    let root = TempDir::new().unwrap();
    let store = MockImageStore::new();
    let recorder = store.recorder();
    let router = test_router(store, &root);

    let map = r#"
        <area coords="0,0,100,50">
        <area coords="0,50,99999999999999999999,100">
    "#;
    let response = router
        .oneshot(process_request("a.png", &create_png(100, 100), map))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_string(response).await.contains("Slice 2 failed"));

    assert_eq!(recorder.read().await.len(), 1);
    assert_eq!(leftover_workspaces(&root), 0);
}

#[tokio::test]
async fn test_degenerate_region() {
    let root = TempDir::new().unwrap();
    let router = test_router(MockImageStore::new(), &root);

    let response = router
        .oneshot(process_request(
            "a.png",
            &create_png(100, 100),
            r#"<area coords="10,10,10,50">"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_string(response).await.contains("Degenerate"));
}

#[tokio::test]
async fn test_store_failure_aborts_batch() {
    let root = TempDir::new().unwrap();
    let store = MockImageStore::failing_at(1);
    let recorder = store.recorder();
    let router = test_router(store, &root);

    let response = router
        .oneshot(process_request(
            "a.png",
            &create_png(60, 90),
            &banded_map(60, 3, 30),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(body_string(response).await.contains("Upload of slice 2 failed"));

    let stored = recorder.read().await.clone();
    assert_eq!(stored.len(), 1);
    assert_eq!(
        stored[0],
        StoredSlice {
            public_id: stored[0].public_id.clone(),
            width: 60,
            height: 30,
        }
    );
    assert_eq!(leftover_workspaces(&root), 0);
    assert_eq!(output_files(&root), 0);
}
