//! API integration tests for the upload form, downloads and health checks.
//!
//! Tests verify:
//! - Form, health and storage status endpoints
//! - Template download, including unknown and unsafe names
//! - Static serving of locally stored slices
//! - HTTP response codes and headers

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use imagemapper::store::{LocalStore, DEFAULT_LOCAL_URL_PREFIX};
use imagemapper::RouterConfig;

use super::test_utils::{
    banded_map, create_png, process_request, test_router, test_router_with_config,
    MockImageStore,
};

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(body.to_vec()).unwrap()
}

/// Pull the archive name out of the download link of a result page.
fn download_link(page: &str) -> String {
    let start = page.find("/download/").unwrap() + "/download/".len();
    let end = start + page[start..].find('"').unwrap();
    page[start..end].to_string()
}

// =============================================================================
// Basic Endpoints
// =============================================================================

#[tokio::test]
async fn test_index_page() {
    let root = TempDir::new().unwrap();
    let router = test_router(MockImageStore::new(), &root);

    let response = router.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/html"));

    let page = body_string(response).await;
    assert!(page.contains(r#"enctype="multipart/form-data""#));
}

#[tokio::test]
async fn test_health_and_alias() {
    let root = TempDir::new().unwrap();

    for uri in ["/health", "/healthz"] {
        let router = test_router(MockImageStore::new(), &root);
        let response = router.oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json: serde_json::Value =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }
}

#[tokio::test]
async fn test_storage_status() {
    let root = TempDir::new().unwrap();
    let router = test_router(MockImageStore::new(), &root);

    let response = router.oneshot(get("/debug/storage")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(json["destination"], "remote");
    assert_eq!(json["remote_configured"], true);
    assert_eq!(json["message"], "mock store");
}

#[tokio::test]
async fn test_unknown_route() {
    let root = TempDir::new().unwrap();
    let router = test_router(MockImageStore::new(), &root);

    let response = router.oneshot(get("/nope")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Downloads
// =============================================================================

#[tokio::test]
async fn test_download_after_process() {
    let root = TempDir::new().unwrap();
    let router = test_router(MockImageStore::new(), &root);

    let response = router
        .clone()
        .oneshot(process_request("banner.png", &create_png(100, 60), &banded_map(100, 2, 30)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let archive = download_link(&body_string(response).await);
    assert!(archive.starts_with("email_template_"));
    assert!(archive.ends_with(".zip"));

    let response = router
        .oneshot(get(&format!("/download/{}", archive)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/zip"
    );
    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).unwrap(),
        "max-age=0"
    );
    assert!(response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("attachment"));

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..4], b"PK\x03\x04");
}

#[tokio::test]
async fn test_download_missing_archive() {
    let root = TempDir::new().unwrap();
    let router = test_router(MockImageStore::new(), &root);

    let response = router
        .oneshot(get("/download/email_template_missing.zip"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(json["error"], "not_found");
    assert_eq!(json["status"], 404);
}

#[tokio::test]
async fn test_download_rejects_traversal() {
    let root = TempDir::new().unwrap();
    std::fs::create_dir_all(root.path().join("data")).unwrap();
    std::fs::write(root.path().join("data/secret.zip"), b"PK").unwrap();
    let router = test_router(MockImageStore::new(), &root);

    let response = router
        .oneshot(get("/download/..%2Fsecret.zip"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Static Slices
// =============================================================================

#[tokio::test]
async fn test_local_slices_are_served() {
    let root = TempDir::new().unwrap();
    let static_dir = root.path().join("static/images");
    let store = LocalStore::new(&static_dir, DEFAULT_LOCAL_URL_PREFIX);
    let config = RouterConfig::new()
        .with_tracing(false)
        .with_static_files(DEFAULT_LOCAL_URL_PREFIX, &static_dir);
    let router = test_router_with_config(store, &root, config);

    let response = router
        .clone()
        .oneshot(process_request("banner.png", &create_png(40, 40), &banded_map(40, 1, 40)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_string(response).await;

    // The preview references the slice by relative URL
    let start = page.find("/static/images/").unwrap();
    let end = start + page[start..].find(".png").unwrap() + ".png".len();
    let slice_url = page[start..end].to_string();
    assert!(slice_url.ends_with("_slice_0.png"));

    let response = router.oneshot(get(&slice_url)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let img = image::load_from_memory(&body).unwrap();
    assert_eq!((img.width(), img.height()), (40, 40));
}
