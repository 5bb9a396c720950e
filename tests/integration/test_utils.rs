//! Test utilities for integration tests.
//!
//! This module provides a recording image store, multipart request builders
//! and helpers for synthesizing source images.

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use axum::Router;
use image::{ImageFormat, Rgb, RgbImage};
use tempfile::TempDir;
use tokio::sync::RwLock;

use imagemapper::error::StoreError;
use imagemapper::pipeline::{DataLayout, ProcessService};
use imagemapper::store::{Destination, ImageStore, StoreStatus};
use imagemapper::{create_router, RouterConfig};

// =============================================================================
// Recording Image Store
// =============================================================================

/// One call to [`MockImageStore::store`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSlice {
    pub public_id: String,
    pub width: u32,
    pub height: u32,
}

/// An image store that records every published slice.
///
/// Slices are "published" at `https://cdn.test/{public_id}.png`. A failure
/// can be injected at a given call index.
#[derive(Default)]
pub struct MockImageStore {
    stored: Arc<RwLock<Vec<StoredSlice>>>,
    fail_at: Option<usize>,
}

impl MockImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the `index`-th store call (0-based) with an S3 error.
    pub fn failing_at(index: usize) -> Self {
        Self {
            stored: Arc::default(),
            fail_at: Some(index),
        }
    }

    /// Handle to the recorded calls, usable after the store is moved.
    pub fn recorder(&self) -> Arc<RwLock<Vec<StoredSlice>>> {
        Arc::clone(&self.stored)
    }
}

#[async_trait]
impl ImageStore for MockImageStore {
    async fn store(&self, path: &Path, public_id: &str) -> Result<String, StoreError> {
        let mut stored = self.stored.write().await;
        if self.fail_at == Some(stored.len()) {
            return Err(StoreError::S3("injected failure".to_string()));
        }

        let (width, height) =
            image::image_dimensions(path).map_err(|e| StoreError::Io(e.to_string()))?;
        stored.push(StoredSlice {
            public_id: public_id.to_string(),
            width,
            height,
        });

        Ok(format!("https://cdn.test/{}.png", public_id))
    }

    async fn status(&self) -> StoreStatus {
        StoreStatus {
            destination: Destination::Remote,
            remote_configured: true,
            remote_reachable: true,
            message: "mock store".to_string(),
        }
    }
}

// =============================================================================
// Router Helpers
// =============================================================================

/// A router over `store` with its data directory inside `root`.
pub fn test_router<S: ImageStore + 'static>(store: S, root: &TempDir) -> Router {
    test_router_with_config(store, root, RouterConfig::new().with_tracing(false))
}

pub fn test_router_with_config<S: ImageStore + 'static>(
    store: S,
    root: &TempDir,
    config: RouterConfig,
) -> Router {
    let service = ProcessService::new(store, DataLayout::new(root.path().join("data")));
    create_router(service, config)
}

/// Number of per-request directories left under uploads/ and slices/.
pub fn leftover_workspaces(root: &TempDir) -> usize {
    ["uploads", "slices"]
        .iter()
        .map(|d| root.path().join("data").join(d))
        .filter(|d| d.exists())
        .map(|d| std::fs::read_dir(d).map(|entries| entries.count()).unwrap_or(0))
        .sum()
}

// =============================================================================
// Multipart Builder
// =============================================================================

const BOUNDARY: &str = "imagemapper-test-boundary";

/// Builds a `multipart/form-data` body.
#[derive(Default)]
pub struct MultipartBuilder {
    body: Vec<u8>,
}

impl MultipartBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, name: &str, filename: &str, content_type: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                .as_bytes(),
        );
        self
    }

    /// Finish the body and wrap it in a `POST /process` request.
    pub fn into_request(mut self) -> Request<Body> {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/process")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(self.body))
            .unwrap()
    }
}

/// A complete `/process` request with an image and a map.
pub fn process_request(filename: &str, image: &[u8], map_html: &str) -> Request<Body> {
    MultipartBuilder::new()
        .file("image", filename, "application/octet-stream", image)
        .text("map_html", map_html)
        .into_request()
}

// =============================================================================
// Image Helpers
// =============================================================================

/// Encode a solid-colour image of the given size.
pub fn create_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

pub fn create_png(width: u32, height: u32) -> Vec<u8> {
    create_image(width, height, ImageFormat::Png)
}

/// A map with one rect per row band of `band` pixels over a `width` wide image.
pub fn banded_map(width: u32, bands: u32, band: u32) -> String {
    let areas: Vec<String> = (0..bands)
        .map(|i| {
            format!(
                r#"<area shape="rect" coords="0,{},{},{}" href="https://shop.test/{}" alt="Band {}">"#,
                i * band,
                width,
                (i + 1) * band,
                i,
                i
            )
        })
        .collect();
    format!("<map name=\"bands\">{}</map>", areas.join("\n"))
}
