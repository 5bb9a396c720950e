//! Router configuration for the image-map email builder.
//!
//! # Route Structure
//!
//! ```text
//! /                       - Upload form
//! /process                - Multipart upload (POST)
//! /download/{filename}    - Generated template archive
//! /health, /healthz       - Health check
//! /debug/storage          - Storage status
//! /static/images/*        - Locally stored slices (when configured)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use imagemapper::pipeline::{DataLayout, ProcessService};
//! use imagemapper::server::{create_router, RouterConfig};
//! use imagemapper::store::LocalStore;
//!
//! let store = LocalStore::new("static/images", "/static/images");
//! let service = ProcessService::new(store, DataLayout::new("data"));
//!
//! let config = RouterConfig::new()
//!     .with_static_files("/static/images", "static/images");
//!
//! let router = create_router(service, config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:5000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::path::PathBuf;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use http::header::CONTENT_TYPE;
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::warn;

use super::handlers::{
    download_handler, health_handler, index_handler, process_handler, storage_status_handler,
    AppState,
};
use crate::pipeline::ProcessService;
use crate::store::ImageStore;

/// Default maximum upload size (16 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// First path segments owned by application routes.
const RESERVED_SEGMENTS: &[&str] = &["process", "download", "health", "healthz", "debug"];

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,

    /// Largest accepted request body in bytes
    pub max_upload_bytes: usize,

    /// URL prefix and directory of locally stored slices
    pub static_files: Option<(String, PathBuf)>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterConfig {
    /// Create a router configuration.
    ///
    /// By default:
    /// - CORS allows any origin
    /// - Tracing is enabled
    /// - Uploads are limited to 16 MiB
    /// - No static files are served
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            enable_tracing: true,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            static_files: None,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }

    pub fn with_max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }

    /// Serve `dir` under the URL `prefix`.
    pub fn with_static_files(mut self, prefix: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        self.static_files = Some((prefix.into(), dir.into()));
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// # Arguments
///
/// * `service` - The processing service behind `/process` and `/download`
/// * `config` - Router configuration
pub fn create_router<S>(service: ProcessService<S>, config: RouterConfig) -> Router
where
    S: ImageStore + 'static,
{
    let app_state = AppState::new(service);
    let cors = build_cors_layer(&config);

    let mut router = Router::new()
        .route("/", get(index_handler))
        .route("/process", post(process_handler::<S>))
        .route("/download/{filename}", get(download_handler::<S>))
        .route("/health", get(health_handler))
        .route("/healthz", get(health_handler))
        .route("/debug/storage", get(storage_status_handler::<S>))
        .with_state(app_state)
        .layer(DefaultBodyLimit::max(config.max_upload_bytes));

    if let Some((prefix, dir)) = &config.static_files {
        match check_static_prefix(prefix) {
            Ok(path) => router = router.nest_service(&path, ServeDir::new(dir)),
            Err(e) => warn!("Not serving {}: {}", dir.display(), e),
        }
    }

    let router = router.layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Check that static files can be mounted at `prefix`.
///
/// Returns the normalized path (`static/images/` -> `/static/images`). The
/// root and any prefix under an application route are rejected.
pub fn check_static_prefix(prefix: &str) -> Result<String, String> {
    let path = normalize_prefix(prefix);
    let first = path.trim_start_matches('/').split('/').next().unwrap_or_default();

    if first.is_empty() {
        return Err(format!(
            "Static URL prefix '{}' would mount files at the site root",
            prefix
        ));
    }
    if RESERVED_SEGMENTS.contains(&first) {
        return Err(format!(
            "Static URL prefix '{}' conflicts with the /{} route",
            prefix, first
        ));
    }
    if path.contains(|c: char| matches!(c, '{' | '}' | '*')) {
        return Err(format!(
            "Static URL prefix '{}' contains route pattern characters",
            prefix
        ));
    }

    Ok(path)
}

/// `static/images/` -> `/static/images`
fn normalize_prefix(prefix: &str) -> String {
    format!("/{}", prefix.trim_matches('/'))
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(86400)); // 24 hours

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
