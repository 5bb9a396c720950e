//! HTTP request handlers for the image-map email builder.
//!
//! # Endpoints
//!
//! - `GET /` - Upload form
//! - `POST /process` - Slice an uploaded image along its image map
//! - `GET /download/{filename}` - Download a generated template archive
//! - `GET /health` - Health check endpoint
//! - `GET /debug/storage` - Storage configuration and reachability

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, error, warn};

use super::page::{render_page, PageContent};
use crate::error::{ProcessError, StoreError};
use crate::pipeline::{ProcessRequest, ProcessService};
use crate::store::{ImageStore, StoreStatus};

/// Multipart field carrying the image file.
pub const IMAGE_FIELD: &str = "image";

/// Multipart field carrying the image-map markup.
pub const MAP_FIELD: &str = "map_html";

// =============================================================================
// Application State
// =============================================================================

/// Shared application state containing the processing service.
///
/// This is passed to all handlers via Axum's State extractor.
pub struct AppState<S: ImageStore> {
    pub service: Arc<ProcessService<S>>,
}

impl<S: ImageStore> AppState<S> {
    pub fn new(service: ProcessService<S>) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

impl<S: ImageStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response for the non-HTML endpoints.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    pub status: u16,
}

impl ErrorResponse {
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: status.as_u16(),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

impl ProcessError {
    /// HTTP status and error type identifier for this error.
    pub fn status(&self) -> (StatusCode, &'static str) {
        match self {
            ProcessError::MissingImage => (StatusCode::BAD_REQUEST, "missing_image"),
            ProcessError::MissingMap => (StatusCode::BAD_REQUEST, "missing_map"),
            ProcessError::UnsupportedFileType { .. } => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "unsupported_file_type")
            }
            ProcessError::InvalidImage => (StatusCode::BAD_REQUEST, "invalid_image"),
            ProcessError::NoRegions => (StatusCode::BAD_REQUEST, "no_regions"),
            ProcessError::Slice { source, .. } if source.is_user_error() => {
                (StatusCode::BAD_REQUEST, "invalid_region")
            }
            ProcessError::Slice { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "slice_error"),
            ProcessError::Store { source, .. } => match source {
                StoreError::S3(_) => (StatusCode::BAD_GATEWAY, "storage_error"),
                StoreError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
                StoreError::NotConfigured(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "storage_not_configured")
                }
            },
            ProcessError::UploadRejected { status, .. } => (
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_REQUEST),
                "upload_rejected",
            ),
            ProcessError::Archive(_) => (StatusCode::INTERNAL_SERVER_ERROR, "archive_error"),
            ProcessError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

/// Convert ProcessError to HTTP response.
///
/// The form page is rendered again with the error in a banner, under the
/// mapped status code:
/// - 4xx errors are logged at WARN level (client errors)
/// - 5xx errors are logged at ERROR level (server errors)
impl IntoResponse for ProcessError {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status();
        let message = self.to_string();

        if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                message
            );
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                message
            );
        }

        (status, Html(render_page(PageContent::Error(&message)))).into_response()
    }
}

impl From<MultipartError> for ProcessError {
    fn from(err: MultipartError) -> Self {
        let status = err.status();
        let message = if status == StatusCode::PAYLOAD_TOO_LARGE {
            "File too large. Please upload a smaller image.".to_string()
        } else {
            err.body_text()
        };
        ProcessError::UploadRejected {
            status: status.as_u16(),
            message,
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Serve the upload form.
///
/// # Endpoint
///
/// `GET /`
pub async fn index_handler() -> Html<String> {
    Html(render_page(PageContent::Form))
}

/// Process an uploaded image and its image map.
///
/// # Endpoint
///
/// `POST /process` (`multipart/form-data`)
///
/// # Form Fields
///
/// - `image`: The image file (PNG, JPG, JPEG or GIF)
/// - `map_html`: The `<map>`/`<area>` markup
///
/// # Response
///
/// - `200 OK`: Form page with a preview and a download link
/// - `400 Bad Request`: Missing field, invalid image, no usable areas, bad coordinates
/// - `413 Payload Too Large`: Upload exceeds the configured limit
/// - `415 Unsupported Media Type`: File extension not accepted
/// - `500`/`502`/`503`: Slicing, storage or packaging failure
pub async fn process_handler<S: ImageStore + 'static>(
    State(state): State<AppState<S>>,
    multipart: Multipart,
) -> Result<Html<String>, ProcessError> {
    let request = read_process_form(multipart).await?;
    let outcome = state.service.process(request).await?;
    Ok(Html(render_page(PageContent::Result(&outcome))))
}

/// Collect the known fields of the upload form; unknown fields are ignored.
async fn read_process_form(mut multipart: Multipart) -> Result<ProcessRequest, ProcessError> {
    let mut request = ProcessRequest::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            IMAGE_FIELD => {
                request.filename = field.file_name().unwrap_or_default().to_string();
                request.image = field.bytes().await?;
            }
            MAP_FIELD => {
                request.map_html = field.text().await?;
            }
            other => {
                debug!(field = other, "Ignoring unknown form field");
            }
        }
    }

    Ok(request)
}

/// Download a generated template archive.
///
/// # Endpoint
///
/// `GET /download/{filename}`
///
/// # Response
///
/// - `200 OK`: The ZIP as an attachment, `Cache-Control: max-age=0`
/// - `404 Not Found`: JSON error when the archive does not exist
pub async fn download_handler<S: ImageStore + 'static>(
    State(state): State<AppState<S>>,
    Path(filename): Path<String>,
) -> Response {
    let Some(path) = state.service.archive_path(&filename) else {
        debug!(filename = %filename, "Archive not found");
        return not_found(format!("Archive not found: {}", filename));
    };

    let data = match tokio::fs::read(&path).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return not_found(format!("Archive not found: {}", filename));
        }
        Err(e) => {
            error!(path = %path.display(), "Failed to read archive: {}", e);
            let status = StatusCode::INTERNAL_SERVER_ERROR;
            return (
                status,
                Json(ErrorResponse::with_status(
                    "io_error",
                    "Failed to read archive",
                    status,
                )),
            )
                .into_response();
        }
    };

    (
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
            (header::CACHE_CONTROL, "max-age=0".to_string()),
        ],
        Body::from(Bytes::from(data)),
    )
        .into_response()
}

fn not_found(message: String) -> Response {
    let status = StatusCode::NOT_FOUND;
    (
        status,
        Json(ErrorResponse::with_status("not_found", message, status)),
    )
        .into_response()
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health` (also `/healthz`)
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Report storage configuration and reachability.
///
/// # Endpoint
///
/// `GET /debug/storage`
pub async fn storage_status_handler<S: ImageStore + 'static>(
    State(state): State<AppState<S>>,
) -> Json<StoreStatus> {
    Json(state.service.store().status().await)
}

// =============================================================================
// Tests
// =============================================================================
