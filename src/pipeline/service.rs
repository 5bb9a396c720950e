//! Request processing: parse → slice → publish → package.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        ProcessService                           │
//! │  1. Validate request      5. For each region, in order:         │
//! │  2. Create workspace         slice_image → ImageStore::store    │
//! │  3. Save + check upload   6. Render email HTML                  │
//! │  4. Parse map             7. Write HTML + ZIP to output/        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Regions are handled strictly one after another. The first slicing or
//! upload failure aborts the request; the workspace is removed either way.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use serde::Serialize;
use tokio::task;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::workspace::{has_allowed_extension, sanitize_file_name, DataLayout, Workspace};
use crate::archive::write_template_archive;
use crate::error::ProcessError;
use crate::map::{parse_map_report, Coordinates, Region, SkippedArea};
use crate::slice::{slice_image, validate_image_file};
use crate::store::ImageStore;
use crate::template::{render_email, EmailSlice};

// =============================================================================
// Request / Outcome
// =============================================================================

/// Input of one processing request.
#[derive(Debug, Clone, Default)]
pub struct ProcessRequest {
    /// Client-supplied file name of the image
    pub filename: String,

    /// Raw image bytes
    pub image: Bytes,

    /// Image-map markup
    pub map_html: String,
}

impl ProcessRequest {
    pub fn new(filename: impl Into<String>, image: impl Into<Bytes>, map_html: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            image: image.into(),
            map_html: map_html.into(),
        }
    }

    /// Check the request before any file is written.
    pub fn validate(&self) -> Result<(), ProcessError> {
        if self.filename.is_empty() || self.image.is_empty() {
            return Err(ProcessError::MissingImage);
        }
        if self.map_html.trim().is_empty() {
            return Err(ProcessError::MissingMap);
        }
        if !has_allowed_extension(&self.filename) {
            return Err(ProcessError::UnsupportedFileType {
                filename: self.filename.clone(),
            });
        }
        Ok(())
    }
}

/// Result of a successful request.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessOutcome {
    pub session_id: String,

    /// Rendered email document
    pub html: String,

    /// File name of the ZIP in the output directory
    pub archive_name: String,

    /// Published slices, in map order
    pub slices: Vec<EmailSlice>,

    /// Areas dropped while parsing the map
    pub skipped: Vec<SkippedArea>,
}

impl ProcessOutcome {
    pub fn slice_count(&self) -> usize {
        self.slices.len()
    }
}

/// File name of the rendered HTML for a session.
pub fn template_file_name(session_id: &str) -> String {
    format!("email_template_{}.html", session_id)
}

/// File name of the ZIP archive for a session.
pub fn archive_file_name(session_id: &str) -> String {
    format!("email_template_{}.zip", session_id)
}

// =============================================================================
// Process Service
// =============================================================================

/// Runs the whole upload → email pipeline for one request at a time.
///
/// # Type Parameters
///
/// * `S` - Where slices are published (local directory, S3, or both)
pub struct ProcessService<S> {
    store: S,
    layout: DataLayout,
}

impl<S: ImageStore> ProcessService<S> {
    pub fn new(store: S, layout: DataLayout) -> Self {
        Self { store, layout }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    /// Path of a generated archive, if `name` is a safe, existing file name.
    pub fn archive_path(&self, name: &str) -> Option<PathBuf> {
        let safe = sanitize_file_name(name);
        if safe != name || !safe.ends_with(".zip") {
            return None;
        }
        let path = self.layout.output_dir().join(safe);
        path.is_file().then_some(path)
    }

    /// Process one request end to end.
    pub async fn process(&self, request: ProcessRequest) -> Result<ProcessOutcome, ProcessError> {
        request.validate()?;

        let session_id = Uuid::new_v4().to_string();
        let workspace = Workspace::create(&self.layout, &session_id)
            .await
            .map_err(|e| ProcessError::Internal(format!("cannot create workspace: {}", e)))?;

        let result = self.run(&workspace, request).await;
        workspace.remove().await;
        result
    }

    async fn run(
        &self,
        workspace: &Workspace,
        request: ProcessRequest,
    ) -> Result<ProcessOutcome, ProcessError> {
        let session_id = workspace.session_id().to_string();

        // Save and check the upload
        let upload_path = workspace
            .upload_dir()
            .join(sanitize_file_name(&request.filename));
        tokio::fs::write(&upload_path, &request.image)
            .await
            .map_err(|e| ProcessError::Internal(format!("cannot save upload: {}", e)))?;

        let check_path = upload_path.clone();
        if !blocking(move || validate_image_file(&check_path)).await? {
            return Err(ProcessError::InvalidImage);
        }

        // Parse
        let report = parse_map_report(&request.map_html);
        if report.is_empty() {
            warn!(session_id = %session_id, skipped = report.skipped.len(), "No valid regions in map");
            return Err(ProcessError::NoRegions);
        }

        info!(
            session_id = %session_id,
            regions = report.regions.len(),
            skipped = report.skipped.len(),
            "Processing image"
        );

        // Slice and publish, one region at a time
        let mut slices = Vec::with_capacity(report.regions.len());
        for (index, region) in report.regions.iter().enumerate() {
            let slice_path =
                slice_region(&upload_path, region.coords, index, workspace.slices_dir()).await?;

            let public_id = format!("{}_slice_{}", session_id, index);
            let url = self
                .store
                .store(&slice_path, &public_id)
                .await
                .map_err(|source| ProcessError::Store { index, source })?;

            debug!(session_id = %session_id, index, url = %url, "Published slice");
            slices.push(EmailSlice::from_region(region, url));
        }

        // Package
        let html = render_email(&slices);
        let archive_name = self.write_outputs(&session_id, &html).await?;

        info!(
            session_id = %session_id,
            slices = slices.len(),
            archive = %archive_name,
            "Generated email template"
        );

        Ok(ProcessOutcome {
            session_id,
            html,
            archive_name,
            slices,
            skipped: report.skipped,
        })
    }

    async fn write_outputs(&self, session_id: &str, html: &str) -> Result<String, ProcessError> {
        let output_dir = self.layout.output_dir();
        tokio::fs::create_dir_all(&output_dir)
            .await
            .map_err(|e| ProcessError::Internal(format!("cannot create output dir: {}", e)))?;

        let html_path = output_dir.join(template_file_name(session_id));
        tokio::fs::write(&html_path, html)
            .await
            .map_err(|e| ProcessError::Internal(format!("cannot write template: {}", e)))?;

        let archive_name = archive_file_name(session_id);
        let archive_path = output_dir.join(&archive_name);
        let html = html.to_string();
        blocking(move || write_template_archive(&html, &archive_path)).await??;

        Ok(archive_name)
    }
}

/// Slice every region into `output_dir`, in order, stopping at the first
/// failure. Returns the written paths.
pub async fn slice_regions(
    source: &Path,
    regions: &[Region],
    output_dir: &Path,
) -> Result<Vec<PathBuf>, ProcessError> {
    let mut paths = Vec::with_capacity(regions.len());
    for (index, region) in regions.iter().enumerate() {
        paths.push(slice_region(source, region.coords, index, output_dir).await?);
    }
    Ok(paths)
}

async fn slice_region(
    source: &Path,
    coords: Coordinates,
    index: usize,
    output_dir: &Path,
) -> Result<PathBuf, ProcessError> {
    let source = source.to_path_buf();
    let output_dir = output_dir.to_path_buf();
    blocking(move || slice_image(&source, &coords, index, &output_dir))
        .await?
        .map_err(|source| ProcessError::Slice { index, source })
}

/// Run CPU/disk-bound work off the async runtime.
async fn blocking<T, F>(f: F) -> Result<T, ProcessError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    task::spawn_blocking(f)
        .await
        .map_err(|e| ProcessError::Internal(format!("worker task failed: {}", e)))
}

// =============================================================================
// Tests
// =============================================================================
