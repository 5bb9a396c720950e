//! Per-request scratch directories.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::slice::ALLOWED_EXTENSIONS;

/// Fallback name for uploads whose file name sanitizes to nothing.
const DEFAULT_UPLOAD_NAME: &str = "uploaded_image";

/// Directory layout under the data root.
///
/// ```text
/// {root}/uploads/{session_id}/   original upload   (per request, removed)
/// {root}/slices/{session_id}/    slice_{i}.png     (per request, removed)
/// {root}/output/                 email_template_{session_id}.{html,zip}
/// ```
#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.root.join("uploads")
    }

    pub fn slices_dir(&self) -> PathBuf {
        self.root.join("slices")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join("output")
    }

    /// Create the top-level directories.
    pub async fn ensure(&self) -> io::Result<()> {
        for dir in [self.uploads_dir(), self.slices_dir(), self.output_dir()] {
            fs::create_dir_all(&dir).await?;
        }
        Ok(())
    }
}

/// Upload and slice directories owned by one request.
///
/// [`Workspace::remove`] deletes both directories. A workspace dropped
/// without it (a cancelled request) is cleaned up on the blocking pool.
#[derive(Debug)]
pub struct Workspace {
    session_id: String,
    upload_dir: PathBuf,
    slices_dir: PathBuf,
    removed: bool,
}

impl Workspace {
    /// Create the directories for `session_id`.
    pub async fn create(layout: &DataLayout, session_id: &str) -> io::Result<Self> {
        let workspace = Self {
            session_id: session_id.to_string(),
            upload_dir: layout.uploads_dir().join(session_id),
            slices_dir: layout.slices_dir().join(session_id),
            removed: false,
        };

        fs::create_dir_all(&workspace.upload_dir).await?;
        fs::create_dir_all(&workspace.slices_dir).await?;
        debug!(session_id, "Created workspace");
        Ok(workspace)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn slices_dir(&self) -> &Path {
        &self.slices_dir
    }

    /// Delete both directories. Failures are logged, never returned.
    pub async fn remove(mut self) {
        for dir in [&self.upload_dir, &self.slices_dir] {
            log_removal(&self.session_id, dir, fs::remove_dir_all(dir).await);
        }
        self.removed = true;
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.removed {
            return;
        }

        let session_id = std::mem::take(&mut self.session_id);
        let dirs = [
            std::mem::take(&mut self.upload_dir),
            std::mem::take(&mut self.slices_dir),
        ];
        let cleanup = move || {
            for dir in &dirs {
                log_removal(&session_id, dir, std::fs::remove_dir_all(dir));
            }
        };

        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(cleanup);
            }
            Err(_) => cleanup(),
        }
    }
}

fn log_removal(session_id: &str, dir: &Path, result: io::Result<()>) {
    match result {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(session_id, "Failed to remove {}: {}", dir.display(), e),
    }
}

/// Reduce a client-supplied file name to a safe single path component.
///
/// Directory parts are dropped, whitespace becomes `_`, anything outside
/// `[A-Za-z0-9._-]` is removed and leading/trailing dots and underscores are
/// trimmed.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or_default();

    let cleaned: String = base
        .chars()
        .filter_map(|c| match c {
            c if c.is_whitespace() => Some('_'),
            c if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') => Some(c),
            _ => None,
        })
        .collect();

    let trimmed = cleaned.trim_matches(|c: char| c == '.' || c == '_');
    if trimmed.is_empty() {
        DEFAULT_UPLOAD_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// True when the file name carries one of the accepted image extensions.
pub fn has_allowed_extension(file_name: &str) -> bool {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
}
