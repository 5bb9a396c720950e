//! Local filesystem store.
//!
//! Slices are moved into a static directory served by the HTTP layer and
//! referenced with a relative URL, so nothing depends on the public host
//! name of the deployment.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info};

use super::{check_public_id, Destination, ImageStore, StoreStatus};
use crate::error::StoreError;
use crate::slice::SLICE_FORMAT_EXTENSION;

/// Default URL prefix for locally stored slices.
pub const DEFAULT_LOCAL_URL_PREFIX: &str = "/static/images";

/// Store that keeps slices in a local static directory.
#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
    url_prefix: String,
}

impl LocalStore {
    /// Create a store writing into `dir`, served under `url_prefix`.
    pub fn new(dir: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        let url_prefix = url_prefix.into();
        Self {
            dir: dir.into(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }
}

#[async_trait]
impl ImageStore for LocalStore {
    async fn store(&self, path: &Path, public_id: &str) -> Result<String, StoreError> {
        check_public_id(public_id)?;

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or(SLICE_FORMAT_EXTENSION);
        let file_name = format!("{}.{}", public_id, ext);
        let dest = self.dir.join(&file_name);

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StoreError::Io(format!("{}: {}", self.dir.display(), e)))?;

        // Rename is cheapest; fall back to copy across filesystems
        if let Err(e) = fs::rename(path, &dest).await {
            debug!("Rename failed ({}), copying {}", e, path.display());
            fs::copy(path, &dest)
                .await
                .map_err(|e| StoreError::Io(format!("{}: {}", path.display(), e)))?;
        }

        let url = format!("{}/{}", self.url_prefix, file_name);
        info!(url = %url, "Stored slice locally");
        Ok(url)
    }

    async fn status(&self) -> StoreStatus {
        StoreStatus {
            destination: Destination::Local,
            remote_configured: false,
            remote_reachable: false,
            message: format!(
                "Storing slices in {} (served at {})",
                self.dir.display(),
                self.url_prefix
            ),
        }
    }
}
