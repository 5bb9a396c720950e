//! Slice publishing.
//!
//! An [`ImageStore`] takes a slice file on local disk and returns a URL the
//! generated email can reference. Two backends exist:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │                Uploader                 │
//! │   destination = auto | local | remote   │
//! └──────────┬──────────────────┬───────────┘
//!            │                  │
//!            ▼                  ▼
//! ┌───────────────────┐  ┌──────────────────┐
//! │     S3Store       │  │   LocalStore     │
//! │ (S3 / MinIO, URL  │  │ (static dir,     │
//! │  from bucket)     │  │  relative URL)   │
//! └───────────────────┘  └──────────────────┘
//! ```
//!
//! In `auto` mode the remote store is tried first when it is configured and
//! a failed remote upload falls back to local storage. `remote` never falls
//! back; `local` never touches the network.
//!
//! The destination is an explicit [`StoreConfig`] value built once at
//! startup and handed to [`Uploader::from_config`].

mod local;
mod s3;
mod uploader;

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;

use crate::error::StoreError;

pub use local::{LocalStore, DEFAULT_LOCAL_URL_PREFIX};
pub use s3::{create_s3_client, S3Settings, S3Store, DEFAULT_S3_FOLDER};
pub use uploader::Uploader;

/// Storage that publishes a local file and returns its public URL.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Publish the file at `path` under `public_id` (no extension) and
    /// return a URL for it.
    ///
    /// The file may be moved; callers must not rely on `path` afterwards.
    async fn store(&self, path: &Path, public_id: &str) -> Result<String, StoreError>;

    /// Describe the store's configuration and reachability.
    async fn status(&self) -> StoreStatus;
}

/// Where slices are published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    /// Remote when configured, local otherwise or on remote failure
    #[default]
    Auto,
    /// Local static directory only
    Local,
    /// Remote object storage only
    Remote,
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Destination::Auto => "auto",
            Destination::Local => "local",
            Destination::Remote => "remote",
        };
        f.write_str(name)
    }
}

/// Storage configuration passed to [`Uploader::from_config`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub destination: Destination,

    /// Directory receiving locally stored slices
    pub local_dir: PathBuf,

    /// URL prefix under which `local_dir` is served
    pub local_url_prefix: String,

    /// Remote settings, `None` when no bucket is configured
    pub s3: Option<S3Settings>,
}

/// Snapshot of a store's state, reported by `/debug/storage` and `check`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStatus {
    pub destination: Destination,
    pub remote_configured: bool,
    pub remote_reachable: bool,
    pub message: String,
}

/// MIME type for a stored file, from its extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

/// Reject public ids that would escape the store's namespace.
fn check_public_id(public_id: &str) -> Result<(), StoreError> {
    let valid = !public_id.is_empty()
        && !public_id.contains(|c: char| c == '/' || c == '\\')
        && !public_id.starts_with('.');
    if valid {
        Ok(())
    } else {
        Err(StoreError::Io(format!("invalid public id '{}'", public_id)))
    }
}
