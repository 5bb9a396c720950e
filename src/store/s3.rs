//! S3-backed slice store.
//!
//! Uploads slices to an S3 or S3-compatible bucket (MinIO, R2, etc.) and
//! returns a public URL for each object. The bucket (or the CDN in front of
//! it) must allow public reads for the generated email to render.

use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{error, info};

use super::{check_public_id, content_type_for, Destination, ImageStore, StoreStatus};
use crate::error::StoreError;
use crate::slice::SLICE_FORMAT_EXTENSION;

/// Default key prefix for uploaded slices.
pub const DEFAULT_S3_FOLDER: &str = "imagemapper";

/// Settings for the remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Settings {
    pub bucket: String,

    /// Custom endpoint for S3-compatible services
    pub endpoint: Option<String>,

    pub region: String,

    /// Key prefix ("folder") for uploaded objects; empty for the bucket root
    pub folder: String,

    /// Base URL objects are publicly reachable under (CDN or website
    /// endpoint). Derived from the bucket when not set.
    pub public_base_url: Option<String>,
}

impl S3Settings {
    /// Base URL that object keys are appended to.
    ///
    /// Precedence: explicit public base URL, then the custom endpoint in
    /// path style, then the AWS virtual-hosted URL.
    pub fn resolved_public_base_url(&self) -> String {
        if let Some(ref base) = self.public_base_url {
            return base.trim_end_matches('/').to_string();
        }

        match self.endpoint {
            Some(ref endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), self.bucket),
            None => format!("https://{}.s3.{}.amazonaws.com", self.bucket, self.region),
        }
    }
}

/// Store that uploads slices to an S3 bucket.
#[derive(Clone)]
pub struct S3Store {
    client: Client,
    bucket: String,
    folder: String,
    public_base_url: String,
}

impl S3Store {
    /// Create a store using an existing client.
    pub fn new(client: Client, settings: &S3Settings) -> Self {
        Self {
            client,
            bucket: settings.bucket.clone(),
            folder: settings.folder.trim_matches('/').to_string(),
            public_base_url: settings.resolved_public_base_url(),
        }
    }

    /// Create a client from the settings and wrap it in a store.
    pub async fn connect(settings: &S3Settings) -> Self {
        let client = create_s3_client(settings.endpoint.as_deref(), &settings.region).await;
        Self::new(client, settings)
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Object key for a public id and extension.
    pub fn object_key(&self, public_id: &str, ext: &str) -> String {
        if self.folder.is_empty() {
            format!("{}.{}", public_id, ext)
        } else {
            format!("{}/{}.{}", self.folder, public_id, ext)
        }
    }

    /// Public URL for an object key, percent-encoding each path segment.
    pub fn public_url(&self, key: &str) -> String {
        let encoded: Vec<_> = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!("{}/{}", self.public_base_url, encoded.join("/"))
    }

    /// Delete a previously uploaded slice.
    pub async fn delete(&self, public_id: &str) -> Result<(), StoreError> {
        check_public_id(public_id)?;
        let key = self.object_key(public_id, SLICE_FORMAT_EXTENSION);

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| StoreError::S3(e.to_string()))?;

        info!(key = %key, "Deleted slice from S3");
        Ok(())
    }

    /// Check that the bucket exists and is accessible.
    pub async fn ping(&self) -> Result<(), StoreError> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| StoreError::S3(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ImageStore for S3Store {
    async fn store(&self, path: &Path, public_id: &str) -> Result<String, StoreError> {
        check_public_id(public_id)?;

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or(SLICE_FORMAT_EXTENSION);
        let key = self.object_key(public_id, ext);

        let body = tokio::fs::read(path)
            .await
            .map_err(|e| StoreError::Io(format!("{}: {}", path.display(), e)))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(content_type_for(path))
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| {
                error!(key = %key, "S3 upload failed: {}", e);
                StoreError::S3(e.to_string())
            })?;

        let url = self.public_url(&key);
        info!(url = %url, "Uploaded slice to S3");
        Ok(url)
    }

    async fn status(&self) -> StoreStatus {
        let (reachable, message) = match self.ping().await {
            Ok(()) => (true, format!("Bucket '{}' is reachable", self.bucket)),
            Err(e) => (false, format!("Bucket '{}' ping failed: {}", self.bucket, e)),
        };

        StoreStatus {
            destination: Destination::Remote,
            remote_configured: true,
            remote_reachable: reachable,
            message,
        }
    }
}

/// Create an S3 client with optional custom endpoint and region.
///
/// Use a custom endpoint for S3-compatible services like MinIO:
/// ```ignore
/// let client = create_s3_client(Some("http://localhost:9000"), "us-east-1").await;
/// ```
///
/// For AWS S3, pass `None` to use the default endpoint:
/// ```ignore
/// let client = create_s3_client(None, "us-east-1").await;
/// ```
pub async fn create_s3_client(endpoint_url: Option<&str>, region: &str) -> Client {
    let region = aws_config::Region::new(region.to_string());
    let mut config_loader =
        aws_config::defaults(aws_config::BehaviorVersion::latest()).region(region);

    if let Some(endpoint) = endpoint_url {
        config_loader = config_loader.endpoint_url(endpoint);
    }

    let sdk_config = config_loader.load().await;

    // S3-compatible services generally need path-style addressing
    let s3_config = if endpoint_url.is_some() {
        aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build()
    } else {
        aws_sdk_s3::config::Builder::from(&sdk_config).build()
    };

    Client::from_conf(s3_config)
}
