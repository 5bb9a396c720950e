//! Destination-aware front end over the local and remote stores.

use std::path::Path;

use async_trait::async_trait;
use tracing::{error, warn};

use super::{Destination, ImageStore, LocalStore, S3Store, StoreConfig, StoreStatus};
use crate::error::StoreError;

/// Publishes slices according to the configured [`Destination`].
#[derive(Clone)]
pub struct Uploader {
    destination: Destination,
    local: LocalStore,
    remote: Option<S3Store>,
}

impl Uploader {
    pub fn new(destination: Destination, local: LocalStore, remote: Option<S3Store>) -> Self {
        Self {
            destination,
            local,
            remote,
        }
    }

    /// Build the uploader from configuration, creating the S3 client when a
    /// bucket is configured and the destination may use it.
    pub async fn from_config(config: &StoreConfig) -> Self {
        let local = LocalStore::new(&config.local_dir, &config.local_url_prefix);

        let remote = match (&config.s3, config.destination) {
            (_, Destination::Local) => None,
            (Some(settings), _) => Some(S3Store::connect(settings).await),
            (None, _) => None,
        };

        Self::new(config.destination, local, remote)
    }

    pub fn destination(&self) -> Destination {
        self.destination
    }

    pub fn local(&self) -> &LocalStore {
        &self.local
    }

    pub fn remote(&self) -> Option<&S3Store> {
        self.remote.as_ref()
    }
}

#[async_trait]
impl ImageStore for Uploader {
    async fn store(&self, path: &Path, public_id: &str) -> Result<String, StoreError> {
        match self.destination {
            Destination::Local => self.local.store(path, public_id).await,

            Destination::Remote => match self.remote {
                Some(ref remote) => remote.store(path, public_id).await.map_err(|e| {
                    error!("Remote storage forced but upload failed: {}", e);
                    e
                }),
                None => Err(StoreError::NotConfigured(
                    "destination is 'remote' but no S3 bucket is set".to_string(),
                )),
            },

            Destination::Auto => {
                if let Some(ref remote) = self.remote {
                    match remote.store(path, public_id).await {
                        Ok(url) => return Ok(url),
                        Err(e) => {
                            warn!("Remote upload failed, falling back to local storage: {}", e)
                        }
                    }
                }
                self.local.store(path, public_id).await
            }
        }
    }

    async fn status(&self) -> StoreStatus {
        let Some(ref remote) = self.remote else {
            let local = self.local.status().await;
            let message = match self.destination {
                Destination::Remote => "Remote storage required but no S3 bucket is configured",
                _ => "No S3 bucket configured, slices are stored locally",
            };
            return StoreStatus {
                destination: self.destination,
                message: format!("{}. {}", message, local.message),
                ..local
            };
        };

        let remote_status = remote.status().await;
        let message = if self.destination == Destination::Auto && !remote_status.remote_reachable
        {
            format!("{} (uploads will fall back to local storage)", remote_status.message)
        } else {
            remote_status.message
        };

        StoreStatus {
            destination: self.destination,
            remote_configured: true,
            remote_reachable: remote_status.remote_reachable,
            message,
        }
    }
}
