//! Configuration management.
//!
//! This module provides a configuration system that supports:
//! - Command-line arguments via clap, with `serve`, `slice` and `check`
//!   subcommands
//! - Environment variables with `IMAGEMAPPER_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Environment Variables
//!
//! - `IMAGEMAPPER_HOST` - Server bind address (default: 0.0.0.0)
//! - `IMAGEMAPPER_PORT` - Server port (default: 5000)
//! - `IMAGEMAPPER_DATA_DIR` - Working directory for uploads, slices and output (default: data)
//! - `IMAGEMAPPER_MAX_UPLOAD_BYTES` - Largest accepted upload (default: 16 MiB)
//! - `IMAGEMAPPER_CORS_ORIGINS` - Allowed CORS origins, comma-separated
//! - `IMAGEMAPPER_UPLOAD_DEST` - `auto`, `local` or `remote` (default: auto)
//! - `IMAGEMAPPER_LOCAL_STATIC_DIR` - Directory for locally stored slices (default: static/images)
//! - `IMAGEMAPPER_LOCAL_URL_PREFIX` - URL prefix for local slices (default: /static/images)
//! - `IMAGEMAPPER_S3_BUCKET` - S3 bucket; remote storage is off without it
//! - `IMAGEMAPPER_S3_ENDPOINT` - Custom endpoint for S3-compatible services
//! - `IMAGEMAPPER_S3_REGION` - AWS region (default: us-east-1)
//! - `IMAGEMAPPER_S3_FOLDER` - Key prefix for uploaded slices (default: imagemapper)
//! - `IMAGEMAPPER_PUBLIC_BASE_URL` - Public URL objects are served from (CDN)

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::server::{check_static_prefix, DEFAULT_MAX_UPLOAD_BYTES};
use crate::store::{
    Destination, S3Settings, StoreConfig, DEFAULT_LOCAL_URL_PREFIX, DEFAULT_S3_FOLDER,
};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 5000;

/// Default AWS region.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default data directory.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Default directory for locally stored slices.
pub const DEFAULT_LOCAL_STATIC_DIR: &str = "static/images";

// =============================================================================
// CLI Arguments
// =============================================================================

/// Image Mapper - turn an image and its HTML image map into a sliced,
/// responsive email template.
#[derive(Parser, Debug, Clone)]
#[command(name = "imagemapper")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the web server
    Serve(ServeConfig),

    /// Slice a local image along an image map, without uploading
    Slice(SliceConfig),

    /// Show storage configuration and test connectivity
    Check(CheckConfig),
}

// =============================================================================
// Storage Arguments
// =============================================================================

/// Where slices are published. Shared by `serve` and `check`.
#[derive(Args, Debug, Clone)]
pub struct StorageArgs {
    /// Slice destination: auto (remote with local fallback), local or remote.
    #[arg(long, value_enum, default_value_t = Destination::Auto, env = "IMAGEMAPPER_UPLOAD_DEST")]
    pub upload_dest: Destination,

    /// Directory for locally stored slices.
    #[arg(long, default_value = DEFAULT_LOCAL_STATIC_DIR, env = "IMAGEMAPPER_LOCAL_STATIC_DIR")]
    pub local_static_dir: PathBuf,

    /// URL prefix under which local slices are served.
    #[arg(long, default_value = DEFAULT_LOCAL_URL_PREFIX, env = "IMAGEMAPPER_LOCAL_URL_PREFIX")]
    pub local_url_prefix: String,

    /// S3 bucket for uploaded slices. Remote storage is disabled without it.
    #[arg(long, env = "IMAGEMAPPER_S3_BUCKET")]
    pub s3_bucket: Option<String>,

    /// Custom S3 endpoint URL for S3-compatible services (MinIO, etc.).
    #[arg(long, env = "IMAGEMAPPER_S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// AWS region for S3.
    #[arg(long, default_value = DEFAULT_REGION, env = "IMAGEMAPPER_S3_REGION")]
    pub s3_region: String,

    /// Key prefix for uploaded slices.
    #[arg(long, default_value = DEFAULT_S3_FOLDER, env = "IMAGEMAPPER_S3_FOLDER")]
    pub s3_folder: String,

    /// Public base URL for uploaded objects (e.g. a CDN in front of the bucket).
    #[arg(long, env = "IMAGEMAPPER_PUBLIC_BASE_URL")]
    pub public_base_url: Option<String>,
}

impl Default for StorageArgs {
    fn default() -> Self {
        Self {
            upload_dest: Destination::Auto,
            local_static_dir: PathBuf::from(DEFAULT_LOCAL_STATIC_DIR),
            local_url_prefix: DEFAULT_LOCAL_URL_PREFIX.to_string(),
            s3_bucket: None,
            s3_endpoint: None,
            s3_region: DEFAULT_REGION.to_string(),
            s3_folder: DEFAULT_S3_FOLDER.to_string(),
            public_base_url: None,
        }
    }
}

impl StorageArgs {
    /// Validate the storage arguments and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.upload_dest == Destination::Remote && self.bucket().is_none() {
            return Err(
                "Remote upload destination requires a bucket. \
                 Set --s3-bucket or IMAGEMAPPER_S3_BUCKET, or use --upload-dest=auto"
                    .to_string(),
            );
        }

        for (name, value) in [
            ("s3_endpoint", &self.s3_endpoint),
            ("public_base_url", &self.public_base_url),
        ] {
            if let Some(value) = value {
                url::Url::parse(value)
                    .map_err(|e| format!("{} is not a valid URL ({}): {}", name, value, e))?;
            }
        }

        if !self.local_url_prefix.starts_with('/') && url::Url::parse(&self.local_url_prefix).is_err()
        {
            return Err(format!(
                "local_url_prefix must be an absolute path or URL, got '{}'",
                self.local_url_prefix
            ));
        }

        if self.serves_local_files() {
            check_static_prefix(&self.local_url_prefix)?;
        }

        Ok(())
    }

    /// Configured bucket, ignoring blank values.
    pub fn bucket(&self) -> Option<&str> {
        self.s3_bucket
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
    }

    /// Build the store configuration handed to the uploader.
    pub fn to_store_config(&self) -> StoreConfig {
        let s3 = self.bucket().map(|bucket| S3Settings {
            bucket: bucket.to_string(),
            endpoint: self.s3_endpoint.clone(),
            region: self.s3_region.clone(),
            folder: self.s3_folder.clone(),
            public_base_url: self.public_base_url.clone(),
        });

        StoreConfig {
            destination: self.upload_dest,
            local_dir: self.local_static_dir.clone(),
            local_url_prefix: self.local_url_prefix.clone(),
            s3,
        }
    }

    /// Whether locally stored slices should be served by this process.
    ///
    /// Only relative prefixes can be served; an absolute URL points at some
    /// other host.
    pub fn serves_local_files(&self) -> bool {
        self.local_url_prefix.starts_with('/')
    }
}

// =============================================================================
// Serve Command
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "IMAGEMAPPER_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "IMAGEMAPPER_PORT")]
    pub port: u16,

    /// Working directory holding uploads/, slices/ and output/.
    #[arg(long, default_value = DEFAULT_DATA_DIR, env = "IMAGEMAPPER_DATA_DIR")]
    pub data_dir: PathBuf,

    /// Largest accepted upload in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_BYTES, env = "IMAGEMAPPER_MAX_UPLOAD_BYTES")]
    pub max_upload_bytes: usize,

    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "IMAGEMAPPER_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    #[command(flatten)]
    pub storage: StorageArgs,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_upload_bytes == 0 {
            return Err("max_upload_bytes must be greater than 0".to_string());
        }
        if self.data_dir.as_os_str().is_empty() {
            return Err("data_dir must not be empty".to_string());
        }
        self.storage.validate()
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// =============================================================================
// Slice Command
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct SliceConfig {
    /// Source image (PNG, JPG, JPEG or GIF).
    pub image: PathBuf,

    /// File containing the `<map>`/`<area>` markup.
    pub map: PathBuf,

    /// Directory receiving slice_{i}.png.
    #[arg(short, long, default_value = "slices")]
    pub output: PathBuf,

    /// Also write email_template.html referencing the slice files.
    #[arg(long, default_value_t = false)]
    pub html: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

// =============================================================================
// Check Command
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct CheckConfig {
    #[command(flatten)]
    pub storage: StorageArgs,

    /// Upload a small generated image and print its URL.
    #[arg(long, default_value_t = false)]
    pub probe: bool,

    /// Print the result as JSON.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

// =============================================================================
// Tests
// =============================================================================
