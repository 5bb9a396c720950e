//! # Image Mapper
//!
//! Turns an image and its HTML image map into a responsive email template.
//!
//! Each rectangular `<area>` of the map is cropped out of the image,
//! published to S3-compatible object storage (or a local static directory),
//! and the pieces are stacked back together as linked images in a
//! self-contained HTML email, delivered with a ZIP download.
//!
//! ## Architecture
//!
//! - [`map`] - Tolerant `<area>` parsing into rectangular regions
//! - [`slice`] - Cropping regions out of the source image as PNG files
//! - [`store`] - Publishing slices locally or to S3
//! - [`template`] - Rendering the email document
//! - [`archive`] - Packaging the email as a ZIP
//! - [`pipeline`] - The per-request flow tying the above together
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use imagemapper::{create_router, DataLayout, LocalStore, ProcessService, RouterConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = LocalStore::new("static/images", "/static/images");
//!     let service = ProcessService::new(store, DataLayout::new("data"));
//!     let router = create_router(
//!         service,
//!         RouterConfig::new().with_static_files("/static/images", "static/images"),
//!     );
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:5000").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod archive;
pub mod config;
pub mod error;
pub mod map;
pub mod pipeline;
pub mod server;
pub mod slice;
pub mod store;
pub mod template;

// Re-export commonly used types
pub use archive::{write_template_archive, TEMPLATE_ENTRY_NAME};
pub use config::{CheckConfig, Cli, Command, ServeConfig, SliceConfig, StorageArgs};
pub use error::{ArchiveError, ProcessError, SliceError, StoreError};
pub use map::{
    parse_map, parse_map_report, validate_coordinates, Coordinates, MapParseReport, Region,
    SkipReason, SkippedArea,
};
pub use pipeline::{DataLayout, ProcessOutcome, ProcessRequest, ProcessService};
pub use server::{create_router, RouterConfig};
pub use slice::{image_dimensions, slice_image, validate_image_file};
pub use store::{
    create_s3_client, Destination, ImageStore, LocalStore, S3Settings, S3Store, StoreConfig,
    StoreStatus, Uploader,
};
pub use template::{render_email, EmailSlice};
