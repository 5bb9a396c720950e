//! HTTP server layer.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │        GET /    POST /process    GET /download/{filename}       │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────────┐  │
//! │  │  handlers   │  │    page     │  │        routes           │  │
//! │  │ (requests)  │  │ (form/HTML) │  │  (router config)        │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod page;
pub mod routes;

pub use handlers::{
    download_handler, health_handler, index_handler, process_handler, storage_status_handler,
    AppState, ErrorResponse, HealthResponse, IMAGE_FIELD, MAP_FIELD,
};
pub use page::{render_page, PageContent};
pub use routes::{check_static_prefix, create_router, RouterConfig, DEFAULT_MAX_UPLOAD_BYTES};
