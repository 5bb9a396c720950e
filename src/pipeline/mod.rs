//! Processing pipeline.
//!
//! One request flows through four stages:
//!
//! 1. **Workspace** - upload saved under a fresh session id
//! 2. **Map** - `<area>` tags parsed into rectangular regions
//! 3. **Slice + publish** - each region cropped, then stored locally or on S3
//! 4. **Package** - email HTML rendered and zipped into the output directory
//!
//! Scratch directories are removed when the request finishes, whatever the
//! outcome. Only the output directory persists between requests.

mod service;
mod workspace;

pub use service::{
    archive_file_name, slice_regions, template_file_name, ProcessOutcome, ProcessRequest,
    ProcessService,
};
pub use workspace::{has_allowed_extension, sanitize_file_name, DataLayout, Workspace};
