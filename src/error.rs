use std::path::PathBuf;

use thiserror::Error;

use crate::map::Coordinates;

/// Errors that can occur while cropping a region out of a source image
#[derive(Debug, Clone, Error)]
pub enum SliceError {
    /// Rectangle reaches outside the source image
    #[error("Coordinates {coords} are outside image bounds ({width}x{height})")]
    OutOfBounds {
        coords: Coordinates,
        width: u32,
        height: u32,
    },

    /// Rectangle has zero or negative width or height
    #[error("Degenerate rectangle: {coords} (x1 must be < x2 and y1 must be < y2)")]
    Degenerate { coords: Coordinates },

    /// Source image could not be opened or decoded
    #[error("Cannot read image {path}: {message}")]
    Unreadable { path: PathBuf, message: String },

    /// Cropped image could not be written
    #[error("Cannot write slice {path}: {message}")]
    WriteFailed { path: PathBuf, message: String },
}

impl SliceError {
    /// Whether the error was caused by the map coordinates rather than the
    /// environment (codec or filesystem).
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            SliceError::OutOfBounds { .. } | SliceError::Degenerate { .. }
        )
    }
}

/// Errors from publishing a slice to local or remote storage
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Error from S3 or S3-compatible storage
    #[error("S3 error: {0}")]
    S3(String),

    /// Local filesystem error
    #[error("Local storage error: {0}")]
    Io(String),

    /// Remote storage was requested but is not configured
    #[error("Remote storage is not configured: {0}")]
    NotConfigured(String),
}

/// Errors from packaging the generated template
#[derive(Debug, Clone, Error)]
pub enum ArchiveError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("ZIP error: {0}")]
    Zip(String),
}

/// Errors that end a whole processing request
#[derive(Debug, Clone, Error)]
pub enum ProcessError {
    /// No image part in the upload
    #[error("No image file provided")]
    MissingImage,

    /// No image-map markup in the upload
    #[error("No HTML map markup provided")]
    MissingMap,

    /// Upload has an extension outside the accepted raster formats
    #[error("Unsupported file type '{filename}': upload a PNG, JPG, JPEG or GIF image")]
    UnsupportedFileType { filename: String },

    /// Upload is not a decodable image
    #[error("Uploaded file is not a valid image")]
    InvalidImage,

    /// The map yielded no usable rectangles
    #[error("No valid area tags found in the HTML map")]
    NoRegions,

    /// Slicing a region failed; the batch is aborted
    #[error("Slice {} failed: {source}", .index + 1)]
    Slice {
        index: usize,
        #[source]
        source: SliceError,
    },

    /// Publishing a slice failed; the batch is aborted
    #[error("Upload of slice {} failed: {source}", .index + 1)]
    Store {
        index: usize,
        #[source]
        source: StoreError,
    },

    /// Writing the template or its archive failed
    #[error("Packaging failed: {0}")]
    Archive(#[from] ArchiveError),

    /// Multipart body could not be read (size limit, malformed form)
    #[error("{message}")]
    UploadRejected { status: u16, message: String },

    /// Workspace or other internal failure
    #[error("Internal error: {0}")]
    Internal(String),
}
