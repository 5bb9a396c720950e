//! Rectangle cropping with PNG output.
//!
//! Slices are always written as PNG, whatever the source format, so that the
//! upload and template steps only ever see one MIME type. The encoder runs
//! with best compression and adaptive filtering; PNG is lossless so this only
//! trades CPU for size.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ImageReader};
use tracing::{debug, info, warn};

use crate::error::SliceError;
use crate::map::Coordinates;

/// Extension of every slice written.
pub const SLICE_FORMAT_EXTENSION: &str = "png";

/// Upload extensions accepted as source images.
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif"];

/// File name of the slice with the given index.
pub fn slice_file_name(index: usize) -> String {
    format!("slice_{}.{}", index, SLICE_FORMAT_EXTENSION)
}

/// Crop `coords` out of the image at `source` into `output_dir/slice_{index}.png`.
///
/// The crop is half-open: `[x1, x2) × [y1, y2)`, so the slice is exactly
/// `x2 - x1` by `y2 - y1` pixels.
///
/// # Errors
///
/// - [`SliceError::Unreadable`] if the source cannot be opened or decoded
/// - [`SliceError::OutOfBounds`] if the rectangle leaves the image
/// - [`SliceError::Degenerate`] if the rectangle has no area
/// - [`SliceError::WriteFailed`] if the PNG cannot be written
pub fn slice_image(
    source: &Path,
    coords: &Coordinates,
    index: usize,
    output_dir: &Path,
) -> Result<PathBuf, SliceError> {
    let img = open_image(source)?;
    let (x, y, width, height) = check_rectangle(coords, img.width(), img.height())?;

    let cropped = img.crop_imm(x, y, width, height);

    let output_path = output_dir.join(slice_file_name(index));
    write_png(&cropped, &output_path)?;

    info!(
        index,
        coords = %coords,
        path = %output_path.display(),
        "Sliced image"
    );
    Ok(output_path)
}

/// Validate a rectangle against image dimensions.
///
/// Bounds are checked before degeneracy, so `[10, 10, 5, 5]` on a large
/// image is reported as degenerate while `[0, 0, 0, 500]` on a 100px tall
/// image is reported as out of bounds.
///
/// Returns the crop origin and size as `(x, y, width, height)`.
pub fn check_rectangle(
    coords: &Coordinates,
    image_width: u32,
    image_height: u32,
) -> Result<(u32, u32, u32, u32), SliceError> {
    let out_of_bounds = || SliceError::OutOfBounds {
        coords: *coords,
        width: image_width,
        height: image_height,
    };

    if !coords.fits_within(image_width, image_height) {
        return Err(out_of_bounds());
    }
    if coords.is_degenerate() {
        return Err(SliceError::Degenerate { coords: *coords });
    }

    let to_u32 = |v: i64| u32::try_from(v).map_err(|_| out_of_bounds());
    Ok((
        to_u32(coords.x1)?,
        to_u32(coords.y1)?,
        to_u32(coords.width())?,
        to_u32(coords.height())?,
    ))
}

/// Read `(width, height)` without decoding pixel data.
pub fn image_dimensions(path: &Path) -> Result<(u32, u32), SliceError> {
    ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| unreadable(path, e))?
        .into_dimensions()
        .map_err(|e| unreadable(path, e))
}

/// Check that `path` holds a complete, decodable image.
pub fn validate_image_file(path: &Path) -> bool {
    match open_image(path) {
        Ok(img) => {
            debug!(
                path = %path.display(),
                width = img.width(),
                height = img.height(),
                "Validated image file"
            );
            true
        }
        Err(e) => {
            warn!("Invalid image file: {}", e);
            false
        }
    }
}

fn open_image(path: &Path) -> Result<DynamicImage, SliceError> {
    // Format is sniffed from content; upload extensions are not trusted
    ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| unreadable(path, e))?
        .decode()
        .map_err(|e| unreadable(path, e))
}

fn write_png(img: &DynamicImage, path: &Path) -> Result<(), SliceError> {
    let write_failed = |message: String| SliceError::WriteFailed {
        path: path.to_path_buf(),
        message,
    };

    let file = File::create(path).map_err(|e| write_failed(e.to_string()))?;
    let mut writer = BufWriter::new(file);
    let encoder =
        PngEncoder::new_with_quality(&mut writer, CompressionType::Best, FilterType::Adaptive);

    img.write_with_encoder(encoder)
        .map_err(|e| write_failed(e.to_string()))?;
    writer.flush().map_err(|e| write_failed(e.to_string()))
}

fn unreadable(path: &Path, err: impl std::fmt::Display) -> SliceError {
    SliceError::Unreadable {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

// =============================================================================
// Tests
// =============================================================================
