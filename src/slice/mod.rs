//! Image slicing.
//!
//! Crops rectangles out of a source image and writes each crop as a PNG
//! named `slice_{index}.png`. Every call is a single open → validate →
//! crop → write pass over the source file; nothing is cached between calls.
//!
//! # Components
//!
//! - [`slice_image`]: crop one rectangle to `output_dir/slice_{index}.png`
//! - [`image_dimensions`]: read `(width, height)` from the image header
//! - [`validate_image_file`]: check that a file fully decodes as an image
//! - [`check_rectangle`]: the bounds/degenerate validation used by the slicer

mod slicer;

pub use slicer::{
    check_rectangle, image_dimensions, slice_file_name, slice_image, validate_image_file,
    ALLOWED_EXTENSIONS, SLICE_FORMAT_EXTENSION,
};
