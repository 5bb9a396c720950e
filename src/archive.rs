//! Downloadable template archive.
//!
//! The archive holds the generated email as a single `email_template.html`
//! entry, deflate-compressed.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::ArchiveError;

/// Name of the HTML entry inside the archive.
pub const TEMPLATE_ENTRY_NAME: &str = "email_template.html";

/// Write `html` into a new ZIP archive at `dest`.
pub fn write_template_archive(html: &str, dest: &Path) -> Result<(), ArchiveError> {
    let file = File::create(dest).map_err(|e| ArchiveError::Io(e.to_string()))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    zip.start_file(TEMPLATE_ENTRY_NAME, options)
        .map_err(|e| ArchiveError::Zip(e.to_string()))?;
    zip.write_all(html.as_bytes())
        .map_err(|e| ArchiveError::Io(e.to_string()))?;

    let mut writer = zip.finish().map_err(|e| ArchiveError::Zip(e.to_string()))?;
    writer.flush().map_err(|e| ArchiveError::Io(e.to_string()))
}
