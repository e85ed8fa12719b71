//! Header-only metadata probe.
//!
//! Reads just enough of a file to learn its dimensions and encoding. The
//! format is sniffed from magic bytes, never from the file name: session temp
//! files have no extension, and a `PNG:`-prefixed output may sit in a file
//! that used to hold a JPEG.

use super::SessionError;
use image::{ImageFormat, ImageReader};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Result of probing an image file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageInfo {
    /// Canonical absolute path that was probed.
    pub file: PathBuf,
    pub width: u32,
    pub height: u32,
    #[serde(serialize_with = "serialize_format")]
    pub format: ImageFormat,
    pub mime: &'static str,
}

fn serialize_format<S: serde::Serializer>(format: &ImageFormat, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(format_name(*format))
}

/// Upper-case ImageMagick coder name for a format (`PNG`, `JPEG`, …).
pub fn format_name(format: ImageFormat) -> &'static str {
    format.extensions_str().first().map_or("UNKNOWN", |ext| match *ext {
        "jpg" => "JPEG",
        "png" => "PNG",
        "gif" => "GIF",
        "webp" => "WEBP",
        "tiff" | "tif" => "TIFF",
        "bmp" => "BMP",
        "avif" => "AVIF",
        "ico" => "ICO",
        "pnm" | "pbm" | "pgm" | "ppm" | "pam" => "PNM",
        "tga" => "TGA",
        "dds" => "DDS",
        "hdr" => "HDR",
        "exr" => "EXR",
        "ff" => "FARBFELD",
        "qoi" => "QOI",
        _ => "UNKNOWN",
    })
}

/// Probe `path` for dimensions, format, and mime type.
///
/// An unresolvable path is reported separately from a file whose header is
/// not a recognised image; both abort the calling operation.
pub fn probe(path: &Path) -> Result<ImageInfo, SessionError> {
    let file = std::fs::canonicalize(path).map_err(|source| SessionError::Unresolvable {
        path: path.to_path_buf(),
        source,
    })?;

    let invalid = |reason: String| SessionError::InvalidImage {
        path: file.clone(),
        reason,
    };

    let reader = ImageReader::open(&file)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| invalid(e.to_string()))?;
    let format = reader
        .format()
        .ok_or_else(|| invalid("unrecognised image header".to_string()))?;
    let (width, height) = reader.into_dimensions().map_err(|e| invalid(e.to_string()))?;

    Ok(ImageInfo {
        file,
        width,
        height,
        format,
        mime: format.to_mime_type(),
    })
}
