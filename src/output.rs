//! CLI output formatting.
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects. [`saved_info`] is the one
//! helper that reads from disk.
//!
//! ```text
//! photo.jpg
//!     Size: 1200x800
//!     Format: JPEG (image/jpeg)
//!
//! 001 crop:600x400+0+0 ok
//! 002 rotate:90 ok
//! 003 sharpen:20 FAILED
//! ```

use crate::imaging::probe::format_name;
use crate::imaging::{EditOp, ImageInfo, probe};
use log::warn;
use std::path::Path;

/// Metadata block for one image.
pub fn format_info(label: &Path, info: &ImageInfo) -> Vec<String> {
    vec![
        label.display().to_string(),
        format!("    Size: {}x{}", info.width, info.height),
        format!("    Format: {} ({})", format_name(info.format), info.mime),
    ]
}

pub fn print_info(label: &Path, info: &ImageInfo) {
    for line in format_info(label, info) {
        println!("{line}");
    }
}

/// Metadata to report for a file `save` just wrote.
///
/// ImageMagick writes formats the header probe cannot read (PPM, ICO, TGA);
/// for those the session's own metadata is reported instead.
pub fn saved_info(destination: &Path, session: ImageInfo) -> ImageInfo {
    match probe(destination) {
        Ok(info) => info,
        Err(e) => {
            warn!("cannot read back {}: {e}", destination.display());
            session
        }
    }
}

/// One line per edit. Edits after a failure are listed as skipped.
pub fn format_edit_report(ops: &[EditOp], failed: Option<usize>) -> Vec<String> {
    ops.iter()
        .enumerate()
        .map(|(i, op)| {
            let status = match failed {
                Some(f) if i == f => "FAILED",
                Some(f) if i > f => "skipped",
                _ => "ok",
            };
            format!("{:03} {op} {status}", i + 1)
        })
        .collect()
}

pub fn print_edit_report(ops: &[EditOp], failed: Option<usize>) {
    for line in format_edit_report(ops, failed) {
        println!("{line}");
    }
}

/// Result of the install check.
pub fn format_check(tool_dir: &Path, convert: &Path, composite: &Path) -> Vec<String> {
    vec![
        format!("ImageMagick: {}", tool_dir.display()),
        format!("    convert: {}", convert.display()),
        format!("    composite: {}", composite.display()),
    ]
}

pub fn print_check(tool_dir: &Path, convert: &Path, composite: &Path) {
    for line in format_check(tool_dir, convert, composite) {
        println!("{line}");
    }
}
