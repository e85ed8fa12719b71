//! Image editing through the ImageMagick command-line tools.
//!
//! | Operation | Tool / switches |
//! |---|---|
//! | **Probe** | none: `image` crate header sniff |
//! | **Resize** | `convert -resize WxH!` |
//! | **Crop** | `convert -crop WxH+X+Y +repage` |
//! | **Rotate** | `convert -alpha set -background none -rotate D` → PNG |
//! | **Flip** | `convert -flop` / `-flip` |
//! | **Sharpen** | `convert -sharpen 0xS` |
//! | **Background** | `convert -background rgba(…) -flatten` → PNG |
//! | **Reflection** | crop + flip, `gradient:`, `-compose CopyOpacity`, `-append` → PNG |
//! | **Watermark** | `composite -dissolve N% -geometry +X+Y` → PNG |
//! | **Save / Render** | `convert [-quality Q] FORMAT:out` |
//!
//! The module is split into:
//! - **Command**: [`CommandRunner`] trait + [`SystemRunner`], the only code that spawns processes
//! - **Tool**: [`Magick`], the shared install handle (executable paths, temp files)
//! - **Probe**: header-only metadata reads
//! - **Calculations**: pure functions for argument math (unit testable)
//! - **Parameters**: value types describing edits
//! - **Session**: [`ImageSession`], the per-image state machine
//! - **Operations**: [`EditOp`], textual edits applied in order

mod calculations;
pub mod command;
pub mod operations;
mod params;
pub mod probe;
pub mod session;
pub mod tool;

use std::path::PathBuf;
use thiserror::Error;

pub use crate::config::ConfigError;
pub use command::{CommandRunner, Invocation, Outcome, SystemRunner};
pub use operations::{EditOp, apply_all};
pub use params::{Background, FlipDirection, Opacity, Quality};
pub use probe::{ImageInfo, probe};
pub use session::ImageSession;
pub use tool::{Magick, resolve_command};

/// Conditions that abort an operation instead of reporting `false`.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Cannot resolve image path {}: {source}", path.display())]
    Unresolvable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Not an image or invalid image: {}: {reason}", path.display())]
    InvalidImage { path: PathBuf, reason: String },
    #[error("Failed to launch {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
