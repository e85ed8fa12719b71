//! # Magick Session
//!
//! Stateful image editing on top of the ImageMagick command-line tools.
//! A session wraps one source image; each edit runs `convert` (or
//! `composite`) against the current working copy, writes a fresh temp file,
//! and swaps it in only when the tool succeeded and the result reads back
//! as an image. The source file is never modified.
//!
//! ```text
//! open(photo.jpg) ──► crop ──► rotate ──► sharpen ──► save(out.png)
//!        │             │         │           │
//!   probe header    tmp#1     tmp#2       tmp#3     (each replaces and
//!                                                    deletes the last)
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `magick.toml` loading, stock defaults, validation |
//! | [`imaging`] | Tool resolution, process launching, probing, the edit session |
//! | [`output`] | CLI output formatting |
//!
//! # Example
//!
//! ```no_run
//! use magick_session::config::MagickConfig;
//! use magick_session::imaging::{FlipDirection, ImageSession, Magick};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let magick = Arc::new(Magick::new(&MagickConfig::default())?);
//! let mut session = ImageSession::open(magick, "photo.jpg")?;
//! session.crop(600, 400, 0, 0)?;
//! session.flip(FlipDirection::Horizontal)?;
//! session.save("photo-edited.png", None)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Failure Model
//!
//! An edit that the tool rejects returns `Ok(false)` and leaves the session
//! exactly as it was. Errors are reserved for things a retry cannot fix: a
//! missing install, an unreadable source, a process that cannot be started,
//! or a tool that claimed success but produced something that is not an
//! image.

pub mod config;
pub mod imaging;
pub mod output;

#[cfg(test)]
pub(crate) mod test_helpers;
