//! Shared test utilities.
//!
//! Fixture images are generated on the fly with the `image` crate so tests
//! need no binary files checked in, and a [`MockRunner`] stands in for
//! ImageMagick.
//!
//! ```text
//! use crate::test_helpers::*;
//!
//! let env = MockEnv::new(vec![MockResponse::Image { width: 50, height: 50 }]);
//! let original = write_png(env.source.path(), "in.png", 100, 50);
//! let mut session = env.open(&original);
//! assert!(session.crop(50, 50, 0, 0).unwrap());
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

pub use crate::imaging::command::tests::{MockResponse, MockRunner};
use crate::config::MagickConfig;
use crate::imaging::{ImageSession, Magick};

// =========================================================================
// Fixture images
// =========================================================================

/// Write a transparent PNG of the given size and return its path.
pub fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    image::RgbaImage::new(width, height)
        .save_with_format(&path, image::ImageFormat::Png)
        .unwrap();
    path
}

/// Write a gray JPEG of the given size and return its path.
pub fn write_jpeg(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    image::RgbImage::from_pixel(width, height, image::Rgb([128, 128, 128]))
        .save_with_format(&path, image::ImageFormat::Jpeg)
        .unwrap();
    path
}

/// Sorted file names in a directory.
pub fn list_dir(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

// =========================================================================
// Mock environment
// =========================================================================

/// A [`Magick`] context wired to a [`MockRunner`], with private directories
/// for the fake install, the session temp files, and source images.
pub struct MockEnv {
    _tool_dir: TempDir,
    pub temp: TempDir,
    pub source: TempDir,
    pub magick: Arc<Magick<MockRunner>>,
}

impl MockEnv {
    /// The availability check consumes one scripted response; this
    /// constructor answers it, so `script` covers only the edits.
    pub fn new(script: Vec<MockResponse>) -> Self {
        let mut full = vec![MockResponse::Fail(1)];
        full.extend(script);
        Self::with_runner(MockRunner::new(full))
    }

    pub fn with_runner(runner: MockRunner) -> Self {
        let tool_dir = TempDir::new().unwrap();
        let temp = TempDir::new().unwrap();
        let source = TempDir::new().unwrap();
        let config = MagickConfig {
            tool_dir: tool_dir.path().to_path_buf(),
            temp_dir: Some(temp.path().to_path_buf()),
            working_quality: 100,
        };
        let magick = Arc::new(Magick::with_runner(&config, runner).unwrap());
        Self {
            _tool_dir: tool_dir,
            temp,
            source,
            magick,
        }
    }

    pub fn runner(&self) -> &MockRunner {
        self.magick.runner()
    }

    pub fn open(&self, path: &Path) -> ImageSession<MockRunner> {
        ImageSession::open(Arc::clone(&self.magick), path).unwrap()
    }

    /// File names currently in the session temp directory.
    pub fn temp_files(&self) -> Vec<String> {
        list_dir(self.temp.path())
    }
}
