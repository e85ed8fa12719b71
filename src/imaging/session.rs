//! One open image and its chain of temp files.
//!
//! An [`ImageSession`] always knows which file holds the image right now:
//! the untouched original until the first successful edit, then the newest
//! temp file. Every edit runs the same four steps:
//!
//! 1. read from [`current_path`](ImageSession::current_path);
//! 2. reserve a fresh temp file for the output;
//! 3. run ImageMagick from the current file into the reserved one;
//! 4. on a clean exit, refresh metadata from the output if the edit can
//!    change it, then make the output current. The previous temp file is
//!    deleted by that swap.
//!
//! A non-zero exit returns `Ok(false)` before step 4, so nothing about the
//! session changes and the unused output is deleted. The original file is
//! only ever read.
//!
//! Temp files are [`TempPath`]s, so a dropped session (or an error unwinding
//! through one) removes whatever it still owns.

use super::calculations::{
    background_color, crop_geometry, format_prefixed, offset_geometry, opacity_to_level,
    reflection_gradient, reflection_strip, sharpen_sigma, size_geometry,
};
use super::command::{CommandRunner, SystemRunner};
use super::params::{Background, FlipDirection, Opacity, Quality};
use super::probe::{ImageInfo, format_name, probe};
use super::tool::{COMPOSITE, CONVERT, Magick};
use super::SessionError;
use image::ImageFormat;
use log::{debug, warn};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempPath;

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

/// Output format for edits that may introduce transparency.
const ALPHA_FORMAT: &str = "PNG";

/// Which metadata an edit must refresh before it is committed.
enum Refresh {
    /// Encoding and size are unchanged.
    Keep,
    /// Size is known without looking.
    Size(u32, u32),
    /// Size may change; read it back from the output.
    Dimensions,
    /// Size and encoding may change.
    All,
}

pub struct ImageSession<R: CommandRunner = SystemRunner> {
    magick: Arc<Magick<R>>,
    original: PathBuf,
    current: Option<TempPath>,
    width: u32,
    height: u32,
    format: ImageFormat,
    mime: &'static str,
}

impl<R: CommandRunner> ImageSession<R> {
    /// Open a session on an existing image file.
    ///
    /// The file is probed immediately; a missing or unreadable image fails
    /// here rather than on the first edit.
    pub fn open(magick: Arc<Magick<R>>, path: impl AsRef<Path>) -> Result<Self> {
        let info = probe(path.as_ref())?;
        debug!(
            "opened {} ({}x{} {})",
            info.file.display(),
            info.width,
            info.height,
            info.mime
        );
        Ok(Self {
            magick,
            original: info.file,
            current: None,
            width: info.width,
            height: info.height,
            format: info.format,
            mime: info.mime,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn mime(&self) -> &'static str {
        self.mime
    }

    /// The install this session runs against.
    pub fn magick(&self) -> &Arc<Magick<R>> {
        &self.magick
    }

    /// The file this session was opened on.
    pub fn original_path(&self) -> &Path {
        &self.original
    }

    /// The file holding the image right now: the newest temp file, or the
    /// original when nothing has been edited yet.
    pub fn current_path(&self) -> &Path {
        self.current.as_deref().unwrap_or(self.original.as_path())
    }

    /// The temp file this session owns, if any.
    pub fn temp_path(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    /// Snapshot of the cached metadata.
    pub fn info(&self) -> ImageInfo {
        ImageInfo {
            file: self.current_path().to_path_buf(),
            width: self.width,
            height: self.height,
            format: self.format,
            mime: self.mime,
        }
    }

    /// End the session, deleting its temp file and reporting any error
    /// from doing so. Dropping the session also deletes it, silently.
    pub fn close(mut self) -> std::io::Result<()> {
        match self.current.take() {
            Some(path) => path.close(),
            None => Ok(()),
        }
    }

    // =========================================================================
    // Plumbing
    // =========================================================================

    fn quality_args(&self) -> [String; 2] {
        ["-quality".into(), self.magick.working_quality().value().to_string()]
    }

    /// Run `convert <current> <args…> <output>` and commit on success.
    fn transform(
        &mut self,
        args: Vec<String>,
        output_format: Option<&str>,
        refresh: Refresh,
    ) -> Result<bool> {
        let output = self.magick.temp_file()?;
        let target = match output_format {
            Some(format) => format_prefixed(format, &output),
            None => output.display().to_string(),
        };

        let mut argv = vec![self.current_path().display().to_string()];
        argv.extend(self.quality_args());
        argv.extend(args);
        argv.push(target);

        if !self.magick.invoke(CONVERT, argv)? {
            return Ok(false);
        }
        self.commit(output, refresh)?;
        Ok(true)
    }

    /// Make `output` current. Metadata is read before anything is swapped,
    /// so an unreadable output leaves the session as it was.
    fn commit(&mut self, output: TempPath, refresh: Refresh) -> Result<()> {
        match refresh {
            Refresh::Keep => {}
            Refresh::Size(width, height) => {
                self.width = width;
                self.height = height;
            }
            Refresh::Dimensions => {
                let info = probe(&output)?;
                self.width = info.width;
                self.height = info.height;
            }
            Refresh::All => {
                let info = probe(&output)?;
                self.width = info.width;
                self.height = info.height;
                self.format = info.format;
                self.mime = info.mime;
            }
        }
        // Replacing the old TempPath deletes its file.
        self.current = Some(output);
        Ok(())
    }

    // =========================================================================
    // Edits
    // =========================================================================

    /// Force the image to exactly `width`×`height`, ignoring aspect ratio.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<bool> {
        let geometry = format!("{}!", size_geometry(width, height));
        self.transform(
            vec!["-resize".into(), geometry],
            None,
            Refresh::Size(width, height),
        )
    }

    /// Cut a `width`×`height` region at the given offset.
    ///
    /// Offsets pass through to ImageMagick with their sign.
    pub fn crop(&mut self, width: u32, height: u32, offset_x: i64, offset_y: i64) -> Result<bool> {
        let geometry = crop_geometry(width, height, offset_x, offset_y);
        self.transform(
            vec!["-crop".into(), geometry, "+repage".into()],
            None,
            Refresh::Dimensions,
        )
    }

    /// Rotate by `degrees`, filling the exposed corners with transparency.
    ///
    /// The result is always re-encoded as PNG.
    pub fn rotate(&mut self, degrees: f64) -> Result<bool> {
        self.transform(
            vec![
                "-alpha".into(),
                "set".into(),
                "-background".into(),
                "none".into(),
                "-rotate".into(),
                degrees.to_string(),
            ],
            Some(ALPHA_FORMAT),
            Refresh::All,
        )
    }

    /// Mirror the image.
    pub fn flip(&mut self, direction: FlipDirection) -> Result<bool> {
        self.transform(vec![direction.switch().into()], None, Refresh::Keep)
    }

    /// Sharpen by `amount` on a 0-100 scale.
    pub fn sharpen(&mut self, amount: u32) -> Result<bool> {
        let sigma = sharpen_sigma(amount);
        self.transform(
            vec!["-sharpen".into(), format!("0x{sigma}")],
            None,
            Refresh::Dimensions,
        )
    }

    /// Flatten transparency onto a solid background.
    ///
    /// The result is always re-encoded as PNG.
    pub fn background(&mut self, bg: Background) -> Result<bool> {
        self.transform(
            vec![
                "-background".into(),
                background_color(&bg),
                "-flatten".into(),
            ],
            Some(ALPHA_FORMAT),
            Refresh::All,
        )
    }

    /// Append a mirrored, faded copy of the bottom `height` rows underneath
    /// the image. The result is PNG.
    ///
    /// The reflection strip is built in a scratch session opened on the
    /// current file. Every intermediate file is deleted before this returns,
    /// whichever step fails.
    pub fn reflection(&mut self, height: u32, opacity: Opacity, fade_in: bool) -> Result<bool> {
        let level = opacity_to_level(opacity);
        let (strip_height, offset_y) = reflection_strip(self.height, height);
        let quality = self.quality_args();

        let mut strip = ImageSession::open(Arc::clone(&self.magick), self.current_path())?;
        if !strip.crop(strip.width, strip_height, 0, i64::from(offset_y))? {
            return Ok(false);
        }
        if !strip.flip(FlipDirection::Vertical)? {
            return Ok(false);
        }

        let mask = self.magick.temp_file()?;
        let mut argv: Vec<String> = quality.to_vec();
        argv.extend([
            "-size".into(),
            size_geometry(self.width, strip_height),
            format!("gradient:{}", reflection_gradient(level, fade_in)),
            format_prefixed(ALPHA_FORMAT, &mask),
        ]);
        if !self.magick.invoke(CONVERT, argv)? {
            return Ok(false);
        }

        let faded = self.magick.temp_file()?;
        let mut argv = vec![
            strip.current_path().display().to_string(),
            mask.display().to_string(),
        ];
        argv.extend(quality.clone());
        argv.extend([
            "-alpha".into(),
            "Off".into(),
            "-compose".into(),
            "CopyOpacity".into(),
            "-composite".into(),
            format_prefixed(ALPHA_FORMAT, &faded),
        ]);
        if !self.magick.invoke(CONVERT, argv)? {
            return Ok(false);
        }

        let output = self.magick.temp_file()?;
        let mut argv = vec![
            self.current_path().display().to_string(),
            faded.display().to_string(),
        ];
        argv.extend(quality);
        argv.extend(["-append".into(), format_prefixed(ALPHA_FORMAT, &output)]);
        if !self.magick.invoke(CONVERT, argv)? {
            return Ok(false);
        }

        drop(strip);
        self.commit(output, Refresh::All)?;
        Ok(true)
    }

    /// Blend `overlay` onto the image at the given offset.
    ///
    /// `opacity` is the dissolve percentage. The canvas size does not
    /// change; the result is PNG. Failing to render or stage the overlay is an ordinary
    /// failure, not an error.
    pub fn watermark<O: CommandRunner>(
        &mut self,
        overlay: &ImageSession<O>,
        offset_x: i64,
        offset_y: i64,
        opacity: Opacity,
    ) -> Result<bool> {
        let bytes = match overlay.render(format_name(overlay.format()), None)? {
            Some(bytes) => bytes,
            None => return Ok(false),
        };

        let staged = self.magick.temp_file()?;
        if let Err(e) = stage(&staged, &bytes) {
            warn!("could not stage watermark at {}: {e}", staged.display());
            return Ok(false);
        }

        let output = self.magick.temp_file()?;
        let mut argv: Vec<String> = self.quality_args().to_vec();
        argv.extend([
            "-dissolve".into(),
            format!("{}%", opacity.percent()),
            "-geometry".into(),
            offset_geometry(offset_x, offset_y),
            staged.display().to_string(),
            self.current_path().display().to_string(),
            format_prefixed(ALPHA_FORMAT, &output),
        ]);
        if !self.magick.invoke(COMPOSITE, argv)? {
            return Ok(false);
        }

        self.commit(output, Refresh::All)?;
        Ok(true)
    }

    /// Write the current image to `destination`.
    ///
    /// The session keeps pointing at its own file; `destination` is not
    /// tracked or cleaned up.
    pub fn save(&self, destination: impl AsRef<Path>, quality: Option<Quality>) -> Result<bool> {
        let mut argv = vec![self.current_path().display().to_string()];
        if let Some(q) = quality {
            argv.extend(["-quality".into(), q.value().to_string()]);
        }
        argv.push(destination.as_ref().display().to_string());
        self.magick.invoke(CONVERT, argv)
    }

    /// Encode the current image as `format` (e.g. `"png"`, `"JPEG"`) and
    /// return the bytes.
    ///
    /// The scratch file is deleted before this returns.
    pub fn render(&self, format: &str, quality: Option<Quality>) -> Result<Option<Vec<u8>>> {
        let scratch = self.magick.temp_file()?;
        let mut argv = vec![self.current_path().display().to_string()];
        if let Some(q) = quality {
            argv.extend(["-quality".into(), q.value().to_string()]);
        }
        argv.push(format_prefixed(format, &scratch));

        if !self.magick.invoke(CONVERT, argv)? {
            return Ok(None);
        }
        let bytes = std::fs::read(&scratch)?;
        Ok(Some(bytes))
    }
}

/// Write overlay bytes to disk. Zero bytes is a failure.
fn stage(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if bytes.is_empty() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::WriteZero,
            "overlay rendered to zero bytes",
        ));
    }
    let mut file = std::fs::File::create(path)?;
    file.write_all(bytes)?;
    file.flush()
}
