//! The ImageMagick install a session talks to.
//!
//! [`Magick`] carries everything a session needs from configuration: where
//! the executables live, which [`CommandRunner`] launches them, where temp
//! files go, and the quality used for intermediate files. It is built once
//! and shared between sessions behind an `Arc`.
//!
//! Two pieces of process-wide state are memoized:
//!
//! - the executable suffix (`.exe` on Windows, nothing elsewhere), since the
//!   host platform cannot change while the process runs;
//! - which install directories have already passed the availability check,
//!   so building a second context for the same install does not spawn again.

use super::command::{CommandRunner, Invocation, Outcome, SystemRunner};
use super::params::Quality;
use super::SessionError;
use crate::config::{ConfigError, MagickConfig};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex};
use tempfile::{Builder, TempPath};

static EXE_SUFFIX: LazyLock<&'static str> =
    LazyLock::new(|| if cfg!(windows) { ".exe" } else { "" });

static CHECKED_DIRS: LazyLock<Mutex<HashSet<PathBuf>>> =
    LazyLock::new(|| Mutex::new(HashSet::new()));

/// Sub-tool used by most operations.
pub const CONVERT: &str = "convert";
/// Sub-tool used by watermarking.
pub const COMPOSITE: &str = "composite";

/// Join an install directory and a sub-tool name, adding the platform suffix.
pub fn resolve_command(tool_dir: &Path, name: &str) -> PathBuf {
    tool_dir.join(format!("{name}{}", *EXE_SUFFIX))
}

/// Shared handle to one ImageMagick install.
pub struct Magick<R: CommandRunner = SystemRunner> {
    tool_dir: PathBuf,
    temp_dir: PathBuf,
    working_quality: Quality,
    runner: R,
}

impl Magick<SystemRunner> {
    /// Build a context that spawns real processes.
    pub fn new(config: &MagickConfig) -> Result<Self, ConfigError> {
        Self::with_runner(config, SystemRunner)
    }
}

impl<R: CommandRunner> Magick<R> {
    /// Build a context around a custom runner.
    ///
    /// Fails if the configured directory does not exist, or if the install
    /// has never been checked in this process and `convert` cannot be
    /// started. Nothing is written to the temp directory either way.
    pub fn with_runner(config: &MagickConfig, runner: R) -> Result<Self, ConfigError> {
        config.validate()?;
        if !config.tool_dir.is_dir() {
            return Err(ConfigError::ToolDirMissing(config.tool_dir.clone()));
        }

        let magick = Self {
            tool_dir: config.tool_dir.clone(),
            temp_dir: config.temp_dir(),
            working_quality: Quality::new(config.working_quality),
            runner,
        };
        magick.ensure_available()?;
        Ok(magick)
    }

    /// Run the install check once per directory per process.
    ///
    /// `convert` with no arguments prints its usage and exits non-zero, so
    /// only a failure to start the process counts against the install.
    fn ensure_available(&self) -> Result<(), ConfigError> {
        let mut checked = CHECKED_DIRS.lock().unwrap_or_else(|e| e.into_inner());
        if checked.contains(&self.tool_dir) {
            return Ok(());
        }

        let program = self.command(CONVERT);
        self.runner
            .run(&Invocation::new(&program))
            .map_err(|source| ConfigError::ToolUnavailable {
                program: program.clone(),
                source,
            })?;

        info!("ImageMagick found at {}", self.tool_dir.display());
        checked.insert(self.tool_dir.clone());
        Ok(())
    }

    /// Full path of a sub-tool inside the install directory.
    pub fn command(&self, name: &str) -> PathBuf {
        resolve_command(&self.tool_dir, name)
    }

    pub fn tool_dir(&self) -> &Path {
        &self.tool_dir
    }

    pub fn working_quality(&self) -> Quality {
        self.working_quality
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Reserve a fresh, empty file in the temp directory.
    ///
    /// The returned path deletes its file when dropped.
    pub fn temp_file(&self) -> Result<TempPath, SessionError> {
        let file = Builder::new()
            .prefix("magick-")
            .tempfile_in(&self.temp_dir)?;
        Ok(file.into_temp_path())
    }

    /// Run a sub-tool with `args` and report whether it exited cleanly.
    ///
    /// A process that cannot be started is an error; one that runs and
    /// fails is `Ok(false)`.
    pub fn invoke<I, S>(&self, name: &str, args: I) -> Result<bool, SessionError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let invocation = Invocation::new(self.command(name)).args(args);
        Ok(self.execute(&invocation)?.is_success())
    }

    fn execute(&self, invocation: &Invocation) -> Result<Outcome, SessionError> {
        debug!("{invocation}");
        let outcome = self
            .runner
            .run(invocation)
            .map_err(|source| SessionError::Spawn {
                program: invocation.program.clone(),
                source,
            })?;
        if !outcome.is_success() {
            warn!(
                "{} exited with {:?}: {}",
                invocation.program.display(),
                outcome.code,
                outcome.stderr.trim()
            );
        }
        Ok(outcome)
    }
}
