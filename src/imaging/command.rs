//! External tool invocation.
//!
//! The [`CommandRunner`] trait is the only place the crate touches a child
//! process. Everything that builds ImageMagick argument vectors goes through
//! it, so tests can swap in a recording mock and inject failures.
//!
//! Arguments are handed to the child as a real argv (no shell), so a path or
//! color expression with spaces or `;` stays a single literal argument.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::Command;

/// A request to run one executable with an ordered argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// The last argument, which every ImageMagick call here uses as its output.
    pub fn output_arg(&self) -> Option<&str> {
        self.args.last().map(String::as_str)
    }
}

/// Shell-style rendering, for logs only.
impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", quote(&self.program.to_string_lossy()))?;
        for arg in &self.args {
            write!(f, " {}", quote(arg))?;
        }
        Ok(())
    }
}

fn quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:+%=,@".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// What came back from a finished child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Exit code; `None` when the child was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl Outcome {
    pub fn success() -> Self {
        Self::with_code(0)
    }

    pub fn with_code(code: i32) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs external commands to completion.
///
/// `Err` means the process could not be started at all; a process that ran
/// and failed is an `Ok` outcome with a non-zero code.
pub trait CommandRunner {
    fn run(&self, invocation: &Invocation) -> io::Result<Outcome>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, invocation: &Invocation) -> io::Result<Outcome> {
        (**self).run(invocation)
    }
}

/// Production runner backed by [`std::process::Command`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> io::Result<Outcome> {
        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .output()?;
        Ok(Outcome {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::path::Path;
    use std::sync::Mutex;

    /// Scripted reaction to one invocation.
    #[derive(Debug, Clone, PartialEq)]
    pub enum MockResponse {
        /// Write a PNG of this size to the output argument and exit 0.
        Image { width: u32, height: u32 },
        /// Exit 0 without touching the output.
        Succeed,
        /// Exit with this non-zero code.
        Fail(i32),
        /// Refuse to start the process.
        SpawnError,
    }

    /// Mock runner that records invocations and plays back scripted responses.
    ///
    /// When the script runs dry, every call answers with `fallback`.
    /// Uses Mutex (not RefCell) so it is Sync like the real runner.
    pub struct MockRunner {
        pub script: Mutex<VecDeque<MockResponse>>,
        pub fallback: MockResponse,
        pub invocations: Mutex<Vec<Invocation>>,
    }

    impl Default for MockRunner {
        fn default() -> Self {
            Self::new(Vec::new())
        }
    }

    impl MockRunner {
        pub fn new(script: Vec<MockResponse>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                fallback: MockResponse::Succeed,
                invocations: Mutex::new(Vec::new()),
            }
        }

        pub fn with_fallback(mut self, fallback: MockResponse) -> Self {
            self.fallback = fallback;
            self
        }

        pub fn get_invocations(&self) -> Vec<Invocation> {
            self.invocations.lock().unwrap().clone()
        }

        /// Program file names (`convert`, `composite`) in call order.
        pub fn programs(&self) -> Vec<String> {
            self.get_invocations()
                .iter()
                .map(|inv| {
                    inv.program
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_default()
                })
                .collect()
        }
    }

    /// Strip an ImageMagick `FORMAT:` prefix from an output argument.
    pub fn output_path(arg: &str) -> &Path {
        match arg.split_once(':') {
            Some((prefix, rest))
                if !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_alphanumeric()) =>
            {
                Path::new(rest)
            }
            _ => Path::new(arg),
        }
    }

    impl CommandRunner for MockRunner {
        fn run(&self, invocation: &Invocation) -> io::Result<Outcome> {
            self.invocations.lock().unwrap().push(invocation.clone());

            let response = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.fallback.clone());

            match response {
                MockResponse::Image { width, height } => {
                    if let Some(out) = invocation.output_arg() {
                        image::RgbaImage::new(width, height)
                            .save_with_format(output_path(out), image::ImageFormat::Png)
                            .map_err(io::Error::other)?;
                    }
                    Ok(Outcome::success())
                }
                MockResponse::Succeed => Ok(Outcome::success()),
                MockResponse::Fail(code) => Ok(Outcome::with_code(code)),
                MockResponse::SpawnError => Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    "mock: no such executable",
                )),
            }
        }
    }

    #[test]
    fn invocation_builder_keeps_argument_order() {
        let inv = Invocation::new("/usr/bin/convert")
            .arg("in.png")
            .args(["-flip", "-quality", "100"])
            .arg("out.png");

        assert_eq!(inv.args, vec!["in.png", "-flip", "-quality", "100", "out.png"]);
        assert_eq!(inv.output_arg(), Some("out.png"));
    }

    #[test]
    fn display_quotes_shell_metacharacters() {
        let inv = Invocation::new("/usr/bin/convert")
            .arg("/tmp/my photo.png")
            .arg("-background")
            .arg("rgba(1, 2, 3, 0.5)")
            .arg("x'; rm -rf /");

        assert_eq!(
            inv.to_string(),
            r"/usr/bin/convert '/tmp/my photo.png' -background 'rgba(1, 2, 3, 0.5)' 'x'\''; rm -rf /'"
        );
    }

    #[test]
    fn display_leaves_plain_arguments_bare() {
        let inv = Invocation::new("convert").args(["a.png", "-crop", "50x50+0+0", "PNG:/tmp/x"]);
        assert_eq!(inv.to_string(), "convert a.png -crop 50x50+0+0 PNG:/tmp/x");
    }

    #[test]
    fn outcome_success_requires_zero_code() {
        assert!(Outcome::success().is_success());
        assert!(!Outcome::with_code(1).is_success());
        let killed = Outcome {
            code: None,
            stdout: String::new(),
            stderr: String::new(),
        };
        assert!(!killed.is_success());
    }

    #[test]
    fn output_path_strips_format_prefix() {
        assert_eq!(output_path("PNG:/tmp/a"), Path::new("/tmp/a"));
        assert_eq!(output_path("/tmp/a"), Path::new("/tmp/a"));
    }

    #[test]
    fn mock_records_and_plays_script() {
        let runner = MockRunner::new(vec![MockResponse::Fail(1)]);
        let inv = Invocation::new("/bin/convert").arg("x");

        assert_eq!(runner.run(&inv).unwrap().code, Some(1));
        assert!(runner.run(&inv).unwrap().is_success());
        assert_eq!(runner.get_invocations().len(), 2);
        assert_eq!(runner.programs(), vec!["convert", "convert"]);
    }

    #[test]
    fn mock_writes_png_of_requested_size() {
        let tmp = tempfile::TempDir::new().unwrap();
        let out = tmp.path().join("out");
        let runner = MockRunner::new(vec![MockResponse::Image {
            width: 7,
            height: 3,
        }]);

        runner
            .run(&Invocation::new("convert").arg(format!("PNG:{}", out.display())))
            .unwrap();

        let dims = image::ImageReader::open(&out)
            .unwrap()
            .with_guessed_format()
            .unwrap()
            .into_dimensions()
            .unwrap();
        assert_eq!(dims, (7, 3));
    }

    #[test]
    fn system_runner_reports_spawn_failure() {
        let result = SystemRunner.run(&Invocation::new("/definitely/not/here/convert"));
        assert!(result.is_err());
    }
}
