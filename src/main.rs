use clap::{Parser, Subcommand};
use magick_session::config::{self, MagickConfig};
use magick_session::imaging::tool::{COMPOSITE, CONVERT};
use magick_session::imaging::{EditOp, ImageSession, Magick, Quality, apply_all, probe};
use magick_session::output;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "magick-session")]
#[command(about = "Edit images through the ImageMagick command-line tools")]
#[command(long_about = "\
Edit images through the ImageMagick command-line tools

Edits are applied in order to a working copy; the input file is never
modified. The result is written only if every edit succeeded.

Edits:

  resize:800x600                 exact size, aspect ratio ignored
  crop:50x50+10+0                size plus signed offsets
  rotate:-12.5                   degrees (output becomes PNG)
  flip:horizontal                horizontal | vertical
  sharpen:20                     0-100
  background:255,255,255[,50]    flatten onto r,g,b[,opacity]
  reflection:40[,60[,in]]        height[,opacity[,in|out]]
  watermark:10,5,40,logo.png     x,y,opacity,overlay

Example:

  magick-session edit photo.jpg out.png crop:600x400+0+0 rotate:90 sharpen:20

Run 'magick-session gen-config' to generate a documented magick.toml.")]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(long, default_value = config::CONFIG_FILENAME, global = true)]
    config: PathBuf,

    /// Directory holding the ImageMagick executables (overrides config)
    #[arg(long, global = true)]
    tool_dir: Option<PathBuf>,

    /// Log every tool invocation
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply edits to an image and save the result
    Edit {
        /// Source image
        input: PathBuf,
        /// Destination; the extension selects the output format
        destination: PathBuf,
        /// Edits, applied left to right
        #[arg(required = true)]
        ops: Vec<EditOp>,
        /// Quality for the saved file (1-100)
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=100))]
        quality: Option<u32>,
    },
    /// Print size and format of an image
    Identify {
        file: PathBuf,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Verify the ImageMagick install can be started
    Check,
    /// Print a stock magick.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Command::Edit {
            input,
            destination,
            ops,
            quality,
        } => {
            let magick = Arc::new(Magick::new(&load_config(&cli.config, cli.tool_dir)?)?);
            let mut session = ImageSession::open(magick, &input)?;
            let failed = apply_all(&mut session, &ops)?;
            output::print_edit_report(&ops, failed);
            if let Some(index) = failed {
                let op = &ops[index];
                return Err(format!("edit {} ({op}) failed, nothing saved", index + 1).into());
            }
            if !session.save(&destination, quality.map(Quality::new))? {
                return Err(format!("could not write {}", destination.display()).into());
            }
            output::print_info(&destination, &output::saved_info(&destination, session.info()));
            session.close()?;
        }
        Command::Identify { file, json } => {
            let info = probe(&file)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                output::print_info(&file, &info);
            }
        }
        Command::Check => {
            let magick = Magick::new(&load_config(&cli.config, cli.tool_dir)?)?;
            output::print_check(
                magick.tool_dir(),
                &magick.command(CONVERT),
                &magick.command(COMPOSITE),
            );
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load the config file (absent is fine) and apply command-line overrides.
fn load_config(
    file: &Path,
    tool_dir: Option<PathBuf>,
) -> Result<MagickConfig, config::ConfigError> {
    let mut config = config::load_config_file(file)?;
    if let Some(dir) = tool_dir {
        config.tool_dir = dir;
    }
    Ok(config)
}
