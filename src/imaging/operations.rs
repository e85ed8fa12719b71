//! Edits written as short strings, applied to a session in order.
//!
//! Each operation is `name:arguments`:
//!
//! ```text
//! resize:800x600                 exact size, aspect ratio ignored
//! crop:50x50+10+0                size plus signed offsets (offsets optional)
//! rotate:-12.5                   degrees
//! flip:horizontal                horizontal | vertical (h | v)
//! sharpen:20                     0-100
//! background:255,255,255[,50]    r,g,b[,opacity]
//! reflection:40[,60[,in]]        height[,opacity[,in|out]]
//! watermark:10,5,40,logo.png     x,y,opacity,overlay path
//! ```
//!
//! Parsing is pure; [`EditOp::apply`] hands the parsed values to the
//! matching [`ImageSession`] method.

use super::command::CommandRunner;
use super::params::{Background, FlipDirection, Opacity};
use super::session::{ImageSession, Result};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
#[error("invalid edit '{input}': {reason}")]
pub struct ParseOpError {
    pub input: String,
    pub reason: String,
}

/// One parsed edit.
#[derive(Debug, Clone, PartialEq)]
pub enum EditOp {
    Resize {
        width: u32,
        height: u32,
    },
    Crop {
        width: u32,
        height: u32,
        offset_x: i64,
        offset_y: i64,
    },
    Rotate(f64),
    Flip(FlipDirection),
    Sharpen(u32),
    Background(Background),
    Reflection {
        height: u32,
        opacity: Opacity,
        fade_in: bool,
    },
    Watermark {
        overlay: PathBuf,
        offset_x: i64,
        offset_y: i64,
        opacity: Opacity,
    },
}

impl EditOp {
    /// Run this edit against `session`.
    ///
    /// A watermark overlay is opened as its own session on the same install
    /// and closed before this returns.
    pub fn apply<R: CommandRunner>(&self, session: &mut ImageSession<R>) -> Result<bool> {
        match self {
            EditOp::Resize { width, height } => session.resize(*width, *height),
            EditOp::Crop {
                width,
                height,
                offset_x,
                offset_y,
            } => session.crop(*width, *height, *offset_x, *offset_y),
            EditOp::Rotate(degrees) => session.rotate(*degrees),
            EditOp::Flip(direction) => session.flip(*direction),
            EditOp::Sharpen(amount) => session.sharpen(*amount),
            EditOp::Background(bg) => session.background(*bg),
            EditOp::Reflection {
                height,
                opacity,
                fade_in,
            } => session.reflection(*height, *opacity, *fade_in),
            EditOp::Watermark {
                overlay,
                offset_x,
                offset_y,
                opacity,
            } => {
                let overlay = ImageSession::open(Arc::clone(session.magick()), overlay)?;
                session.watermark(&overlay, *offset_x, *offset_y, *opacity)
            }
        }
    }
}

/// Apply `ops` in order, stopping at the first edit that fails.
///
/// Returns the index of the failed edit, or `None` when all succeeded.
pub fn apply_all<R: CommandRunner>(
    session: &mut ImageSession<R>,
    ops: &[EditOp],
) -> Result<Option<usize>> {
    for (index, op) in ops.iter().enumerate() {
        if !op.apply(session)? {
            return Ok(Some(index));
        }
    }
    Ok(None)
}

impl fmt::Display for EditOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditOp::Resize { width, height } => write!(f, "resize:{width}x{height}"),
            EditOp::Crop {
                width,
                height,
                offset_x,
                offset_y,
            } => write!(f, "crop:{width}x{height}{offset_x:+}{offset_y:+}"),
            EditOp::Rotate(degrees) => write!(f, "rotate:{degrees}"),
            EditOp::Flip(direction) => write!(f, "flip:{direction}"),
            EditOp::Sharpen(amount) => write!(f, "sharpen:{amount}"),
            EditOp::Background(bg) => write!(
                f,
                "background:{},{},{},{}",
                bg.r,
                bg.g,
                bg.b,
                bg.opacity.percent()
            ),
            EditOp::Reflection {
                height,
                opacity,
                fade_in,
            } => write!(
                f,
                "reflection:{height},{},{}",
                opacity.percent(),
                if *fade_in { "in" } else { "out" }
            ),
            EditOp::Watermark {
                overlay,
                offset_x,
                offset_y,
                opacity,
            } => write!(
                f,
                "watermark:{offset_x},{offset_y},{},{}",
                opacity.percent(),
                overlay.display()
            ),
        }
    }
}

impl FromStr for EditOp {
    type Err = ParseOpError;

    fn from_str(input: &str) -> std::result::Result<Self, Self::Err> {
        let fail = |reason: &str| ParseOpError {
            input: input.to_string(),
            reason: reason.to_string(),
        };
        let (name, args) = input
            .split_once(':')
            .ok_or_else(|| fail("expected name:arguments"))?;

        match name.to_ascii_lowercase().as_str() {
            "resize" => {
                let (width, height) = parse_size(args).ok_or_else(|| fail("expected WxH"))?;
                Ok(EditOp::Resize { width, height })
            }
            "crop" => {
                let (size, offsets) = match args.find(['+', '-']) {
                    Some(pos) => args.split_at(pos),
                    None => (args, ""),
                };
                let (width, height) = parse_size(size).ok_or_else(|| fail("expected WxH"))?;
                let (offset_x, offset_y) =
                    parse_offsets(offsets).ok_or_else(|| fail("expected +X+Y offsets"))?;
                Ok(EditOp::Crop {
                    width,
                    height,
                    offset_x,
                    offset_y,
                })
            }
            "rotate" => args
                .parse()
                .map(EditOp::Rotate)
                .map_err(|_| fail("expected degrees")),
            "flip" => args
                .parse()
                .map(EditOp::Flip)
                .map_err(|e: String| fail(&e)),
            "sharpen" => args
                .parse()
                .map(EditOp::Sharpen)
                .map_err(|_| fail("expected amount 0-100")),
            "background" => {
                let parts: Vec<&str> = args.split(',').map(str::trim).collect();
                let channel = |s: &str| s.parse::<u8>().map_err(|_| fail("expected r,g,b 0-255"));
                let (rgb, opacity) = match *parts.as_slice() {
                    [r, g, b] => ([r, g, b], None),
                    [r, g, b, opacity] => ([r, g, b], Some(opacity)),
                    _ => return Err(fail("expected r,g,b[,opacity]")),
                };
                let mut bg = Background::rgb(channel(rgb[0])?, channel(rgb[1])?, channel(rgb[2])?);
                if let Some(opacity) = opacity {
                    bg = bg.with_opacity(
                        parse_opacity(opacity).ok_or_else(|| fail("expected opacity 0-100"))?,
                    );
                }
                Ok(EditOp::Background(bg))
            }
            "reflection" => {
                let mut parts = args.split(',').map(str::trim);
                let height = parts
                    .next()
                    .and_then(|h| h.parse().ok())
                    .ok_or_else(|| fail("expected height"))?;
                let opacity = match parts.next() {
                    Some(o) => parse_opacity(o).ok_or_else(|| fail("expected opacity 0-100"))?,
                    None => Opacity::OPAQUE,
                };
                let fade_in = match parts.next() {
                    None | Some("out") => false,
                    Some("in") => true,
                    Some(_) => return Err(fail("expected fade 'in' or 'out'")),
                };
                if parts.next().is_some() {
                    return Err(fail("too many arguments"));
                }
                Ok(EditOp::Reflection {
                    height,
                    opacity,
                    fade_in,
                })
            }
            "watermark" => {
                let parts: Vec<&str> = args.splitn(4, ',').collect();
                match *parts.as_slice() {
                    [x, y, opacity, path] if !path.is_empty() => Ok(EditOp::Watermark {
                        overlay: PathBuf::from(path),
                        offset_x: x.trim().parse().map_err(|_| fail("expected x offset"))?,
                        offset_y: y.trim().parse().map_err(|_| fail("expected y offset"))?,
                        opacity: parse_opacity(opacity.trim())
                            .ok_or_else(|| fail("expected opacity 0-100"))?,
                    }),
                    _ => Err(fail("expected x,y,opacity,path")),
                }
            }
            _ => Err(fail("unknown operation")),
        }
    }
}

fn parse_size(s: &str) -> Option<(u32, u32)> {
    let (w, h) = s.split_once(['x', 'X'])?;
    Some((w.trim().parse().ok()?, h.trim().parse().ok()?))
}

/// `+X+Y`, `-X+Y`, … or empty for `+0+0`.
fn parse_offsets(s: &str) -> Option<(i64, i64)> {
    if s.is_empty() {
        return Some((0, 0));
    }
    let split = s[1..].find(['+', '-'])? + 1;
    let (x, y) = s.split_at(split);
    Some((x.parse().ok()?, y.parse().ok()?))
}

fn parse_opacity(s: &str) -> Option<Opacity> {
    let value: u32 = s.parse().ok()?;
    (value <= 100).then(|| Opacity::new(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;

    fn parse(s: &str) -> EditOp {
        s.parse().unwrap()
    }

    #[test]
    fn parse_resize() {
        assert_eq!(
            parse("resize:800x600"),
            EditOp::Resize {
                width: 800,
                height: 600
            }
        );
    }

    #[test]
    fn parse_crop_with_and_without_offsets() {
        assert_eq!(
            parse("crop:50x40+10-5"),
            EditOp::Crop {
                width: 50,
                height: 40,
                offset_x: 10,
                offset_y: -5
            }
        );
        assert_eq!(
            parse("crop:50x40"),
            EditOp::Crop {
                width: 50,
                height: 40,
                offset_x: 0,
                offset_y: 0
            }
        );
    }

    #[test]
    fn parse_rotate_flip_sharpen() {
        assert_eq!(parse("rotate:-12.5"), EditOp::Rotate(-12.5));
        assert_eq!(parse("flip:v"), EditOp::Flip(FlipDirection::Vertical));
        assert_eq!(parse("sharpen:20"), EditOp::Sharpen(20));
    }

    #[test]
    fn parse_background_with_optional_opacity() {
        assert_eq!(
            parse("background:255,0,0"),
            EditOp::Background(Background::rgb(255, 0, 0))
        );
        assert_eq!(
            parse("background:1, 2, 3, 50"),
            EditOp::Background(Background::rgb(1, 2, 3).with_opacity(Opacity::new(50)))
        );
    }

    #[test]
    fn parse_reflection_defaults() {
        assert_eq!(
            parse("reflection:40"),
            EditOp::Reflection {
                height: 40,
                opacity: Opacity::OPAQUE,
                fade_in: false
            }
        );
        assert_eq!(
            parse("reflection:40,60,in"),
            EditOp::Reflection {
                height: 40,
                opacity: Opacity::new(60),
                fade_in: true
            }
        );
    }

    #[test]
    fn parse_watermark_keeps_commas_in_path() {
        assert_eq!(
            parse("watermark:10,-5,40,marks/logo,v2.png"),
            EditOp::Watermark {
                overlay: PathBuf::from("marks/logo,v2.png"),
                offset_x: 10,
                offset_y: -5,
                opacity: Opacity::new(40)
            }
        );
    }

    #[test]
    fn parse_rejects_bad_input() {
        for bad in [
            "resize",
            "resize:800",
            "crop:50x50+1",
            "rotate:left",
            "flip:diagonal",
            "sharpen:-1",
            "background:300,0,0",
            "background:1,2",
            "reflection:40,150",
            "reflection:40,50,sideways",
            "watermark:1,2,3",
            "blur:3",
        ] {
            assert!(bad.parse::<EditOp>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn display_parses_back() {
        for text in [
            "resize:800x600",
            "crop:50x40+10-5",
            "rotate:45",
            "flip:horizontal",
            "sharpen:20",
            "background:1,2,3,50",
            "reflection:40,60,in",
            "watermark:10,5,40,logo.png",
        ] {
            assert_eq!(parse(text).to_string(), text);
        }
    }

    #[test]
    fn apply_all_runs_in_order() {
        let env = MockEnv::new(vec![
            MockResponse::Image {
                width: 50,
                height: 50,
            },
            MockResponse::Succeed,
        ]);
        let original = write_png(env.source.path(), "in.png", 100, 50);
        let mut session = env.open(&original);
        let ops = [parse("crop:50x50+0+0"), parse("flip:h")];

        assert_eq!(apply_all(&mut session, &ops).unwrap(), None);
        assert_eq!((session.width(), session.height()), (50, 50));
        let calls = env.runner().get_invocations();
        assert!(calls[1].args.contains(&"-crop".to_string()));
        assert!(calls[2].args.contains(&"-flop".to_string()));
    }

    #[test]
    fn apply_all_stops_at_first_failure() {
        let env = MockEnv::new(vec![MockResponse::Succeed, MockResponse::Fail(1)]);
        let original = write_png(env.source.path(), "in.png", 100, 50);
        let mut session = env.open(&original);
        let ops = [parse("resize:10x10"), parse("flip:v"), parse("sharpen:5")];

        assert_eq!(apply_all(&mut session, &ops).unwrap(), Some(1));
        // sharpen never ran
        assert_eq!(env.runner().get_invocations().len(), 3);
        assert_eq!((session.width(), session.height()), (10, 10));
    }

    #[test]
    fn apply_watermark_opens_overlay() {
        let env = MockEnv::new(vec![
            MockResponse::Image {
                width: 8,
                height: 8,
            },
            MockResponse::Image {
                width: 100,
                height: 50,
            },
        ]);
        let original = write_png(env.source.path(), "in.png", 100, 50);
        let mark = write_png(env.source.path(), "mark.png", 8, 8);
        let mut session = env.open(&original);
        let op = EditOp::Watermark {
            overlay: mark,
            offset_x: 4,
            offset_y: 4,
            opacity: Opacity::new(30),
        };

        assert!(op.apply(&mut session).unwrap());
        assert_eq!(env.temp_files().len(), 1);
    }
}
