//! Parameter types for session operations.
//!
//! These describe *what* an edit asks for; [`calculations`](super::calculations)
//! turns them into the numbers ImageMagick expects and the
//! [`session`](super::session) builds the argument vectors.
//!
//! - [`Quality`]: Encoding quality (1–100). Clamped on construction.
//! - [`Opacity`]: Percentage 0–100 used by reflection, watermark, and background.
//! - [`FlipDirection`]: Mirror axis for `flip`.
//! - [`Background`]: RGB color plus opacity for `background`.

use std::fmt;
use std::str::FromStr;

/// Quality setting for encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(100)
    }
}

/// Opacity as a percentage. Clamped to 0-100 on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opacity(u8);

impl Opacity {
    pub const OPAQUE: Opacity = Opacity(100);

    pub fn new(percent: u32) -> Self {
        Self(percent.min(100) as u8)
    }

    pub fn percent(self) -> u32 {
        self.0 as u32
    }
}

/// Axis to mirror across.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipDirection {
    /// Mirror left-right.
    Horizontal,
    /// Mirror top-bottom.
    Vertical,
}

impl FlipDirection {
    /// The `convert` switch for this direction.
    pub fn switch(self) -> &'static str {
        match self {
            FlipDirection::Horizontal => "-flop",
            FlipDirection::Vertical => "-flip",
        }
    }
}

impl FromStr for FlipDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "horizontal" | "h" => Ok(FlipDirection::Horizontal),
            "vertical" | "v" => Ok(FlipDirection::Vertical),
            other => Err(format!("unknown flip direction '{other}'")),
        }
    }
}

impl fmt::Display for FlipDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlipDirection::Horizontal => f.write_str("horizontal"),
            FlipDirection::Vertical => f.write_str("vertical"),
        }
    }
}

/// Flatten color for `background`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Background {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub opacity: Opacity,
}

impl Background {
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            r,
            g,
            b,
            opacity: Opacity::OPAQUE,
        }
    }

    pub fn with_opacity(self, opacity: Opacity) -> Self {
        Self { opacity, ..self }
    }
}
