//! Pure calculation functions for operation arguments.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::{Background, Opacity};

/// Smallest sharpen amount ImageMagick responds to (0.15 sigma).
pub const MIN_SHARPEN_AMOUNT: u32 = 5;

/// Map an opacity percentage to an 8-bit gray level.
///
/// ```text
/// 0% → 0, 50% → 128, 100% → 255
/// ```
pub fn opacity_to_level(opacity: Opacity) -> u8 {
    (opacity.percent() as f64 * 255.0 / 100.0).abs().round() as u8
}

/// Convert a 0-100 sharpen amount to the sigma of `-sharpen 0x{sigma}`.
///
/// Amounts below [`MIN_SHARPEN_AMOUNT`] are raised to it, then the result is
/// rescaled onto 0.0-3.0.
pub fn sharpen_sigma(amount: u32) -> f64 {
    let amount = amount.max(MIN_SHARPEN_AMOUNT);
    amount as f64 * 3.0 / 100.0
}

/// `rgba(r, g, b, a)` color expression with the opacity mapped onto 0.0-1.0.
pub fn background_color(bg: &Background) -> String {
    let alpha = bg.opacity.percent() as f64 / 100.0;
    format!("rgba({}, {}, {}, {})", bg.r, bg.g, bg.b, alpha)
}

/// Gradient expression for the reflection alpha mask.
///
/// Fading in runs black → level; otherwise level → black.
pub fn reflection_gradient(level: u8, fade_in: bool) -> String {
    let black = "rgb(0,0,0)";
    let gray = format!("rgb({level},{level},{level})");
    if fade_in {
        format!("{black}-{gray}")
    } else {
        format!("{gray}-{black}")
    }
}

/// Strip height and top offset for a reflection anchored to the bottom edge.
///
/// A reflection taller than the image is clamped to the image height.
pub fn reflection_strip(image_height: u32, reflection_height: u32) -> (u32, u32) {
    let height = reflection_height.min(image_height);
    (height, image_height - height)
}

/// `WxH` size string.
pub fn size_geometry(width: u32, height: u32) -> String {
    format!("{width}x{height}")
}

/// `WxH{+-}X{+-}Y` crop geometry. Offsets keep their sign.
pub fn crop_geometry(width: u32, height: u32, offset_x: i64, offset_y: i64) -> String {
    format!("{width}x{height}{offset_x:+}{offset_y:+}")
}

/// `{+-}X{+-}Y` placement geometry.
pub fn offset_geometry(offset_x: i64, offset_y: i64) -> String {
    format!("{offset_x:+}{offset_y:+}")
}

/// Prefix an output path with an explicit ImageMagick format, e.g. `PNG:/tmp/x`.
pub fn format_prefixed(format: &str, path: &std::path::Path) -> String {
    format!("{}:{}", format.to_ascii_uppercase(), path.display())
}
