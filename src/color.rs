//! Color samples and their wire representation

use palette::{FromColor, Hsv, Srgb};
use thiserror::Error;

/// 8-bit sRGB color, as shown on the strip
pub type Color = Srgb<u8>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ColorError {
    #[error("invalid hex color: {0:?}")]
    InvalidHex(String),
}

/// A sample produced by a color input surface while it is being dragged
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColorSample {
    /// Position on a color wheel, hue in degrees and saturation in 0..1
    HueSaturation { hue: f32, saturation: f32 },
    Rgb(Color),
}

impl ColorSample {
    pub fn to_color(self) -> Color {
        match self {
            ColorSample::HueSaturation { hue, saturation } => from_hue_saturation(hue, saturation),
            ColorSample::Rgb(color) => color,
        }
    }
}

impl From<Color> for ColorSample {
    fn from(color: Color) -> Self {
        Self::Rgb(color)
    }
}

/// Convert a wheel position at full value to a color
///
/// Brightness is controlled separately, so the HSV value component is always 1.
pub fn from_hue_saturation(hue: f32, saturation: f32) -> Color {
    let hue = if hue.is_finite() {
        hue.rem_euclid(360.0)
    } else {
        0.0
    };
    let saturation = if saturation.is_finite() {
        saturation.clamp(0.0, 1.0)
    } else {
        0.0
    };

    let hsv: Hsv = Hsv::new(hue, saturation, 1.0);
    let rgb: Srgb<f32> = Srgb::from_color(hsv);
    rgb.into_format()
}

/// Parse `RRGGBB` or `#RRGGBB`
pub fn parse_hex(input: &str) -> Result<Color, ColorError> {
    let digits = input.trim();
    let digits = digits.strip_prefix('#').unwrap_or(digits);

    if digits.len() != 6 {
        return Err(ColorError::InvalidHex(input.to_owned()));
    }

    match hex::decode(digits).as_deref() {
        Ok([red, green, blue]) => Ok(Color::new(*red, *green, *blue)),
        _ => Err(ColorError::InvalidHex(input.to_owned())),
    }
}

/// Six uppercase hex digits, without any marker
pub fn to_hex(color: Color) -> String {
    hex::encode_upper([color.red, color.green, color.blue])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wheel_primaries() {
        assert_eq!(from_hue_saturation(0.0, 1.0), Color::new(255, 0, 0));
        assert_eq!(from_hue_saturation(120.0, 1.0), Color::new(0, 255, 0));
        assert_eq!(from_hue_saturation(240.0, 1.0), Color::new(0, 0, 255));
        assert_eq!(from_hue_saturation(480.0, 1.0), Color::new(0, 0, 255));
        assert_eq!(from_hue_saturation(-120.0, 1.0), Color::new(0, 0, 255));
    }

    #[test]
    fn wheel_center_is_white() {
        assert_eq!(from_hue_saturation(200.0, 0.0), Color::new(255, 255, 255));
        assert_eq!(from_hue_saturation(200.0, -3.0), Color::new(255, 255, 255));
        assert_eq!(from_hue_saturation(f32::NAN, 2.0), Color::new(255, 0, 0));
    }

    #[test]
    fn hex_wire_form() {
        assert_eq!(to_hex(Color::new(255, 138, 0)), "FF8A00");
        assert_eq!(to_hex(Color::new(0, 0, 0)), "000000");
    }

    #[test]
    fn hex_parsing() {
        assert_eq!(parse_hex("#ff8a00"), Ok(Color::new(255, 138, 0)));
        assert_eq!(parse_hex(" 0A0B0C "), Ok(Color::new(10, 11, 12)));
        assert!(parse_hex("#fff").is_err());
        assert!(parse_hex("GG0000").is_err());
        assert!(parse_hex("##ff8a00").is_err());
    }

    #[test]
    fn samples() {
        let sample = ColorSample::HueSaturation {
            hue: 60.0,
            saturation: 1.0,
        };
        assert_eq!(sample.to_color(), Color::new(255, 255, 0));

        let rgb: ColorSample = Color::new(1, 2, 3).into();
        assert_eq!(rgb.to_color(), Color::new(1, 2, 3));
    }
}
