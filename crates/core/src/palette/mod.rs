//! Textual colors and the continuous palettes used to tint the visual.

use std::{f64::consts::PI, fmt, str::FromStr};

use crate::SoundPainterError;

/// 8-bit RGB color with a straight (non-premultiplied) alpha.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self {
            a: a.clamp(0.0, 1.0),
            ..self
        }
    }

    /// Builds a color from unit-range channels, clamping and rounding each.
    pub fn from_unit(r: f64, g: f64, b: f64) -> Self {
        Self::rgb(unit_to_byte(r), unit_to_byte(g), unit_to_byte(b))
    }

    pub fn to_skia(self) -> tiny_skia::Color {
        tiny_skia::Color::from_rgba8(self.r, self.g, self.b, (self.a * 255.0).round() as u8)
    }
}

fn unit_to_byte(value: f64) -> u8 {
    let scaled = (value * 255.0).round();
    if scaled.is_nan() {
        0
    } else {
        scaled.clamp(0.0, 255.0) as u8
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a >= 1.0 {
            write!(f, "rgb({}, {}, {})", self.r, self.g, self.b)
        } else {
            write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
        }
    }
}

impl FromStr for Color {
    type Err = SoundPainterError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let text = text.trim();
        let invalid = || SoundPainterError::msg(format!("`{text}` is not a color"));

        if let Some(hex) = text.strip_prefix('#') {
            return parse_hex(hex).ok_or_else(invalid);
        }

        let (body, expected) = if let Some(rest) = text.strip_prefix("rgba(") {
            (rest, 4)
        } else if let Some(rest) = text.strip_prefix("rgb(") {
            (rest, 3)
        } else {
            return Err(invalid());
        };

        let body = body.strip_suffix(')').ok_or_else(invalid)?;
        let parts: Vec<&str> = body.split(',').map(str::trim).collect();
        if parts.len() != expected {
            return Err(invalid());
        }

        let mut channels = [0u8; 3];
        for (slot, part) in channels.iter_mut().zip(&parts) {
            let value: f64 = part.parse().map_err(|_| invalid())?;
            *slot = value.round().clamp(0.0, 255.0) as u8;
        }
        let alpha = match parts.get(3) {
            Some(part) => part.parse::<f32>().map_err(|_| invalid())?,
            None => 1.0,
        };

        Ok(Color::rgb(channels[0], channels[1], channels[2]).with_alpha(alpha))
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    let nibble = |c: char| c.to_digit(16).map(|d| d as u8);
    let chars: Vec<char> = hex.chars().collect();
    match chars.len() {
        3 => {
            let r = nibble(chars[0])?;
            let g = nibble(chars[1])?;
            let b = nibble(chars[2])?;
            Some(Color::rgb(r * 17, g * 17, b * 17))
        }
        6 => {
            let byte = |i: usize| Some(nibble(chars[i])? * 16 + nibble(chars[i + 1])?);
            Some(Color::rgb(byte(0)?, byte(2)?, byte(4)?))
        }
        _ => None,
    }
}

/// Continuous color ramp sampled over `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Palette {
    /// Cyclic cubehelix rainbow.
    Rainbow,
    /// Perceptually uniform dark-blue to yellow ramp.
    Plasma,
}

impl Palette {
    pub fn sample(self, t: f32) -> Color {
        let t = f64::from(t);
        match self {
            Palette::Rainbow => rainbow(t),
            Palette::Plasma => plasma(t),
        }
    }
}

fn rainbow(t: f64) -> Color {
    let t = if (0.0..=1.0).contains(&t) {
        t
    } else {
        t - t.floor()
    };
    let spread = (t - 0.5).abs();
    let hue = 360.0 * t - 100.0;
    let saturation = 1.5 - 1.5 * spread;
    let lightness = 0.8 - 0.9 * spread;
    cubehelix(hue, saturation, lightness)
}

fn cubehelix(hue: f64, saturation: f64, lightness: f64) -> Color {
    const A: f64 = -0.14861;
    const B: f64 = 1.78277;
    const C: f64 = -0.29227;
    const D: f64 = -0.90649;
    const E: f64 = 1.97294;

    let h = (hue + 120.0) * PI / 180.0;
    let amplitude = saturation * lightness * (1.0 - lightness);
    let (sin_h, cos_h) = h.sin_cos();

    Color::from_unit(
        lightness + amplitude * (A * cos_h + B * sin_h),
        lightness + amplitude * (C * cos_h + D * sin_h),
        lightness + amplitude * (E * cos_h),
    )
}

// Sixth-degree polynomial fit of the plasma colormap, lowest order first.
const PLASMA: [[f64; 3]; 7] = [
    [0.058_732_343_923_997_02, 0.023_336_708_925_656_64, 0.543_340_182_674_875_4],
    [2.176_514_634_195_958, 0.238_383_417_126_018_2, 0.753_960_459_978_403_6],
    [-2.689_460_476_458_034, -7.455_851_135_738_909, 3.110_799_939_717_086],
    [6.130_348_345_893_603, 42.346_188_147_722_7, -28.518_854_653_321_58],
    [-11.107_436_190_622_71, -82.666_311_094_280_45, 60.139_847_674_182_63],
    [10.023_065_576_470_65, 71.413_617_700_953_49, -54.072_186_555_600_67],
    [-3.658_713_842_777_788, -22.931_534_654_611_49, 18.191_907_785_398_28],
];

fn plasma(t: f64) -> Color {
    let t = t.clamp(0.0, 1.0);
    let mut rgb = [0.0f64; 3];
    for (channel, value) in rgb.iter_mut().enumerate() {
        *value = PLASMA
            .iter()
            .rev()
            .fold(0.0, |acc, coefficients| acc * t + coefficients[channel]);
    }
    Color::from_unit(rgb[0], rgb[1], rgb[2])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Color, b: Color, tolerance: i16) -> bool {
        (i16::from(a.r) - i16::from(b.r)).abs() <= tolerance
            && (i16::from(a.g) - i16::from(b.g)).abs() <= tolerance
            && (i16::from(a.b) - i16::from(b.b)).abs() <= tolerance
    }

    #[test]
    fn rainbow_starts_at_violet() {
        assert_eq!(Palette::Rainbow.sample(0.0), Color::rgb(110, 64, 170));
        assert_eq!(Palette::Rainbow.sample(0.0).to_string(), "rgb(110, 64, 170)");
    }

    #[test]
    fn rainbow_wraps_outside_unit_range() {
        assert_eq!(Palette::Rainbow.sample(1.25), Palette::Rainbow.sample(0.25));
    }

    #[test]
    fn plasma_matches_reference_endpoints() {
        assert!(close(Palette::Plasma.sample(0.0), Color::rgb(13, 8, 135), 4));
        assert!(close(Palette::Plasma.sample(1.0), Color::rgb(240, 249, 33), 6));
    }

    #[test]
    fn parses_hex_and_functional_notation() {
        assert_eq!("#000".parse::<Color>().unwrap(), Color::BLACK);
        assert_eq!("#ff8000".parse::<Color>().unwrap(), Color::rgb(255, 128, 0));
        assert_eq!(
            " rgb(110, 64, 170) ".parse::<Color>().unwrap(),
            Color::rgb(110, 64, 170)
        );

        let translucent: Color = "rgba(0, 0, 0, 0.5)".parse().unwrap();
        assert_eq!(translucent.a, 0.5);
        assert_eq!(translucent.to_string(), "rgba(0, 0, 0, 0.5)");
    }

    #[test]
    fn rejects_garbage() {
        assert!("#12".parse::<Color>().is_err());
        assert!("rgb(1, 2)".parse::<Color>().is_err());
        assert!("blue".parse::<Color>().is_err());
    }
}
