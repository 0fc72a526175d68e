//! Display color of a channel
//!
//! Stored in the container as its `#rrggbb` name.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PlotError;

/// An opaque RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Generate a distinct color for the channel at `index`
    ///
    /// Hues are spread with the golden ratio; saturation and value stay in a
    /// range readable on light and dark backgrounds.
    pub fn palette(index: usize) -> Self {
        const GOLDEN_RATIO: f32 = 0.618_034;

        let hue = ((index as f32 * GOLDEN_RATIO) % 1.0) * 360.0;
        let (r, g, b) = hsv_to_rgb(hue, 0.7, 0.85);
        Self::rgb(r, g, b)
    }

    /// The `#rrggbb` name of this color
    pub fn name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = PlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PlotError::InvalidColor(s.to_string());

        let hex = s.trim().strip_prefix('#').ok_or_else(invalid)?;
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(invalid());
        }

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| invalid())
        };

        Ok(Self::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

/// Convert HSV (hue 0-360, saturation 0-1, value 0-1) to RGB
fn hsv_to_rgb(hue: f32, saturation: f32, value: f32) -> (u8, u8, u8) {
    let c = value * saturation;
    let x = c * (1.0 - ((hue / 60.0) % 2.0 - 1.0).abs());
    let m = value - c;

    let (r, g, b) = match (hue / 60.0) as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    (
        ((r + m) * 255.0) as u8,
        ((g + m) * 255.0) as u8,
        ((b + m) * 255.0) as u8,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_name() {
        assert_eq!(Color::rgb(0x12, 0xab, 0xff).name(), "#12abff");
        assert_eq!(Color::default().name(), "#000000");
    }

    #[test]
    fn test_color_parse() {
        let color: Color = "#12ABff".parse().unwrap();
        assert_eq!(color, Color::rgb(0x12, 0xab, 0xff));

        assert!("12abff".parse::<Color>().is_err());
        assert!("#12abf".parse::<Color>().is_err());
        assert!("#12abfg".parse::<Color>().is_err());
        assert!("".parse::<Color>().is_err());
    }

    #[test]
    fn test_palette_is_distinct() {
        let first: Vec<Color> = (0..8).map(Color::palette).collect();
        for (i, a) in first.iter().enumerate() {
            for b in &first[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
