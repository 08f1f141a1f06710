//! User selectable display style: layout, size, border, font and colours.
//!
//! All choices are closed sets. Unknown names fail with
//! [`VerseError::InvalidStyle`] while the settings are parsed or saved, so a
//! render never sees an invalid style.

use embedded_graphics::pixelcolor::Rgb888;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::VerseError;

/// Border widths accepted by the renderer
pub const BORDER_WIDTH_RANGE: std::ops::RangeInclusive<u32> = 1..=32;

fn parse_choice<T: Copy>(
    all: &[T],
    name: impl Fn(T) -> &'static str,
    value: &str,
    what: &str,
) -> Result<T, VerseError> {
    let value = value.trim();
    all.iter()
        .copied()
        .find(|choice| name(*choice).eq_ignore_ascii_case(value))
        .ok_or_else(|| VerseError::InvalidStyle(format!("unknown {} '{}'", what, value)))
}

macro_rules! style_choice {
    ($ty:ident, $what:literal, [$($variant:ident => $name:literal),+ $(,)?]) => {
        impl $ty {
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            pub const fn name(self) -> &'static str {
                match self {
                    $($ty::$variant => $name),+
                }
            }
        }

        impl FromStr for $ty {
            type Err = VerseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_choice($ty::ALL, $ty::name, s, $what)
            }
        }

        impl TryFrom<String> for $ty {
            type Error = VerseError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> Self {
                value.name().to_string()
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

/// Where the verse, reference and translation go on the screen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Layout {
    /// Verse top left, translation bottom left, reference bottom right
    #[default]
    Corner,
    /// Verse centered, translation and reference centered in the bottom quarters
    Center,
    Left,
    Right,
}

style_choice!(Layout, "layout", [
    Corner => "corner",
    Center => "center",
    Left => "left",
    Right => "right",
]);

/// Text size preset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SizePreset {
    Small,
    #[default]
    Medium,
    Large,
}

style_choice!(SizePreset, "size", [
    Small => "small",
    Medium => "medium",
    Large => "large",
]);

impl SizePreset {
    /// Font heights for verse, reference and translation as a fraction of the
    /// shorter display side
    pub const fn multipliers(self) -> (f32, f32, f32) {
        match self {
            SizePreset::Small => (0.054, 0.035, 0.030),
            SizePreset::Medium => (0.075, 0.042, 0.0375),
            SizePreset::Large => (0.096, 0.054, 0.048),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BorderStyle {
    #[default]
    None,
    Solid,
    Dashed,
    Dotted,
    Double,
}

style_choice!(BorderStyle, "border", [
    None => "none",
    Solid => "solid",
    Dashed => "dashed",
    Dotted => "dotted",
    Double => "double",
]);

/// Typeface choice; each maps to a bitmap face in [`crate::render::font`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FontFace {
    #[default]
    Jost,
    Napoli,
    Dogica,
    DsDigital,
}

style_choice!(FontFace, "font", [
    Jost => "Jost",
    Napoli => "Napoli",
    Dogica => "Dogica",
    DsDigital => "DS-Digital",
]);

impl FontFace {
    /// Line height as a multiple of the glyph height
    pub const fn line_spacing_percent(self) -> u32 {
        match self {
            FontFace::Jost => 120,
            FontFace::Napoli => 150,
            FontFace::Dogica => 160,
            FontFace::DsDigital => 140,
        }
    }
}

/// 24-bit colour stored as `#rrggbb`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const fn to_rgb888(self) -> Rgb888 {
        Rgb888::new(self.0, self.1, self.2)
    }
}

impl FromStr for Rgb {
    type Err = VerseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || VerseError::InvalidStyle(format!("'{}' is not a #rrggbb colour", s));
        let hex = s.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        Ok(Rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl TryFrom<String> for Rgb {
    type Error = VerseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

/// The five colour fields of the settings page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Colors {
    pub background: Rgb,
    pub verse: Rgb,
    pub reference: Rgb,
    pub translation: Rgb,
    pub border: Rgb,
}

impl Default for Colors {
    fn default() -> Self {
        Self {
            background: Rgb(0xf8, 0xf4, 0xe8),
            verse: Rgb(0x2c, 0x3e, 0x50),
            reference: Rgb(0x34, 0x49, 0x5e),
            translation: Rgb(0x7f, 0x8c, 0x8d),
            border: Rgb(0x2c, 0x3e, 0x50),
        }
    }
}

/// Everything the renderer needs to know about the look of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayStyle {
    pub layout: Layout,
    pub size: SizePreset,
    pub border: BorderStyle,
    pub border_width: u32,
    pub font: FontFace,
    pub colors: Colors,
}

impl DisplayStyle {
    pub fn validate(&self) -> Result<(), VerseError> {
        if !BORDER_WIDTH_RANGE.contains(&self.border_width) {
            return Err(VerseError::InvalidStyle(format!(
                "border width {} outside {}..={}",
                self.border_width,
                BORDER_WIDTH_RANGE.start(),
                BORDER_WIDTH_RANGE.end()
            )));
        }
        Ok(())
    }
}

impl Default for DisplayStyle {
    fn default() -> Self {
        Self {
            layout: Layout::default(),
            size: SizePreset::default(),
            border: BorderStyle::default(),
            border_width: 3,
            font: FontFace::default(),
            colors: Colors::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_settings_page_names() {
        assert_eq!("center".parse::<Layout>(), Ok(Layout::Center));
        assert_eq!("LARGE".parse::<SizePreset>(), Ok(SizePreset::Large));
        assert_eq!("dotted".parse::<BorderStyle>(), Ok(BorderStyle::Dotted));
        assert_eq!("ds-digital".parse::<FontFace>(), Ok(FontFace::DsDigital));
    }

    #[test]
    fn unknown_choice_is_invalid_style() {
        assert!(matches!(
            "diagonal".parse::<Layout>(),
            Err(VerseError::InvalidStyle(_))
        ));
        assert!(matches!(
            "Caladea".parse::<FontFace>(),
            Err(VerseError::InvalidStyle(_))
        ));
    }

    #[test]
    fn colours_round_trip_through_hex() {
        let colour: Rgb = "#2C3E50".parse().unwrap();
        assert_eq!(colour, Rgb(0x2c, 0x3e, 0x50));
        assert_eq!(colour.to_string(), "#2c3e50");
        assert_eq!("f8f4e8".parse::<Rgb>(), Ok(Rgb(0xf8, 0xf4, 0xe8)));
        assert!("#12345".parse::<Rgb>().is_err());
        assert!("#gg0000".parse::<Rgb>().is_err());
    }

    #[test]
    fn border_width_is_bounded() {
        let mut style = DisplayStyle::default();
        assert!(style.validate().is_ok());
        style.border_width = 0;
        assert!(style.validate().is_err());
        style.border_width = 33;
        assert!(style.validate().is_err());
    }

    #[test]
    fn font_names_serialize_like_the_settings_page() {
        let json = serde_json::to_string(&FontFace::DsDigital).unwrap();
        assert_eq!(json, r#""DS-Digital""#);
        let err = serde_json::from_str::<BorderStyle>(r#""wavy""#);
        assert!(err.is_err());
    }
}
