//! Reduce a rendered frame to the colours an e-ink panel can show.

use embedded_graphics::pixelcolor::{Rgb888, RgbColor};
use epd_waveshare::color::{Color, OctColor, TriColor};
use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::VerseError;

/// Colour capability of the target panel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Panel {
    /// Full colour, the frame is left untouched
    #[default]
    Rgb,
    /// Black and white
    Mono,
    /// Black, white and red
    TriColor,
    /// Seven colour ACeP / Spectra panels
    Spectra,
}

impl Panel {
    pub const ALL: &'static [Panel] = &[Panel::Rgb, Panel::Mono, Panel::TriColor, Panel::Spectra];

    pub const fn name(self) -> &'static str {
        match self {
            Panel::Rgb => "rgb",
            Panel::Mono => "mono",
            Panel::TriColor => "tricolor",
            Panel::Spectra => "spectra",
        }
    }

    /// Colours the panel can show, `None` when every colour is allowed
    pub fn palette(self) -> Option<Vec<Rgb888>> {
        match self {
            Panel::Rgb => None,
            Panel::Mono => Some([Color::Black, Color::White].into_iter().map(mono_rgb).collect()),
            Panel::TriColor => Some(
                [TriColor::Black, TriColor::White, TriColor::Chromatic]
                    .into_iter()
                    .map(tri_rgb)
                    .collect(),
            ),
            Panel::Spectra => Some(
                [
                    OctColor::Black,
                    OctColor::White,
                    OctColor::Green,
                    OctColor::Blue,
                    OctColor::Red,
                    OctColor::Yellow,
                    OctColor::Orange,
                ]
                .into_iter()
                .filter_map(oct_rgb)
                .collect(),
            ),
        }
    }
}

fn mono_rgb(color: Color) -> Rgb888 {
    match color {
        Color::Black => Rgb888::BLACK,
        Color::White => Rgb888::WHITE,
    }
}

fn tri_rgb(color: TriColor) -> Rgb888 {
    match color {
        TriColor::Black => Rgb888::BLACK,
        TriColor::White => Rgb888::WHITE,
        TriColor::Chromatic => Rgb888::RED,
    }
}

fn oct_rgb(color: OctColor) -> Option<Rgb888> {
    match color {
        OctColor::Black => Some(Rgb888::BLACK),
        OctColor::White => Some(Rgb888::WHITE),
        OctColor::Green => Some(Rgb888::new(0x00, 0xff, 0x00)),
        OctColor::Blue => Some(Rgb888::new(0x00, 0x00, 0xff)),
        OctColor::Red => Some(Rgb888::new(0xff, 0x00, 0x00)),
        OctColor::Yellow => Some(Rgb888::new(0xff, 0xff, 0x00)),
        OctColor::Orange => Some(Rgb888::new(0xff, 0x80, 0x00)),
        // not a colour, the pixel keeps whatever it showed before
        OctColor::HiZ => None,
    }
}

fn nearest(palette: &[Rgb888], pixel: Rgb<u8>) -> Rgb888 {
    let distance = |c: &Rgb888| {
        let dr = i32::from(c.r()) - i32::from(pixel[0]);
        let dg = i32::from(c.g()) - i32::from(pixel[1]);
        let db = i32::from(c.b()) - i32::from(pixel[2]);
        dr * dr + dg * dg + db * db
    };
    palette
        .iter()
        .copied()
        .min_by_key(distance)
        .unwrap_or(Rgb888::new(pixel[0], pixel[1], pixel[2]))
}

/// Map every pixel to its nearest panel colour
pub fn quantize(image: &mut RgbImage, panel: Panel) {
    let Some(palette) = panel.palette() else {
        return;
    };
    for pixel in image.pixels_mut() {
        let c = nearest(&palette, *pixel);
        *pixel = Rgb([c.r(), c.g(), c.b()]);
    }
}

impl FromStr for Panel {
    type Err = VerseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        Panel::ALL
            .iter()
            .copied()
            .find(|panel| panel.name().eq_ignore_ascii_case(value))
            .ok_or_else(|| VerseError::InvalidStyle(format!("unknown panel '{}'", value)))
    }
}

impl TryFrom<String> for Panel {
    type Error = VerseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Panel> for String {
    fn from(value: Panel) -> Self {
        value.name().to_string()
    }
}

impl fmt::Display for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
