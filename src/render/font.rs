//! Bitmap faces standing in for the settings page fonts.
//!
//! Every face is a Latin-1 mono font drawn at an integer scale picked to get
//! as close as possible to the requested glyph height.

use embedded_graphics::mono_font::iso_8859_1::{FONT_10X20, FONT_6X10, FONT_7X14, FONT_9X18_BOLD};
use embedded_graphics::mono_font::MonoFont;

use crate::style::FontFace;

pub fn base_font(face: FontFace) -> &'static MonoFont<'static> {
    match face {
        FontFace::Jost => &FONT_10X20,
        FontFace::Napoli => &FONT_9X18_BOLD,
        FontFace::Dogica => &FONT_6X10,
        FontFace::DsDigital => &FONT_7X14,
    }
}

/// A face at a concrete scale
#[derive(Clone, Copy)]
pub struct ScaledFont {
    pub font: &'static MonoFont<'static>,
    pub scale: u32,
}

impl ScaledFont {
    /// Closest scale to `pixel_height`, never below 1
    pub fn pick(face: FontFace, pixel_height: u32) -> Self {
        let font = base_font(face);
        let base = font.character_size.height.max(1);
        let scale = ((pixel_height + base / 2) / base).max(1);
        Self { font, scale }
    }

    pub fn glyph_height(&self) -> u32 {
        self.font.character_size.height * self.scale
    }

    /// Width of a single line of text in screen pixels
    pub fn text_width(&self, text: &str) -> u32 {
        let chars = text.chars().count() as u32;
        if chars == 0 {
            return 0;
        }
        let advance = self.font.character_size.width + self.font.character_spacing;
        (chars * advance - self.font.character_spacing) * self.scale
    }
}
