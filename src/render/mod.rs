//! Verse frame rendering.
//!
//! A frame is drawn in this order: background, border, verse, translation
//! label, reference label. The result is reduced to the panel palette last.

pub mod border;
pub mod canvas;
pub mod font;
pub mod layout;
pub mod palette;
pub mod scaled;

use anyhow::{Context, Result};
use core::convert::Infallible;
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_graphics::text::{Baseline, LineHeight, Text};
use embedded_text::style::{HeightMode, TextBoxStyleBuilder, VerticalOverdraw};
use embedded_text::TextBox;
use image::RgbImage;
use log::debug;
use std::path::Path;

use crate::config::DeviceConfig;
use crate::error::VerseError;
use crate::resolver::Reference;
use crate::style::DisplayStyle;
use crate::translation::Translation;

use canvas::Canvas;
use font::ScaledFont;
use palette::Panel;
use scaled::Scaled;

fn drawn<T>(result: Result<T, Infallible>) -> T {
    match result {
        Ok(value) => value,
        Err(never) => match never {},
    }
}

/// Fonts for the three text elements of a frame
struct Fonts {
    verse: ScaledFont,
    reference: ScaledFont,
    translation: ScaledFont,
}

impl Fonts {
    fn for_frame(style: &DisplayStyle, frame: Size) -> Self {
        let short_side = frame.width.min(frame.height) as f32;
        let (verse, reference, translation) = style.size.multipliers();
        let px = |multiplier: f32| (short_side * multiplier) as u32;
        Self {
            verse: ScaledFont::pick(style.font, px(verse)),
            reference: ScaledFont::pick(style.font, px(reference)),
            translation: ScaledFont::pick(style.font, px(translation)),
        }
    }
}

/// Renders verse frames of a fixed size
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    width: u32,
    height: u32,
    panel: Panel,
}

impl Renderer {
    pub fn new(width: u32, height: u32, panel: Panel) -> Result<Self, VerseError> {
        if width == 0 || height == 0 {
            return Err(VerseError::InvalidStyle(format!(
                "display size {}x{}",
                width, height
            )));
        }
        Ok(Self {
            width,
            height,
            panel,
        })
    }

    pub fn for_device(device: &DeviceConfig) -> Result<Self, VerseError> {
        let (width, height) = device.dimensions();
        Self::new(width, height, device.panel)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Draw `text` in quotes with its reference and translation labels
    pub fn render(
        &self,
        text: &str,
        reference: &Reference,
        translation: Translation,
        style: &DisplayStyle,
    ) -> Result<RgbImage, VerseError> {
        style.validate()?;
        let colors = style.colors;
        let frame = self.size();
        let mut canvas = Canvas::new(self.width, self.height, colors.background.to_rgb888());

        drawn(border::draw(
            &mut canvas,
            style.border,
            style.border_width,
            colors.border.to_rgb888(),
        ));

        let fonts = Fonts::for_frame(style, frame);
        let reference_label = reference.to_string();
        let translation_label = translation.code();
        let label_size = |font: &ScaledFont, label: &str| {
            Size::new(font.text_width(label), font.glyph_height())
        };
        let placement = layout::place(
            style.layout,
            frame,
            label_size(&fonts.translation, translation_label),
            label_size(&fonts.reference, &reference_label),
        );
        debug!(
            "Rendering {} at verse scale {} in {:?}",
            reference, fonts.verse.scale, placement.verse
        );

        let quoted = format!("\"{}\"", text);
        let scale = fonts.verse.scale;
        let bounds = Rectangle::new(
            Point::zero(),
            Size::new(
                placement.verse.size.width / scale,
                placement.verse.size.height / scale,
            ),
        );
        let textbox_style = TextBoxStyleBuilder::new()
            .alignment(placement.verse_alignment)
            .line_height(LineHeight::Percent(style.font.line_spacing_percent()))
            .height_mode(HeightMode::Exact(VerticalOverdraw::FullRowsOnly))
            .build();
        let verse_style = MonoTextStyle::new(fonts.verse.font, colors.verse.to_rgb888());
        let mut target = Scaled::new(&mut canvas, placement.verse.top_left, scale);
        drawn(TextBox::with_textbox_style(&quoted, bounds, verse_style, textbox_style).draw(&mut target));

        draw_label(
            &mut canvas,
            translation_label,
            fonts.translation,
            placement.translation,
            colors.translation.to_rgb888(),
        );
        draw_label(
            &mut canvas,
            &reference_label,
            fonts.reference,
            placement.reference,
            colors.reference.to_rgb888(),
        );

        let mut image = canvas.into_image();
        palette::quantize(&mut image, self.panel);
        Ok(image)
    }
}

fn draw_label(canvas: &mut Canvas, label: &str, font: ScaledFont, at: Point, color: Rgb888) {
    let style = MonoTextStyle::new(font.font, color);
    let mut target = Scaled::new(canvas, at, font.scale);
    drawn(Text::with_baseline(label, Point::zero(), style, Baseline::Top).draw(&mut target));
}

/// Write a frame as PNG
pub fn save_png(image: &RgbImage, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    image
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{BorderStyle, Layout, Rgb, SizePreset};
    use embedded_graphics::primitives::PointsIter;
    use image::Rgb as Pixel;

    fn john_3_16() -> Reference {
        Reference {
            book: "John".into(),
            book_id: 43,
            chapter: 3,
            verse: 16,
        }
    }

    fn ink_in(image: &RgbImage, area: Rectangle, ink: Rgb) -> usize {
        let ink = Pixel([ink.0, ink.1, ink.2]);
        area.points()
            .filter(|p| image.get_pixel(p.x as u32, p.y as u32) == &ink)
            .count()
    }

    #[test]
    fn renders_frame_of_device_size_on_background() {
        let renderer = Renderer::new(800, 480, Panel::Rgb).unwrap();
        let style = DisplayStyle::default();
        let image = renderer
            .render("For God so loved the world", &john_3_16(), Translation::Nkjv, &style)
            .unwrap();
        assert_eq!(image.dimensions(), (800, 480));
        let bg = style.colors.background;
        assert_eq!(image.get_pixel(0, 0), &Pixel([bg.0, bg.1, bg.2]));
    }

    #[test]
    fn corner_layout_puts_verse_top_left_and_reference_bottom_right() {
        let renderer = Renderer::new(800, 480, Panel::Rgb).unwrap();
        let style = DisplayStyle::default();
        let image = renderer
            .render("Jesus wept.", &john_3_16(), Translation::Kjv, &style)
            .unwrap();

        let top_left = Rectangle::new(Point::new(0, 0), Size::new(400, 120));
        let bottom_right = Rectangle::new(Point::new(600, 400), Size::new(200, 80));
        let bottom_left = Rectangle::new(Point::new(0, 400), Size::new(200, 80));
        assert!(ink_in(&image, top_left, style.colors.verse) > 0);
        assert!(ink_in(&image, bottom_right, style.colors.reference) > 0);
        assert!(ink_in(&image, bottom_left, style.colors.translation) > 0);
        assert_eq!(ink_in(&image, bottom_left, style.colors.reference), 0);
    }

    #[test]
    fn right_layout_keeps_labels_on_the_right() {
        let renderer = Renderer::new(800, 480, Panel::Rgb).unwrap();
        let style = DisplayStyle {
            layout: Layout::Right,
            size: SizePreset::Small,
            ..DisplayStyle::default()
        };
        let image = renderer
            .render("Jesus wept.", &john_3_16(), Translation::Esv, &style)
            .unwrap();
        let left_half_bottom = Rectangle::new(Point::new(0, 360), Size::new(400, 120));
        assert_eq!(ink_in(&image, left_half_bottom, style.colors.translation), 0);
        assert_eq!(ink_in(&image, left_half_bottom, style.colors.reference), 0);
    }

    #[test]
    fn border_is_drawn_in_border_colour() {
        let renderer = Renderer::new(200, 120, Panel::Rgb).unwrap();
        let mut style = DisplayStyle {
            border: BorderStyle::Solid,
            border_width: 4,
            ..DisplayStyle::default()
        };
        style.colors.border = Rgb(0xff, 0x00, 0x00);
        let image = renderer
            .render("Amen.", &john_3_16(), Translation::Nlt, &style)
            .unwrap();
        assert_eq!(image.get_pixel(1, 60), &Pixel([0xff, 0, 0]));
        assert_eq!(image.get_pixel(199, 119), &Pixel([0xff, 0, 0]));
    }

    #[test]
    fn long_verse_stays_inside_its_area() {
        let renderer = Renderer::new(400, 300, Panel::Rgb).unwrap();
        let style = DisplayStyle {
            size: SizePreset::Large,
            ..DisplayStyle::default()
        };
        let text = "Now it came to pass in the days when the judges ruled, that there was a famine in the land. ".repeat(6);
        let image = renderer
            .render(&text, &john_3_16(), Translation::Nasb, &style)
            .unwrap();
        // nothing of the verse below the labels' top edge
        let footer = Rectangle::new(Point::new(0, 270), Size::new(400, 30));
        assert_eq!(ink_in(&image, footer, style.colors.verse), 0);
    }

    #[test]
    fn mono_panel_output_is_black_and_white() {
        let renderer = Renderer::new(160, 100, Panel::Mono).unwrap();
        let image = renderer
            .render("Jesus wept.", &john_3_16(), Translation::Kjv, &DisplayStyle::default())
            .unwrap();
        assert!(image
            .pixels()
            .all(|p| *p == Pixel([0, 0, 0]) || *p == Pixel([255, 255, 255])));
    }

    #[test]
    fn rejects_invalid_geometry() {
        assert!(matches!(
            Renderer::new(0, 480, Panel::Rgb),
            Err(VerseError::InvalidStyle(_))
        ));
        let renderer = Renderer::new(100, 100, Panel::Rgb).unwrap();
        let style = DisplayStyle {
            border_width: 0,
            ..DisplayStyle::default()
        };
        assert!(matches!(
            renderer.render("x", &john_3_16(), Translation::Kjv, &style),
            Err(VerseError::InvalidStyle(_))
        ));
    }
}
