//! Where each piece of text goes for a given layout.
//!
//! All four layouts start the verse at `margin + 10` from the top. The margin
//! is 5% of the shorter side. Labels sit on the bottom margin.

use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_text::alignment::HorizontalAlignment;

use crate::style::Layout;

/// Extra space between the top margin and the first verse line
pub const VERSE_TOP_PAD: u32 = 10;
/// Space between stacked labels, and between labels and the verse
pub const LABEL_GAP: u32 = 10;

pub fn margin(frame: Size) -> u32 {
    frame.width.min(frame.height) * 5 / 100
}

/// Screen positions for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Area the verse may wrap in
    pub verse: Rectangle,
    pub verse_alignment: HorizontalAlignment,
    /// Top left corner of the translation label
    pub translation: Point,
    /// Top left corner of the reference label
    pub reference: Point,
}

/// Lay out a frame of `frame` size with labels of the given sizes
pub fn place(layout: Layout, frame: Size, translation: Size, reference: Size) -> Placement {
    let (w, h) = (frame.width as i32, frame.height as i32);
    let margin = margin(frame) as i32;
    let content_width = (w - 2 * margin).max(0);
    let gap = LABEL_GAP as i32;

    let bottom = |label: Size| h - margin - label.height as i32;
    let right = |label: Size| w - margin - label.width as i32;
    let stacked = h - margin - translation.height as i32 - reference.height as i32 - gap;

    let (alignment, translation_at, reference_at) = match layout {
        Layout::Corner => (
            HorizontalAlignment::Left,
            Point::new(margin, bottom(translation)),
            Point::new(right(reference), bottom(reference)),
        ),
        Layout::Center => (
            HorizontalAlignment::Center,
            Point::new(
                margin + content_width / 4 - translation.width as i32 / 2,
                bottom(translation),
            ),
            Point::new(
                w - margin - content_width / 4 - reference.width as i32 / 2,
                bottom(reference),
            ),
        ),
        Layout::Left => (
            HorizontalAlignment::Left,
            Point::new(margin, stacked),
            Point::new(margin, bottom(reference)),
        ),
        Layout::Right => (
            HorizontalAlignment::Right,
            Point::new(right(translation), stacked),
            Point::new(right(reference), bottom(reference)),
        ),
    };

    let verse_top = margin + VERSE_TOP_PAD as i32;
    let labels_top = translation_at.y.min(reference_at.y);
    let verse_height = (labels_top - gap - verse_top).max(0) as u32;

    Placement {
        verse: Rectangle::new(
            Point::new(margin, verse_top),
            Size::new(content_width as u32, verse_height),
        ),
        verse_alignment: alignment,
        translation: translation_at,
        reference: reference_at,
    }
}
