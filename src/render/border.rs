//! Frame borders.

use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{
    Circle, Line, OffsetOutline, PrimitiveStyle, PrimitiveStyleBuilder, Rectangle,
    StrokeAlignment,
};

use crate::style::BorderStyle;

const DASH: u32 = 10;
const DASH_GAP: u32 = 5;
const DOT_PITCH: u32 = 8;
/// Stroke of each line of a double border
const DOUBLE_STROKE: u32 = 2;

fn inside_stroke(color: Rgb888, width: u32) -> PrimitiveStyle<Rgb888> {
    PrimitiveStyleBuilder::new()
        .stroke_color(color)
        .stroke_width(width)
        .stroke_alignment(StrokeAlignment::Inside)
        .build()
}

/// Draw `style` along the edges of `target`
pub fn draw<D>(target: &mut D, style: BorderStyle, width: u32, color: Rgb888) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb888>,
{
    let frame = target.bounding_box();
    match style {
        BorderStyle::None => Ok(()),
        BorderStyle::Solid => frame.into_styled(inside_stroke(color, width)).draw(target),
        BorderStyle::Dashed => dashed(target, frame, width, color),
        BorderStyle::Dotted => dotted(target, frame, width, color),
        BorderStyle::Double => {
            frame
                .into_styled(inside_stroke(color, DOUBLE_STROKE))
                .draw(target)?;
            let inset = width + DOUBLE_STROKE;
            frame
                .offset(-(inset as i32))
                .into_styled(inside_stroke(color, DOUBLE_STROKE))
                .draw(target)
        }
    }
}

fn dashed<D>(target: &mut D, frame: Rectangle, width: u32, color: Rgb888) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb888>,
{
    let Some(bottom_right) = frame.bottom_right() else {
        return Ok(());
    };
    let stroke = PrimitiveStyle::with_stroke(color, width);
    let half = (width / 2) as i32;
    let (left, top) = (frame.top_left.x, frame.top_left.y);
    let (right, bottom) = (bottom_right.x, bottom_right.y);
    let step = (DASH + DASH_GAP) as usize;

    for x in (left..=right).step_by(step) {
        let end = (x + DASH as i32).min(right);
        Line::new(Point::new(x, top + half), Point::new(end, top + half))
            .into_styled(stroke)
            .draw(target)?;
        Line::new(Point::new(x, bottom - half), Point::new(end, bottom - half))
            .into_styled(stroke)
            .draw(target)?;
    }
    for y in (top..=bottom).step_by(step) {
        let end = (y + DASH as i32).min(bottom);
        Line::new(Point::new(left + half, y), Point::new(left + half, end))
            .into_styled(stroke)
            .draw(target)?;
        Line::new(Point::new(right - half, y), Point::new(right - half, end))
            .into_styled(stroke)
            .draw(target)?;
    }
    Ok(())
}

fn dotted<D>(target: &mut D, frame: Rectangle, width: u32, color: Rgb888) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb888>,
{
    let Some(bottom_right) = frame.bottom_right() else {
        return Ok(());
    };
    let fill = PrimitiveStyle::with_fill(color);
    let diameter = width as i32;
    let (left, top) = (frame.top_left.x, frame.top_left.y);
    let far_x = bottom_right.x + 1 - diameter;
    let far_y = bottom_right.y + 1 - diameter;

    for x in (left..=bottom_right.x).step_by(DOT_PITCH as usize) {
        Circle::new(Point::new(x, top), width).into_styled(fill).draw(target)?;
        Circle::new(Point::new(x, far_y), width).into_styled(fill).draw(target)?;
    }
    for y in (top..=bottom_right.y).step_by(DOT_PITCH as usize) {
        Circle::new(Point::new(left, y), width).into_styled(fill).draw(target)?;
        Circle::new(Point::new(far_x, y), width).into_styled(fill).draw(target)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::canvas::Canvas;
    use image::{Rgb, RgbImage};

    const INK: Rgb<u8> = Rgb([0, 0, 0]);
    const PAPER: Rgb<u8> = Rgb([255, 255, 255]);

    fn bordered(style: BorderStyle, width: u32) -> RgbImage {
        let mut canvas = Canvas::new(60, 40, Rgb888::WHITE);
        draw(&mut canvas, style, width, Rgb888::BLACK).unwrap();
        canvas.into_image()
    }

    #[test]
    fn solid_border_stays_inside_the_frame() {
        let image = bordered(BorderStyle::Solid, 3);
        assert_eq!(image.get_pixel(0, 0), &INK);
        assert_eq!(image.get_pixel(2, 20), &INK);
        assert_eq!(image.get_pixel(59, 39), &INK);
        assert_eq!(image.get_pixel(3, 20), &PAPER);
        assert_eq!(image.get_pixel(30, 20), &PAPER);
    }

    #[test]
    fn dashed_border_has_gaps() {
        let image = bordered(BorderStyle::Dashed, 2);
        assert_eq!(image.get_pixel(5, 1), &INK);
        assert_eq!(image.get_pixel(12, 1), &PAPER);
        assert_eq!(image.get_pixel(16, 1), &INK);
    }

    #[test]
    fn dotted_border_draws_dots_along_edges() {
        let image = bordered(BorderStyle::Dotted, 4);
        assert_eq!(image.get_pixel(1, 1), &INK);
        assert_eq!(image.get_pixel(10, 1), &INK);
        assert_eq!(image.get_pixel(5, 1), &PAPER);
        assert_eq!(image.get_pixel(30, 20), &PAPER);
    }

    #[test]
    fn double_border_has_two_lines() {
        let image = bordered(BorderStyle::Double, 3);
        assert_eq!(image.get_pixel(20, 0), &INK);
        assert_eq!(image.get_pixel(20, 1), &INK);
        assert_eq!(image.get_pixel(20, 3), &PAPER);
        assert_eq!(image.get_pixel(20, 5), &INK);
        assert_eq!(image.get_pixel(20, 6), &INK);
        assert_eq!(image.get_pixel(20, 7), &PAPER);
    }

    #[test]
    fn no_border_leaves_frame_blank() {
        let image = bordered(BorderStyle::None, 3);
        assert!(image.pixels().all(|p| *p == PAPER));
    }
}
