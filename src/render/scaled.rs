//! Integer upscaling for the bitmap fonts.
//!
//! Text is laid out in font pixels inside a [`Scaled`] target; every pixel
//! becomes a `scale x scale` block at `origin + p * scale` on the parent.

use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

pub struct Scaled<'a, D> {
    parent: &'a mut D,
    origin: Point,
    scale: u32,
}

impl<'a, D: DrawTarget> Scaled<'a, D> {
    pub fn new(parent: &'a mut D, origin: Point, scale: u32) -> Self {
        Self {
            parent,
            origin,
            scale: scale.max(1),
        }
    }

    fn block(&self, point: Point) -> Rectangle {
        let scale = self.scale as i32;
        Rectangle::new(
            self.origin + Point::new(point.x * scale, point.y * scale),
            Size::new(self.scale, self.scale),
        )
    }
}

impl<D: DrawTarget> Dimensions for Scaled<'_, D> {
    fn bounding_box(&self) -> Rectangle {
        let parent = self.parent.bounding_box();
        let offset = self.origin - parent.top_left;
        let width = (parent.size.width as i32 - offset.x).max(0) as u32 / self.scale;
        let height = (parent.size.height as i32 - offset.y).max(0) as u32 / self.scale;
        Rectangle::new(Point::zero(), Size::new(width, height))
    }
}

impl<D: DrawTarget> DrawTarget for Scaled<'_, D> {
    type Color = D::Color;
    type Error = D::Error;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            let block = self.block(point);
            self.parent.fill_solid(&block, color)?;
        }
        Ok(())
    }
}
