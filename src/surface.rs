use crate::error::{Error, Result};
use crate::geometry::Coordinate;
use crate::raster::Raster;
use crate::rasterizer::{TextRasterizer, TextRequest};

#[derive(Debug, Clone)]
pub struct Surface {
    raster: Raster,
}

impl Surface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            raster: Raster::new(width, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.raster.width()
    }

    pub fn height(&self) -> u32 {
        self.raster.height()
    }

    pub fn center(&self) -> Coordinate {
        Coordinate::new(self.width() as f32 / 2.0, self.height() as f32 / 2.0).floor()
    }

    pub fn raster(&self) -> &Raster {
        &self.raster
    }

    pub fn clear(&mut self) {
        self.raster.clear();
    }

    /// Opacity at a signed pixel position; `None` off the surface.
    pub fn opacity_at(&self, x: i32, y: i32) -> Option<u8> {
        if x < 0 || y < 0 || x >= self.width() as i32 || y >= self.height() as i32 {
            return None;
        }
        Some(self.raster.opacity(x as u32, y as u32))
    }

    pub fn draw_raster(&mut self, raster: &Raster, top_left: Coordinate) {
        let (x, y) = top_left.to_pixel();
        self.raster.composite(raster, x, y);
    }

    pub fn draw_text(
        &mut self,
        rasterizer: &mut dyn TextRasterizer,
        request: &TextRequest<'_>,
    ) -> Result<()> {
        let rendered = rasterizer.rasterize(request, self.width(), self.height())?;
        if rendered.width() != self.width() || rendered.height() != self.height() {
            return Err(Error::RasterSize {
                expected: self.width() as usize * self.height() as usize,
                actual: rendered.width() as usize * rendered.height() as usize,
            });
        }
        self.raster.composite(&rendered, 0, 0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::{BlockRasterizer, TextStyle};

    #[test]
    fn opacity_outside_is_none() {
        let surface = Surface::new(10, 5);
        assert_eq!(surface.opacity_at(0, 0), Some(0));
        assert_eq!(surface.opacity_at(-1, 0), None);
        assert_eq!(surface.opacity_at(10, 0), None);
        assert_eq!(surface.opacity_at(0, 5), None);
    }

    #[test]
    fn draw_then_clear() {
        let mut surface = Surface::new(20, 20);
        let mut stamp = Raster::new(3, 3);
        stamp.set_opacity(1, 1, 255);
        surface.draw_raster(&stamp, Coordinate::new(4.7, 5.2));
        assert_eq!(surface.opacity_at(5, 6), Some(255));
        surface.clear();
        assert!(surface.raster().is_blank());
    }

    #[test]
    fn draw_text_accumulates() {
        let mut surface = Surface::new(120, 60);
        let mut rasterizer = BlockRasterizer::new();
        let style = TextStyle::new("sans-serif", 400, 20.0);
        let first = TextRequest {
            text: "a",
            style: &style,
            origin: Coordinate::new(0.0, 0.0),
            blur_radius: None,
        };
        let second = TextRequest {
            origin: Coordinate::new(60.0, 20.0),
            ..first
        };
        surface.draw_text(&mut rasterizer, &first).unwrap();
        surface.draw_text(&mut rasterizer, &second).unwrap();
        assert_eq!(surface.opacity_at(5, 10), Some(255));
        assert_eq!(surface.opacity_at(65, 30), Some(255));
        assert_eq!(surface.opacity_at(40, 10), Some(0));
    }

    #[test]
    fn center_is_floored() {
        assert_eq!(Surface::new(351, 251).center(), Coordinate::new(175.0, 125.0));
    }
}
