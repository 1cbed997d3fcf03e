use crate::error::Result;
use crate::geometry::Coordinate;
use crate::raster::Raster;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub font_family: String,
    pub font_weight: u16,
    pub font_size: f32,
}

impl TextStyle {
    pub fn new(font_family: impl Into<String>, font_weight: u16, font_size: f32) -> Self {
        Self {
            font_family: font_family.into(),
            font_weight,
            font_size,
        }
    }
}

/// One piece of text to rasterize. The text's top-left corner (a "top"
/// text baseline) lands on `origin`.
#[derive(Debug, Clone, Copy)]
pub struct TextRequest<'a> {
    pub text: &'a str,
    pub style: &'a TextStyle,
    pub origin: Coordinate,
    pub blur_radius: Option<f32>,
}

pub trait TextRasterizer {
    /// Advance width of `text` in pixels.
    fn measure_width(&mut self, text: &str, style: &TextStyle) -> f32;

    /// Render `request` into a transparent `width × height` raster.
    fn rasterize(&mut self, request: &TextRequest<'_>, width: u32, height: u32) -> Result<Raster>;
}

const BLOCK_ADVANCE: f32 = 0.6;
const BLOCK_INK: f32 = 0.5;
const BLOCK_TOP: f32 = 0.15;
const BLOCK_HEIGHT: f32 = 0.7;

/// Font-free rasterizer that draws every visible character as a solid block.
///
/// Output depends only on character counts and font size, which makes it
/// useful for tests and for hosts without any installed fonts.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockRasterizer;

impl BlockRasterizer {
    pub fn new() -> Self {
        Self
    }
}

impl TextRasterizer for BlockRasterizer {
    fn measure_width(&mut self, text: &str, style: &TextStyle) -> f32 {
        text.chars().count() as f32 * style.font_size * BLOCK_ADVANCE
    }

    fn rasterize(&mut self, request: &TextRequest<'_>, width: u32, height: u32) -> Result<Raster> {
        let mut raster = Raster::new(width, height);
        let size = request.style.font_size.max(0.0);
        let advance = size * BLOCK_ADVANCE;
        let ink = (size * BLOCK_INK).max(1.0);
        let top = request.origin.y + size * BLOCK_TOP;
        let bottom = top + (size * BLOCK_HEIGHT).max(1.0);

        let mut pen_x = request.origin.x;
        for ch in request.text.chars() {
            if !ch.is_whitespace() {
                fill_rect(&mut raster, pen_x, top, pen_x + ink, bottom);
            }
            pen_x += advance;
        }

        Ok(match request.blur_radius {
            Some(radius) => raster.blurred(radius),
            None => raster,
        })
    }
}

fn fill_rect(raster: &mut Raster, x0: f32, y0: f32, x1: f32, y1: f32) {
    let clamp = |v: f32, max: u32| v.round().clamp(0.0, max as f32) as u32;
    let (x0, x1) = (clamp(x0, raster.width()), clamp(x1, raster.width()));
    let (y0, y1) = (clamp(y0, raster.height()), clamp(y1, raster.height()));
    for y in y0..y1 {
        for x in x0..x1 {
            raster.set_opacity(x, y, 255);
        }
    }
}
