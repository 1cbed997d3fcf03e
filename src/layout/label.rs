use crate::config::{FontConfig, PlacementConfig, SurfaceConfig};
use crate::error::Result;
use crate::geometry::Coordinate;
use crate::raster::{BoundingBox, Raster, blur_margin};
use crate::rasterizer::{TextRasterizer, TextRequest, TextStyle};
use crate::surface::Surface;
use serde::Serialize;

/// Insertion sequence number; breaks weight ties in favor of older labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LabelId(pub(crate) u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlacementKind {
    Searched,
    /// Every tested candidate collided; parked at the surface center and
    /// allowed to overlap.
    Fallback,
    /// The glyph has no visible pixels; parked at the center, nothing drawn.
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Placement {
    pub center: Coordinate,
    pub top_left: Coordinate,
    /// Where the text origin ends up, for vector re-rendering.
    pub origin: Coordinate,
    pub kind: PlacementKind,
}

#[derive(Debug, Clone)]
pub struct Glyph {
    raster: Raster,
    /// Crop offset relative to the text origin.
    ink_offset: Coordinate,
    halo: Raster,
    /// Halo top-left relative to the glyph's top-left.
    halo_offset: Coordinate,
    probes: Vec<(u32, u32)>,
    /// The render was cut off by the scratch limit, so the glyph cannot
    /// fit on the surface.
    oversized: bool,
}

impl Glyph {
    pub fn empty() -> Self {
        Self {
            raster: Raster::new(0, 0),
            ink_offset: Coordinate::ORIGIN,
            halo: Raster::new(0, 0),
            halo_offset: Coordinate::ORIGIN,
            probes: Vec::new(),
            oversized: false,
        }
    }

    /// Render `text` on a scratch surface and crop it to its visible extent.
    /// The blurred halo is cropped from a second render, using the same box
    /// grown by the blur margin.
    ///
    /// The scratch grows with the text but never past twice the surface
    /// size plus twice the margin. A render that reaches the edge of a
    /// capped scratch, or shows nothing on it, yields an oversized glyph.
    pub fn generate(
        text: &str,
        style: &TextStyle,
        rasterizer: &mut dyn TextRasterizer,
        config: &PlacementConfig,
        surface: &SurfaceConfig,
    ) -> Result<Glyph> {
        let margin = blur_margin(config.blur_radius);
        let pad = 2.0 * margin as f32;
        let advance = rasterizer.measure_width(text, style);
        let wanted_width = config
            .scratch_width
            .max(scratch_extent(advance + style.font_size + pad));
        let wanted_height = config
            .scratch_height
            .max(scratch_extent(style.font_size * 2.0 + pad));
        let (cap_width, cap_height) = scratch_limit(config, surface, margin);
        let width = wanted_width.min(cap_width);
        let height = wanted_height.min(cap_height);
        let capped = width < wanted_width || height < wanted_height;
        let origin = Coordinate::new(margin as f32, margin as f32);
        if capped {
            log::debug!(
                "scratch for {text:?} at {}px capped to {width}x{height}",
                style.font_size
            );
        }

        let mut scratch = Surface::new(width, height);
        let request = TextRequest {
            text,
            style,
            origin,
            blur_radius: None,
        };
        scratch.draw_text(rasterizer, &request)?;

        let Some(bbox) = BoundingBox::measure(scratch.raster(), config.bbox_sample_stride) else {
            return Ok(Glyph {
                oversized: capped,
                ..Glyph::empty()
            });
        };
        let oversized = capped && touches_edge(&bbox, config.bbox_sample_stride, width, height);
        let raster = bbox.crop(scratch.raster());

        let (halo, halo_offset) = if margin > 0 {
            let mut blurred = Surface::new(width, height);
            let request = TextRequest {
                blur_radius: Some(config.blur_radius),
                ..request
            };
            blurred.draw_text(rasterizer, &request)?;
            let halo_box = bbox.inflate(margin, width, height);
            (
                halo_box.crop(blurred.raster()),
                halo_box.start() - bbox.start(),
            )
        } else {
            (raster.clone(), Coordinate::ORIGIN)
        };

        let probes = raster.opaque_pixels(config.glyph_sample_stride);
        Ok(Glyph {
            raster,
            ink_offset: bbox.start() - origin,
            halo,
            halo_offset,
            probes,
            oversized,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty() && self.raster.is_blank()
    }

    pub fn is_oversized(&self) -> bool {
        self.oversized
    }

    pub fn raster(&self) -> &Raster {
        &self.raster
    }

    pub fn halo(&self) -> &Raster {
        &self.halo
    }

    pub fn halo_offset(&self) -> Coordinate {
        self.halo_offset
    }

    pub fn width(&self) -> u32 {
        self.raster.width()
    }

    pub fn height(&self) -> u32 {
        self.raster.height()
    }

    /// Sampled opaque pixels, relative to the glyph's top-left.
    pub fn probes(&self) -> &[(u32, u32)] {
        &self.probes
    }

    pub fn top_left_for(&self, center: Coordinate) -> Coordinate {
        let half = Coordinate::new(self.width() as f32 / 2.0, self.height() as f32 / 2.0);
        (center - half).floor()
    }

    pub fn origin_for(&self, top_left: Coordinate) -> Coordinate {
        top_left - self.ink_offset
    }
}

fn scratch_extent(length: f32) -> u32 {
    if length.is_finite() {
        length.ceil().clamp(0.0, u32::MAX as f32) as u32
    } else {
        u32::MAX
    }
}

fn scratch_limit(config: &PlacementConfig, surface: &SurfaceConfig, margin: u32) -> (u32, u32) {
    let limit = |extent: u32, floor: u32| {
        extent
            .saturating_mul(2)
            .saturating_add(margin.saturating_mul(2))
            .max(floor)
    };
    (
        limit(surface.width, config.scratch_width),
        limit(surface.height, config.scratch_height),
    )
}

fn touches_edge(bbox: &BoundingBox, stride: u32, width: u32, height: u32) -> bool {
    let stride = stride.max(1);
    bbox.min_x == 0
        || bbox.min_y == 0
        || bbox.max_x.saturating_add(stride) >= width
        || bbox.max_y.saturating_add(stride) >= height
}

#[derive(Debug, Clone)]
pub struct Label {
    id: LabelId,
    text: String,
    weight: u32,
    font_size: f32,
    glyph: Option<Glyph>,
    placement: Option<Placement>,
    dirty: bool,
}

impl Label {
    pub(crate) fn new(id: LabelId, text: String, weight: u32, font: &FontConfig) -> Self {
        Self {
            id,
            text,
            weight,
            font_size: font.font_size(weight),
            glyph: None,
            placement: None,
            dirty: true,
        }
    }

    pub fn id(&self) -> LabelId {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }

    pub fn font_size(&self) -> f32 {
        self.font_size
    }

    pub fn glyph(&self) -> Option<&Glyph> {
        self.glyph.as_ref()
    }

    pub fn placement(&self) -> Option<&Placement> {
        self.placement.as_ref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn style(&self, font: &FontConfig) -> TextStyle {
        TextStyle::new(font.family.clone(), font.weight, self.font_size)
    }

    pub(crate) fn set_weight(&mut self, weight: u32, font: &FontConfig) {
        if weight == self.weight {
            return;
        }
        self.weight = weight;
        self.font_size = font.font_size(weight);
        self.glyph = None;
        self.dirty = true;
    }

    pub(crate) fn ensure_glyph(
        &mut self,
        rasterizer: &mut dyn TextRasterizer,
        font: &FontConfig,
        config: &PlacementConfig,
        surface: &SurfaceConfig,
    ) -> Result<()> {
        if self.glyph.is_none() {
            let style = self.style(font);
            self.glyph = Some(Glyph::generate(
                &self.text, &style, rasterizer, config, surface,
            )?);
        }
        Ok(())
    }

    /// Forget a glyph that was cut off by the scratch limit of a smaller
    /// surface.
    pub(crate) fn drop_oversized_glyph(&mut self) {
        if self.glyph.as_ref().is_some_and(Glyph::is_oversized) {
            self.glyph = None;
        }
    }

    pub(crate) fn commit(&mut self, placement: Placement) {
        self.placement = Some(placement);
        self.dirty = false;
    }

    pub(crate) fn unplace(&mut self) {
        self.placement = None;
    }
}
