use crate::geometry::Coordinate;
use crate::layout::{PlacementEngine, PlacementKind};
use crate::rasterizer::TextStyle;
use anyhow::Result;
use std::path::Path;

/// One `<text>` per painted label, at the origin its glyph was committed
/// with. Only lines up with the layout when the same fonts rasterized it.
pub fn render_svg(engine: &PlacementEngine) -> String {
    let config = engine.config();
    let fill = hex_color(config.render.text_color);
    let mut svg = svg_open(engine);
    for label in engine.labels() {
        let Some(placement) = label.placement() else {
            continue;
        };
        if placement.kind == PlacementKind::Empty {
            continue;
        }
        svg.push_str(&text_element(
            label.text(),
            &label.style(&config.font),
            placement.origin,
            &fill,
            None,
        ));
    }
    svg.push_str("</svg>");
    svg
}

/// The final surface traced as one `<rect>` per row run of equal opacity.
pub fn render_mask_svg(engine: &PlacementEngine) -> String {
    let fill = hex_color(engine.config().render.text_color);
    let raster = engine.final_surface().raster();
    let mut svg = svg_open(engine);
    svg.push_str(&format!("<g fill=\"{fill}\" shape-rendering=\"crispEdges\">"));
    for y in 0..raster.height() {
        let mut x = 0;
        while x < raster.width() {
            let alpha = raster.opacity(x, y);
            let start = x;
            while x < raster.width() && raster.opacity(x, y) == alpha {
                x += 1;
            }
            if alpha == 0 {
                continue;
            }
            let opacity = if alpha == u8::MAX {
                String::new()
            } else {
                format!(" fill-opacity=\"{:.3}\"", alpha as f32 / 255.0)
            };
            svg.push_str(&format!(
                "<rect x=\"{start}\" y=\"{y}\" width=\"{}\" height=\"1\"{opacity}/>",
                x - start
            ));
        }
    }
    svg.push_str("</g></svg>");
    svg
}

fn svg_open(engine: &PlacementEngine) -> String {
    let width = engine.final_surface().width();
    let height = engine.final_surface().height();
    let mut svg = format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    );
    if let Some(background) = engine.config().render.background {
        svg.push_str(&format!(
            "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
            hex_color(background)
        ));
    }
    svg
}

/// `<text>` whose top edge sits on `origin`.
fn text_element(
    text: &str,
    style: &TextStyle,
    origin: Coordinate,
    fill: &str,
    filter: Option<&str>,
) -> String {
    let filter = filter
        .map(|id| format!(" filter=\"url(#{id})\""))
        .unwrap_or_default();
    format!(
        "<text x=\"{:.2}\" y=\"{:.2}\" dominant-baseline=\"text-before-edge\" xml:space=\"preserve\" font-family=\"{}\" font-size=\"{}\" font-weight=\"{}\" fill=\"{}\"{}>{}</text>",
        origin.x,
        origin.y,
        escape_xml(&style.font_family),
        style.font_size,
        style.font_weight,
        fill,
        filter,
        escape_xml(text)
    )
}

fn hex_color([r, g, b]: [u8; 3]) -> String {
    format!("#{r:02x}{g:02x}{b:02x}")
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

/// Colour an opacity mask with the text colour and save it as PNG.
#[cfg(feature = "font")]
pub fn write_output_png(
    raster: &crate::raster::Raster,
    output: &Path,
    render_cfg: &crate::config::RenderConfig,
) -> Result<()> {
    let mut pixmap = resvg::tiny_skia::Pixmap::new(raster.width(), raster.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;
    for (pixel, alpha) in pixmap.data_mut().chunks_exact_mut(4).zip(raster.alpha()) {
        pixel.copy_from_slice(&shade(*alpha, render_cfg));
    }
    pixmap.save_png(output)?;
    Ok(())
}

/// Premultiplied RGBA for one mask pixel.
#[cfg(feature = "font")]
fn shade(alpha: u8, render_cfg: &crate::config::RenderConfig) -> [u8; 4] {
    let a = alpha as u32;
    let mix = |fg: u8, bg: u32| ((fg as u32 * a + bg * (255 - a) + 127) / 255) as u8;
    let [r, g, b] = render_cfg.text_color;
    match render_cfg.background {
        Some([br, bg, bb]) => [mix(r, br as u32), mix(g, bg as u32), mix(b, bb as u32), 255],
        None => [mix(r, 0), mix(g, 0), mix(b, 0), alpha],
    }
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(feature = "font")]
pub use font::FontRasterizer;

#[cfg(feature = "font")]
mod font {
    use super::text_element;
    use crate::error::{Error, Result};
    use crate::raster::Raster;
    use crate::rasterizer::{TextRasterizer, TextRequest, TextStyle};
    use crate::text_metrics::{TextMeasurer, resolve_generic_families};
    use std::sync::Arc;

    const HALO_FILTER: &str = "halo";

    /// Renders text through `usvg`/`resvg` using installed fonts.
    pub struct FontRasterizer {
        options: usvg::Options<'static>,
        measurer: TextMeasurer,
    }

    impl Default for FontRasterizer {
        fn default() -> Self {
            Self::new()
        }
    }

    impl FontRasterizer {
        pub fn new() -> Self {
            let mut db = fontdb::Database::new();
            db.load_system_fonts();
            Self::with_database(db)
        }

        /// Render and measure with `db` only. Generic families are pointed
        /// at installed faces first.
        pub fn with_database(mut db: fontdb::Database) -> Self {
            resolve_generic_families(&mut db);
            let db = Arc::new(db);
            let options = usvg::Options {
                fontdb: Arc::clone(&db),
                ..usvg::Options::default()
            };
            Self {
                options,
                measurer: TextMeasurer::with_database(db),
            }
        }
    }

    impl TextRasterizer for FontRasterizer {
        fn measure_width(&mut self, text: &str, style: &TextStyle) -> f32 {
            self.measurer.measure(text, style)
        }

        fn rasterize(&mut self, request: &TextRequest<'_>, width: u32, height: u32) -> Result<Raster> {
            let svg = text_document(request, width, height);
            let tree = usvg::Tree::from_str(&svg, &self.options)
                .map_err(|err| Error::Rasterize(format!("{:?}: {err}", request.text)))?;
            let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
                .ok_or_else(|| Error::Rasterize(format!("cannot allocate {width}x{height} pixmap")))?;
            resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap.as_mut());
            let alpha = pixmap.data().chunks_exact(4).map(|pixel| pixel[3]).collect();
            Raster::from_alpha(width, height, alpha)
        }
    }

    /// Standalone SVG holding one text element. A blur request adds a filter
    /// that merges a Gaussian blur of the text's alpha under the text itself.
    pub(super) fn text_document(request: &TextRequest<'_>, width: u32, height: u32) -> String {
        let mut svg = format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
        );
        let blur = request.blur_radius.filter(|radius| *radius > 0.0);
        if let Some(radius) = blur {
            svg.push_str(&format!(
                "<defs><filter id=\"{HALO_FILTER}\" filterUnits=\"userSpaceOnUse\" x=\"0\" y=\"0\" width=\"{width}\" height=\"{height}\"><feGaussianBlur in=\"SourceAlpha\" stdDeviation=\"{}\"/><feMerge><feMergeNode/><feMergeNode in=\"SourceGraphic\"/></feMerge></filter></defs>",
                radius / 2.0
            ));
        }
        svg.push_str(&text_element(
            request.text,
            request.style,
            request.origin,
            "#000000",
            blur.map(|_| HALO_FILTER),
        ));
        svg.push_str("</svg>");
        svg
    }

}
