use crate::layout::{PlacementEngine, PlacementKind};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDump {
    pub width: u32,
    pub height: u32,
    pub labels: Vec<LabelDump>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelDump {
    pub text: String,
    pub weight: u32,
    pub font_size: f32,
    /// `None` for labels the last pass did not reach.
    pub kind: Option<PlacementKind>,
    pub center: Option<[f32; 2]>,
    pub top_left: Option<[f32; 2]>,
    pub origin: Option<[f32; 2]>,
    pub glyph_width: u32,
    pub glyph_height: u32,
}

impl LayoutDump {
    pub fn from_engine(engine: &PlacementEngine) -> Self {
        let labels = engine
            .labels()
            .into_iter()
            .map(|label| {
                let placement = label.placement();
                let (glyph_width, glyph_height) = label
                    .glyph()
                    .map(|glyph| (glyph.width(), glyph.height()))
                    .unwrap_or((0, 0));
                LabelDump {
                    text: label.text().to_string(),
                    weight: label.weight(),
                    font_size: label.font_size(),
                    kind: placement.map(|p| p.kind),
                    center: placement.map(|p| [p.center.x, p.center.y]),
                    top_left: placement.map(|p| [p.top_left.x, p.top_left.y]),
                    origin: placement.map(|p| [p.origin.x, p.origin.y]),
                    glyph_width,
                    glyph_height,
                }
            })
            .collect();

        LayoutDump {
            width: engine.final_surface().width(),
            height: engine.final_surface().height(),
            labels,
        }
    }

    pub fn fallback_count(&self) -> usize {
        self.labels
            .iter()
            .filter(|label| label.kind == Some(PlacementKind::Fallback))
            .count()
    }
}

pub fn write_layout_dump(path: &Path, engine: &PlacementEngine) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_engine(engine);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}
