use crate::error::{Error, Result};
use crate::geometry::DistanceBias;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            width: 350,
            height: 250,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontConfig {
    pub family: String,
    pub weight: u16,
    pub base_size: f32,
    pub size_per_weight: f32,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            family: "sans-serif".to_string(),
            weight: 400,
            base_size: 10.0,
            size_per_weight: 3.0,
        }
    }
}

impl FontConfig {
    pub fn font_size(&self, weight: u32) -> f32 {
        self.base_size + self.size_per_weight * weight as f32
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementConfig {
    pub candidate_stride: usize,
    pub glyph_sample_stride: usize,
    pub bbox_sample_stride: u32,
    /// Halo drawn around labels on the draft surface.
    pub blur_radius: f32,
    pub distance_bias: DistanceBias,
    /// Minimum size of the scratch surface glyphs are rendered on.
    pub scratch_width: u32,
    pub scratch_height: u32,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            candidate_stride: 3,
            glyph_sample_stride: 3,
            bbox_sample_stride: 1,
            blur_radius: 8.0,
            distance_bias: DistanceBias::default(),
            scratch_width: 600,
            scratch_height: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub text_color: [u8; 3],
    /// Transparent when unset.
    pub background: Option<[u8; 3]>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            text_color: [0, 0, 0],
            background: Some([255, 255, 255]),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub surface: SurfaceConfig,
    pub font: FontConfig,
    pub placement: PlacementConfig,
    pub render: RenderConfig,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.surface.width == 0 || self.surface.height == 0 {
            return Err(Error::InvalidConfig(format!(
                "surface must be non-empty, got {}x{}",
                self.surface.width, self.surface.height
            )));
        }
        if self.placement.candidate_stride == 0 {
            return Err(Error::InvalidConfig("candidateStride must be at least 1".into()));
        }
        if self.placement.glyph_sample_stride == 0 {
            return Err(Error::InvalidConfig(
                "glyphSampleStride must be at least 1".into(),
            ));
        }
        if self.placement.bbox_sample_stride == 0 {
            return Err(Error::InvalidConfig("bboxSampleStride must be at least 1".into()));
        }
        let finite = [
            ("baseFontSize", self.font.base_size),
            ("fontSizeWeightMultiplier", self.font.size_per_weight),
            ("blurRadius", self.placement.blur_radius),
            ("horizontalDistanceBias", self.placement.distance_bias.horizontal),
            ("verticalDistanceBias", self.placement.distance_bias.vertical),
        ];
        for (name, value) in finite {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be a finite, non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    surface_width: Option<u32>,
    surface_height: Option<u32>,
    base_font_size: Option<f32>,
    font_size_weight_multiplier: Option<f32>,
    font_family: Option<String>,
    font_weight: Option<u16>,
    candidate_stride: Option<usize>,
    glyph_sample_stride: Option<usize>,
    bbox_sample_stride: Option<u32>,
    blur_radius: Option<f32>,
    horizontal_distance_bias: Option<f32>,
    vertical_distance_bias: Option<f32>,
    scratch_width: Option<u32>,
    scratch_height: Option<u32>,
    text_color: Option<String>,
    background: Option<String>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Overlay a JSON5 document of flat camelCase keys onto the defaults.
pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let parsed: ConfigFile = json5::from_str(contents)?;
    let mut config = Config::default();

    if let Some(v) = parsed.surface_width {
        config.surface.width = v;
    }
    if let Some(v) = parsed.surface_height {
        config.surface.height = v;
    }
    if let Some(v) = parsed.base_font_size {
        config.font.base_size = v;
    }
    if let Some(v) = parsed.font_size_weight_multiplier {
        config.font.size_per_weight = v;
    }
    if let Some(v) = parsed.font_family {
        config.font.family = v;
    }
    if let Some(v) = parsed.font_weight {
        config.font.weight = v;
    }
    if let Some(v) = parsed.candidate_stride {
        config.placement.candidate_stride = v;
    }
    if let Some(v) = parsed.glyph_sample_stride {
        config.placement.glyph_sample_stride = v;
    }
    if let Some(v) = parsed.bbox_sample_stride {
        config.placement.bbox_sample_stride = v;
    }
    if let Some(v) = parsed.blur_radius {
        config.placement.blur_radius = v;
    }
    if let Some(v) = parsed.horizontal_distance_bias {
        config.placement.distance_bias.horizontal = v;
    }
    if let Some(v) = parsed.vertical_distance_bias {
        config.placement.distance_bias.vertical = v;
    }
    if let Some(v) = parsed.scratch_width {
        config.placement.scratch_width = v;
    }
    if let Some(v) = parsed.scratch_height {
        config.placement.scratch_height = v;
    }
    if let Some(v) = parsed.text_color {
        config.render.text_color = parse_hex_color(&v)?;
    }
    if let Some(v) = parsed.background {
        config.render.background = if v.eq_ignore_ascii_case("transparent") || v.is_empty() {
            None
        } else {
            Some(parse_hex_color(&v)?)
        };
    }

    config.validate()?;
    Ok(config)
}

/// Parse `#rgb` or `#rrggbb`.
pub fn parse_hex_color(value: &str) -> anyhow::Result<[u8; 3]> {
    let hex = value.trim().trim_start_matches('#');
    if !hex.is_ascii() {
        anyhow::bail!("invalid color {value:?}");
    }
    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 => hex.to_string(),
        _ => anyhow::bail!("unsupported color {value:?}, expected #rgb or #rrggbb"),
    };
    let mut rgb = [0u8; 3];
    for (i, channel) in rgb.iter_mut().enumerate() {
        *channel = u8::from_str_radix(&expanded[i * 2..i * 2 + 2], 16)
            .map_err(|_| anyhow::anyhow!("invalid color {value:?}"))?;
    }
    Ok(rgb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!((config.surface.width, config.surface.height), (350, 250));
        assert_eq!(config.font.font_size(13), 49.0);
        assert_eq!(config.placement.candidate_stride, 3);
        assert_eq!(config.placement.glyph_sample_stride, 3);
        assert_eq!(config.placement.blur_radius, 8.0);
        assert_eq!(config.placement.distance_bias.vertical, 1.5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn json5_overrides_defaults() {
        let config = parse_config(
            r##"{
                // comments are fine
                surfaceWidth: 500,
                candidateStride: 1,
                verticalDistanceBias: 2.0,
                fontFamily: "Inter",
                textColor: "#336699",
                background: "transparent",
            }"##,
        )
        .unwrap();
        assert_eq!(config.surface.width, 500);
        assert_eq!(config.surface.height, 250);
        assert_eq!(config.placement.candidate_stride, 1);
        assert_eq!(config.placement.distance_bias.vertical, 2.0);
        assert_eq!(config.font.family, "Inter");
        assert_eq!(config.render.text_color, [0x33, 0x66, 0x99]);
        assert_eq!(config.render.background, None);
    }

    #[test]
    fn zero_stride_is_rejected() {
        let err = parse_config("{ glyphSampleStride: 0 }").unwrap_err();
        assert!(err.to_string().contains("glyphSampleStride"));
    }

    #[test]
    fn negative_blur_is_rejected() {
        let mut config = Config::default();
        config.placement.blur_radius = -1.0;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn short_hex_colors_expand() {
        assert_eq!(parse_hex_color("#fff").unwrap(), [255, 255, 255]);
        assert!(parse_hex_color("#12").is_err());
        assert!(parse_hex_color("#zzzzzz").is_err());
    }
}
