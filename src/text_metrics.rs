use crate::rasterizer::TextStyle;
use fontdb::{Database, FaceInfo, Family, Query, Stretch, Style, Weight};
use std::collections::HashMap;
use std::sync::Arc;
use ttf_parser::Face;

/// Advance width of a character the face cannot supply, per pixel of size.
const FALLBACK_ADVANCE: f32 = 0.56;

/// Resolves font families against a font database and measures advance
/// widths. Faces are loaded once per family and weight.
pub struct TextMeasurer {
    db: Arc<Database>,
    faces: HashMap<(String, u16), Option<FontFace>>,
}

impl TextMeasurer {
    /// Measure against the faces in `db`; nothing else is loaded.
    pub fn with_database(db: impl Into<Arc<Database>>) -> Self {
        Self {
            db: db.into(),
            faces: HashMap::new(),
        }
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    pub fn measure(&mut self, text: &str, style: &TextStyle) -> f32 {
        if text.is_empty() || style.font_size <= 0.0 {
            return 0.0;
        }
        let key = (normalize_family_key(&style.font_family), style.font_weight);
        if !self.faces.contains_key(&key) {
            let face = self.load_face(&key.0, key.1);
            if face.is_none() {
                log::warn!(
                    "no font found for {:?}, using fallback advances",
                    style.font_family
                );
            }
            self.faces.insert(key.clone(), face);
        }
        let normalized = text.replace('\t', "    ");
        match self.faces.get_mut(&key).and_then(Option::as_mut) {
            Some(face) => face.measure_width(&normalized, style.font_size),
            None => normalized.chars().count() as f32 * style.font_size * FALLBACK_ADVANCE,
        }
    }

    fn load_face(&self, font_family: &str, weight: u16) -> Option<FontFace> {
        let names = parse_family_list(font_family);
        let families: Vec<Family<'_>> = names.iter().map(FamilyName::as_family).collect();

        let query = Query {
            families: &families,
            weight: Weight(weight),
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        let id = self.db.query(&query)?;
        self.db
            .with_face_data(id, |data, index| FontFace::parse(data.to_vec(), index))
            .flatten()
    }
}

/// Point every generic family whose default face is not installed at one
/// that is.
pub fn resolve_generic_families(db: &mut Database) {
    if db.is_empty() {
        return;
    }
    let generics = [
        Family::SansSerif,
        Family::Serif,
        Family::Monospace,
        Family::Cursive,
        Family::Fantasy,
    ];
    for generic in generics {
        if has_family(db, db.family_name(&generic)) {
            continue;
        }
        let Some(name) = substitute_family(db, generic) else {
            continue;
        };
        log::debug!("generic family {generic:?} mapped to {name:?}");
        match generic {
            Family::Serif => db.set_serif_family(name),
            Family::Monospace => db.set_monospace_family(name),
            Family::Cursive => db.set_cursive_family(name),
            Family::Fantasy => db.set_fantasy_family(name),
            Family::SansSerif | Family::Name(_) => db.set_sans_serif_family(name),
        }
    }
}

fn has_family(db: &Database, name: &str) -> bool {
    db.faces()
        .any(|face| face.families.iter().any(|(family, _)| family == name))
}

fn substitute_family(db: &Database, generic: Family<'_>) -> Option<String> {
    let preferred = match generic {
        Family::Serif => smallest_family(db, |face, name| {
            !face.monospaced && name.contains("Serif") && !name.contains("Sans")
        }),
        Family::Monospace => {
            smallest_family(db, |face, name| face.monospaced || name.contains("Mono"))
        }
        Family::Cursive | Family::Fantasy => {
            let sans = db.family_name(&Family::SansSerif);
            has_family(db, sans).then(|| sans.to_string())
        }
        Family::SansSerif | Family::Name(_) => smallest_family(db, |face, name| {
            !face.monospaced && name.contains("Sans") && !name.contains("Mono")
        }),
    };
    preferred
        .or_else(|| smallest_family(db, |face, _| !face.monospaced))
        .or_else(|| smallest_family(db, |_, _| true))
}

// Lexicographically smallest primary name, so the choice does not depend on
// font loading order.
fn smallest_family(db: &Database, accept: impl Fn(&FaceInfo, &str) -> bool) -> Option<String> {
    db.faces()
        .filter_map(|face| {
            let (name, _) = face.families.first()?;
            accept(face, name).then(|| name.clone())
        })
        .min()
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FamilyName {
    Generic(Family<'static>),
    Named(String),
}

impl FamilyName {
    fn as_family(&self) -> Family<'_> {
        match self {
            FamilyName::Generic(family) => *family,
            FamilyName::Named(name) => Family::Name(name),
        }
    }
}

/// Split a CSS-like family list, mapping generic names.
fn parse_family_list(font_family: &str) -> Vec<FamilyName> {
    let mut names: Vec<FamilyName> = font_family
        .split(',')
        .map(|part| part.trim().trim_matches('"').trim_matches('\''))
        .filter(|raw| !raw.is_empty())
        .map(|raw| match raw.to_ascii_lowercase().as_str() {
            "serif" => FamilyName::Generic(Family::Serif),
            "sans-serif" | "system-ui" | "-apple-system" | "ui-sans-serif" => {
                FamilyName::Generic(Family::SansSerif)
            }
            "monospace" | "ui-monospace" => FamilyName::Generic(Family::Monospace),
            "cursive" => FamilyName::Generic(Family::Cursive),
            "fantasy" => FamilyName::Generic(Family::Fantasy),
            _ => FamilyName::Named(raw.to_string()),
        })
        .collect();
    if names.is_empty() {
        names.push(FamilyName::Generic(Family::SansSerif));
    }
    names
}

fn normalize_family_key(font_family: &str) -> String {
    let trimmed = font_family.trim();
    if trimmed.is_empty() {
        "sans-serif".to_string()
    } else {
        trimmed.to_string()
    }
}

struct FontFace {
    data: Vec<u8>,
    index: u32,
    units_per_em: u16,
    ascii_advances: [u16; 128],
    advance_cache: HashMap<char, Option<u16>>,
}

impl FontFace {
    fn parse(data: Vec<u8>, index: u32) -> Option<Self> {
        let face = Face::parse(&data, index).ok()?;
        let units_per_em = face.units_per_em().max(1);
        let mut ascii_advances = [0u16; 128];
        for byte in 0u8..=127 {
            if let Some(glyph_id) = face.glyph_index(byte as char) {
                ascii_advances[byte as usize] = face.glyph_hor_advance(glyph_id).unwrap_or(0);
            }
        }
        Some(Self {
            data,
            index,
            units_per_em,
            ascii_advances,
            advance_cache: HashMap::new(),
        })
    }

    fn measure_width(&mut self, text: &str, font_size: f32) -> f32 {
        let scale = font_size / self.units_per_em as f32;
        let fallback = font_size * FALLBACK_ADVANCE;
        let mut width = 0.0f32;
        for ch in text.chars() {
            if ch == '\n' {
                continue;
            }
            let advance = if ch.is_ascii() {
                Some(self.ascii_advances[ch as usize]).filter(|advance| *advance > 0)
            } else {
                self.non_ascii_advance(ch)
            };
            width += match advance {
                Some(advance) => advance as f32 * scale,
                None => fallback,
            };
        }
        width.max(0.0)
    }

    fn non_ascii_advance(&mut self, ch: char) -> Option<u16> {
        if let Some(cached) = self.advance_cache.get(&ch) {
            return *cached;
        }
        let advance = Face::parse(&self.data, self.index).ok().and_then(|face| {
            face.glyph_index(ch)
                .and_then(|glyph_id| face.glyph_hor_advance(glyph_id))
        });
        self.advance_cache.insert(ch, advance);
        advance
    }
}
