mod candidates;
mod label;

pub use candidates::CandidateIndex;
pub use label::{Glyph, Label, LabelId, Placement, PlacementKind};

use crate::config::{Config, PlacementConfig};
use crate::error::{Error, Result};
use crate::geometry::Coordinate;
use crate::rasterizer::TextRasterizer;
use crate::surface::Surface;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassPlan {
    pub order: Vec<LabelId>,
    /// Labels before this index keep their previous positions.
    pub first_dirty: usize,
}

impl PassPlan {
    pub fn reused(&self) -> &[LabelId] {
        &self.order[..self.first_dirty]
    }

    pub fn to_place(&self) -> &[LabelId] {
        &self.order[self.first_dirty..]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayoutReport {
    pub placed: usize,
    pub fallback: usize,
    pub empty: usize,
    pub reused: usize,
    pub failed: usize,
}

impl LayoutReport {
    fn record(&mut self, kind: PlacementKind) {
        match kind {
            PlacementKind::Searched => self.placed += 1,
            PlacementKind::Fallback => self.fallback += 1,
            PlacementKind::Empty => self.empty += 1,
        }
    }
}

pub struct PlacementEngine {
    config: Config,
    rasterizer: Box<dyn TextRasterizer>,
    draft: Surface,
    final_surface: Surface,
    candidates: CandidateIndex,
    labels: BTreeMap<LabelId, Label>,
    next_id: u64,
    committed: Vec<LabelId>,
}

impl PlacementEngine {
    pub fn new(config: Config, rasterizer: Box<dyn TextRasterizer>) -> Result<Self> {
        config.validate()?;
        let (width, height) = (config.surface.width, config.surface.height);
        let candidates = CandidateIndex::build(width, height, config.placement.distance_bias);
        Ok(Self {
            rasterizer,
            draft: Surface::new(width, height),
            final_surface: Surface::new(width, height),
            candidates,
            labels: BTreeMap::new(),
            next_id: 0,
            committed: Vec::new(),
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn draft(&self) -> &Surface {
        &self.draft
    }

    pub fn final_surface(&self) -> &Surface {
        &self.final_surface
    }

    pub fn candidates(&self) -> &CandidateIndex {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn label(&self, id: LabelId) -> Option<&Label> {
        self.labels.get(&id)
    }

    /// Oldest label with this text.
    pub fn find(&self, text: &str) -> Option<&Label> {
        self.labels.values().find(|label| label.text() == text)
    }

    pub fn labels(&self) -> Vec<&Label> {
        self.weight_order()
            .into_iter()
            .filter_map(|id| self.labels.get(&id))
            .collect()
    }

    fn find_id(&self, text: &str) -> Option<LabelId> {
        self.find(text).map(Label::id)
    }

    fn insert(&mut self, text: &str, weight: u32) -> LabelId {
        let id = LabelId(self.next_id);
        self.next_id += 1;
        self.labels
            .insert(id, Label::new(id, text.to_string(), weight, &self.config.font));
        id
    }

    /// Add a new label, even if one with the same text already exists.
    pub fn put_label(&mut self, text: &str, weight: u32) -> Result<LabelId> {
        validate_text(text)?;
        if weight == 0 {
            return Err(Error::InsufficientInput(format!(
                "label {text:?} needs a positive weight"
            )));
        }
        Ok(self.insert(text, weight))
    }

    pub fn add_or_increment(&mut self, text: &str) -> Result<u32> {
        validate_text(text)?;
        match self.find_id(text) {
            Some(id) => {
                let weight = self.labels[&id].weight() + 1;
                self.update_weight(id, weight);
                Ok(weight)
            }
            None => {
                self.insert(text, 1);
                Ok(1)
            }
        }
    }

    pub fn remove_or_decrement(&mut self, text: &str) -> Result<u32> {
        validate_text(text)?;
        let Some(id) = self.find_id(text) else {
            log::debug!("remove for unknown label {text:?} ignored");
            return Ok(0);
        };
        let weight = self.labels[&id].weight().saturating_sub(1);
        self.update_weight(id, weight);
        Ok(weight)
    }

    /// Set the weight of `text` outright; zero removes it.
    pub fn set_weight(&mut self, text: &str, weight: u32) -> Result<u32> {
        validate_text(text)?;
        match self.find_id(text) {
            Some(id) => self.update_weight(id, weight),
            None if weight > 0 => {
                self.insert(text, weight);
            }
            None => {}
        }
        Ok(weight)
    }

    fn update_weight(&mut self, id: LabelId, weight: u32) {
        if weight == 0 {
            self.labels.remove(&id);
            return;
        }
        if let Some(label) = self.labels.get_mut(&id) {
            label.set_weight(weight, &self.config.font);
        }
    }

    fn weight_order(&self) -> Vec<LabelId> {
        let mut order: Vec<&Label> = self.labels.values().collect();
        // Stable: labels with equal weight stay in id (insertion) order.
        order.sort_by(|a, b| b.weight().cmp(&a.weight()));
        order.into_iter().map(Label::id).collect()
    }

    /// Work out the order for the next pass and how much of the previous
    /// pass survives. A full pass re-places everything.
    pub fn plan_pass(&self, full: bool) -> PassPlan {
        let order = self.weight_order();
        let first_dirty = if full {
            0
        } else {
            order
                .iter()
                .enumerate()
                .position(|(slot, id)| {
                    let label = &self.labels[id];
                    label.is_dirty()
                        || label.placement().is_none()
                        || self.committed.get(slot) != Some(id)
                })
                .unwrap_or(order.len())
        };
        PassPlan { order, first_dirty }
    }

    pub fn begin_pass(&mut self, plan: &PassPlan) {
        self.draft.clear();
        self.final_surface.clear();
        for id in plan.reused() {
            let Some(label) = self.labels.get(id) else {
                continue;
            };
            if let (Some(glyph), Some(placement)) = (label.glyph(), label.placement()) {
                paint(&mut self.draft, &mut self.final_surface, glyph, placement);
            }
        }
        for id in plan.to_place() {
            if let Some(label) = self.labels.get_mut(id) {
                label.unplace();
            }
        }
        self.committed = plan.order.clone();
    }

    /// `Ok(None)` when the label no longer exists.
    pub fn place(&mut self, id: LabelId) -> Result<Option<Placement>> {
        let Some(label) = self.labels.get_mut(&id) else {
            log::debug!("label {id:?} removed before placement");
            return Ok(None);
        };
        label.ensure_glyph(
            self.rasterizer.as_mut(),
            &self.config.font,
            &self.config.placement,
            &self.config.surface,
        )?;
        let Some(glyph) = label.glyph() else {
            return Ok(None);
        };

        let (center, kind) = find_position(&self.draft, &self.candidates, glyph, &self.config.placement);
        let top_left = glyph.top_left_for(center);
        let placement = Placement {
            center,
            top_left,
            origin: glyph.origin_for(top_left),
            kind,
        };
        match kind {
            PlacementKind::Searched => log::debug!(
                "placed {:?} (weight {}) at ({}, {})",
                label.text(),
                label.weight(),
                center.x,
                center.y
            ),
            PlacementKind::Fallback => log::warn!(
                "no free position for {:?} (weight {}), falling back to center",
                label.text(),
                label.weight()
            ),
            PlacementKind::Empty => {
                log::warn!("label {:?} rendered no visible pixels", label.text())
            }
        }
        paint(&mut self.draft, &mut self.final_surface, glyph, &placement);
        label.commit(placement);
        Ok(Some(placement))
    }

    pub fn run_pass(&mut self, plan: &PassPlan) -> LayoutReport {
        let mut report = LayoutReport {
            reused: plan.first_dirty,
            ..LayoutReport::default()
        };
        self.begin_pass(plan);
        for id in plan.to_place() {
            match self.place(*id) {
                Ok(Some(placement)) => report.record(placement.kind),
                Ok(None) => {}
                Err(err) => {
                    log::error!("failed to place label {id:?}: {err}");
                    report.failed += 1;
                }
            }
        }
        log::info!(
            "layout pass: {} placed, {} fallback, {} empty, {} reused, {} failed",
            report.placed,
            report.fallback,
            report.empty,
            report.reused,
            report.failed
        );
        report
    }

    pub fn layout(&mut self) -> LayoutReport {
        let plan = self.plan_pass(true);
        self.run_pass(&plan)
    }

    /// Re-place only from the first label whose weight or rank changed.
    pub fn relayout(&mut self) -> LayoutReport {
        let plan = self.plan_pass(false);
        self.run_pass(&plan)
    }

    /// Switch to a new surface size. Glyphs are kept unless they were cut
    /// off for the old size; every position is invalidated.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidConfig(format!(
                "surface must be non-empty, got {width}x{height}"
            )));
        }
        self.config.surface.width = width;
        self.config.surface.height = height;
        self.draft = Surface::new(width, height);
        self.final_surface = Surface::new(width, height);
        if !self.candidates.matches(width, height) {
            self.candidates =
                CandidateIndex::build(width, height, self.config.placement.distance_bias);
        }
        for label in self.labels.values_mut() {
            label.drop_oversized_glyph();
            label.unplace();
        }
        self.committed.clear();
        Ok(())
    }
}

fn validate_text(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(Error::InsufficientInput("label text is empty".into()));
    }
    Ok(())
}

fn paint(draft: &mut Surface, final_surface: &mut Surface, glyph: &Glyph, placement: &Placement) {
    if placement.kind == PlacementKind::Empty {
        return;
    }
    draft.draw_raster(glyph.halo(), placement.top_left + glyph.halo_offset());
    final_surface.draw_raster(glyph.raster(), placement.top_left);
}

/// Closest-to-center candidate where the glyph fits on the surface and none
/// of its sampled pixels land on anything already drawn.
pub fn find_position(
    draft: &Surface,
    candidates: &CandidateIndex,
    glyph: &Glyph,
    config: &PlacementConfig,
) -> (Coordinate, PlacementKind) {
    if glyph.is_oversized() {
        return (draft.center(), PlacementKind::Fallback);
    }
    if glyph.is_empty() {
        return (draft.center(), PlacementKind::Empty);
    }
    candidates
        .iter_strided(config.candidate_stride)
        .find(|candidate| !collides(draft, glyph, glyph.top_left_for(*candidate)))
        .map(|candidate| (candidate, PlacementKind::Searched))
        .unwrap_or((draft.center(), PlacementKind::Fallback))
}

fn collides(draft: &Surface, glyph: &Glyph, top_left: Coordinate) -> bool {
    let (x0, y0) = top_left.to_pixel();
    if x0 < 0
        || y0 < 0
        || x0 + glyph.width() as i32 > draft.width() as i32
        || y0 + glyph.height() as i32 > draft.height() as i32
    {
        return true;
    }
    glyph.probes().iter().any(|(px, py)| {
        draft
            .opacity_at(x0 + *px as i32, y0 + *py as i32)
            .is_none_or(|alpha| alpha > 0)
    })
}
