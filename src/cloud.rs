use crate::config::Config;
use crate::error::{Error, Result};
use crate::layout::{LayoutReport, PlacementEngine};
use crate::rasterizer::TextRasterizer;
use crate::scheduler::DeferredQueue;

/// Every operation returns the label's weight after the update, zero
/// meaning it is gone.
pub trait LabelSource {
    fn upsert(&mut self, text: &str) -> Result<u32>;
    fn remove(&mut self, text: &str) -> Result<u32>;
    fn set_weight(&mut self, text: &str, weight: u32) -> Result<u32>;
}

impl LabelSource for PlacementEngine {
    fn upsert(&mut self, text: &str) -> Result<u32> {
        self.add_or_increment(text)
    }

    fn remove(&mut self, text: &str) -> Result<u32> {
        self.remove_or_decrement(text)
    }

    fn set_weight(&mut self, text: &str, weight: u32) -> Result<u32> {
        PlacementEngine::set_weight(self, text, weight)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelEvent {
    Upsert(String),
    Remove(String),
    Set(String, u32),
}

impl LabelEvent {
    /// `word` and `+word` add or increment, `-word` removes or decrements,
    /// `word 7` sets an explicit weight. A bare line whose last token is a
    /// number always reads as a weight, so `route 66` sets "route" to 66;
    /// write `+route 66` to add the label as written. Blank lines and `#`
    /// comments yield `None`.
    pub fn parse_line(line: &str) -> Result<Option<LabelEvent>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }
        if let Some(rest) = line.strip_prefix('-') {
            return Ok(Some(LabelEvent::Remove(event_text(rest)?)));
        }
        if let Some(rest) = line.strip_prefix('+') {
            return Ok(Some(LabelEvent::Upsert(event_text(rest)?)));
        }
        if let Some((text, weight)) = line.rsplit_once(char::is_whitespace)
            && let Ok(weight) = weight.parse::<u32>()
        {
            return Ok(Some(LabelEvent::Set(event_text(text)?, weight)));
        }
        Ok(Some(LabelEvent::Upsert(line.to_string())))
    }

    pub fn text(&self) -> &str {
        match self {
            LabelEvent::Upsert(text) | LabelEvent::Remove(text) | LabelEvent::Set(text, _) => text,
        }
    }

    pub fn apply<S: LabelSource + ?Sized>(self, source: &mut S) -> Result<u32> {
        match self {
            LabelEvent::Upsert(text) => source.upsert(&text),
            LabelEvent::Remove(text) => source.remove(&text),
            LabelEvent::Set(text, weight) => source.set_weight(&text, weight),
        }
    }
}

fn event_text(raw: &str) -> Result<String> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(Error::InsufficientInput(format!(
            "event {raw:?} names no label"
        )));
    }
    Ok(text.to_string())
}

/// A placement engine plus a cooperative queue for running passes one
/// label at a time.
pub struct WordCloud {
    engine: PlacementEngine,
    queue: DeferredQueue<PlacementEngine>,
}

impl WordCloud {
    pub fn new(config: Config, rasterizer: Box<dyn TextRasterizer>) -> Result<Self> {
        Ok(Self {
            engine: PlacementEngine::new(config, rasterizer)?,
            queue: DeferredQueue::new(),
        })
    }

    pub fn engine(&self) -> &PlacementEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut PlacementEngine {
        &mut self.engine
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn is_idle(&self) -> bool {
        self.queue.is_idle()
    }

    pub fn schedule_layout(&mut self) {
        self.schedule_pass(true);
    }

    /// Queue a pass that keeps the unchanged prefix of the last one.
    pub fn schedule_relayout(&mut self) {
        self.schedule_pass(false);
    }

    /// The plan is fixed now. Labels removed before their unit runs are
    /// skipped; labels added meanwhile wait for the next pass.
    fn schedule_pass(&mut self, full: bool) {
        let plan = self.engine.plan_pass(full);
        let ids = plan.to_place().to_vec();
        log::debug!(
            "scheduling pass: {} reused, {} to place",
            plan.first_dirty,
            ids.len()
        );
        self.queue.push(move |engine: &mut PlacementEngine| engine.begin_pass(&plan));
        for id in ids {
            self.queue.push(move |engine: &mut PlacementEngine| {
                if let Err(err) = engine.place(id) {
                    log::error!("failed to place label {id:?}: {err}");
                }
            });
        }
    }

    /// Run a single queued unit. Returns `false` when there was none.
    pub fn tick(&mut self) -> bool {
        self.queue.run_next(&mut self.engine)
    }

    pub fn run_until_idle(&mut self) -> usize {
        self.queue.drain(&mut self.engine)
    }

    /// Finish queued work, then run a full pass synchronously.
    pub fn layout(&mut self) -> LayoutReport {
        self.run_until_idle();
        self.engine.layout()
    }

    /// Finish queued work, then run an incremental pass synchronously.
    pub fn relayout(&mut self) -> LayoutReport {
        self.run_until_idle();
        self.engine.relayout()
    }
}

impl LabelSource for WordCloud {
    fn upsert(&mut self, text: &str) -> Result<u32> {
        self.engine.upsert(text)
    }

    fn remove(&mut self, text: &str) -> Result<u32> {
        LabelSource::remove(&mut self.engine, text)
    }

    fn set_weight(&mut self, text: &str, weight: u32) -> Result<u32> {
        LabelSource::set_weight(&mut self.engine, text, weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::BlockRasterizer;

    fn cloud() -> WordCloud {
        WordCloud::new(Config::default(), Box::new(BlockRasterizer::new())).unwrap()
    }

    #[test]
    fn parses_event_lines() {
        assert_eq!(LabelEvent::parse_line("  ").unwrap(), None);
        assert_eq!(LabelEvent::parse_line("# note").unwrap(), None);
        assert_eq!(
            LabelEvent::parse_line("fire").unwrap(),
            Some(LabelEvent::Upsert("fire".into()))
        );
        assert_eq!(
            LabelEvent::parse_line("+ fire").unwrap(),
            Some(LabelEvent::Upsert("fire".into()))
        );
        assert_eq!(
            LabelEvent::parse_line("-fire").unwrap(),
            Some(LabelEvent::Remove("fire".into()))
        );
        assert_eq!(
            LabelEvent::parse_line("forest fire 7").unwrap(),
            Some(LabelEvent::Set("forest fire".into(), 7))
        );
        assert_eq!(
            LabelEvent::parse_line("route 66a").unwrap(),
            Some(LabelEvent::Upsert("route 66a".into()))
        );
        assert_eq!(
            LabelEvent::parse_line("route 66").unwrap(),
            Some(LabelEvent::Set("route".into(), 66))
        );
        assert_eq!(
            LabelEvent::parse_line("+route 66").unwrap(),
            Some(LabelEvent::Upsert("route 66".into()))
        );
        assert!(matches!(
            LabelEvent::parse_line("-"),
            Err(Error::InsufficientInput(_))
        ));
    }

    #[test]
    fn events_drive_weights() {
        let mut cloud = cloud();
        for line in ["fire", "fire", "plume 4", "-fire"] {
            let event = LabelEvent::parse_line(line).unwrap().unwrap();
            event.apply(&mut cloud).unwrap();
        }
        assert_eq!(cloud.engine().find("fire").unwrap().weight(), 1);
        assert_eq!(cloud.engine().find("plume").unwrap().weight(), 4);
        assert!(cloud.upsert("   ").is_err());
    }

    #[test]
    fn scheduled_pass_is_one_unit_per_label_plus_setup() {
        let mut cloud = cloud();
        cloud.set_weight("scrub", 13).unwrap();
        cloud.set_weight("plume", 10).unwrap();
        cloud.schedule_layout();
        assert_eq!(cloud.pending(), 3);

        assert!(cloud.tick());
        assert!(cloud.engine().find("scrub").unwrap().placement().is_none());
        assert!(cloud.tick());
        assert!(cloud.engine().find("scrub").unwrap().placement().is_some());
        assert!(cloud.engine().find("plume").unwrap().placement().is_none());
        assert!(cloud.tick());
        assert!(!cloud.tick());
        assert!(cloud.is_idle());
    }

    #[test]
    fn deferred_pass_matches_synchronous_layout() {
        let labels = [("scrub", 13), ("plume", 10), ("fire", 7), ("ash", 7)];
        let mut deferred = cloud();
        let mut sync = cloud();
        for (text, weight) in labels {
            deferred.set_weight(text, weight).unwrap();
            sync.set_weight(text, weight).unwrap();
        }
        deferred.schedule_layout();
        assert_eq!(deferred.run_until_idle(), labels.len() + 1);
        sync.layout();
        assert_eq!(
            deferred.engine().final_surface().raster(),
            sync.engine().final_surface().raster()
        );
        assert_eq!(
            deferred.engine().draft().raster(),
            sync.engine().draft().raster()
        );
    }

    #[test]
    fn label_removed_before_its_unit_is_skipped() {
        let mut cloud = cloud();
        cloud.set_weight("scrub", 13).unwrap();
        cloud.set_weight("plume", 10).unwrap();
        cloud.schedule_layout();
        cloud.set_weight("plume", 0).unwrap();
        cloud.run_until_idle();
        assert!(cloud.engine().find("plume").is_none());
        assert!(cloud.engine().find("scrub").unwrap().placement().is_some());
    }

    #[test]
    fn relayout_schedules_only_the_dirty_suffix() {
        let mut cloud = cloud();
        cloud.set_weight("scrub", 13).unwrap();
        cloud.set_weight("plume", 10).unwrap();
        cloud.layout();
        cloud.upsert("fire").unwrap();
        cloud.schedule_relayout();
        assert_eq!(cloud.pending(), 2);
        cloud.run_until_idle();
        assert!(cloud.engine().find("fire").unwrap().placement().is_some());
    }
}
