use std::path::Path;

use wordcloud_layout::layout::Glyph;
use wordcloud_layout::rasterizer::{TextRequest, TextStyle};
use wordcloud_layout::surface::Surface;
use wordcloud_layout::{
    BlockRasterizer, BoundingBox, Config, Coordinate, LabelEvent, LabelSource, PlacementEngine,
    PlacementKind, WordCloud,
};

fn engine_with(labels: &[(&str, u32)]) -> PlacementEngine {
    let mut engine =
        PlacementEngine::new(Config::default(), Box::new(BlockRasterizer::new())).unwrap();
    for (text, weight) in labels {
        engine.put_label(text, *weight).unwrap();
    }
    engine
}

fn center_of(engine: &PlacementEngine, text: &str) -> Coordinate {
    engine
        .find(text)
        .and_then(|label| label.placement())
        .map(|placement| placement.center)
        .unwrap_or_else(|| panic!("{text} was not placed"))
}

fn load_events(name: &str) -> Vec<LabelEvent> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    let input = std::fs::read_to_string(path).expect("fixture read failed");
    input
        .lines()
        .filter_map(|line| LabelEvent::parse_line(line).expect("bad fixture line"))
        .collect()
}

fn cloud_from_fixture(name: &str) -> WordCloud {
    let mut cloud =
        WordCloud::new(Config::default(), Box::new(BlockRasterizer::new())).unwrap();
    for event in load_events(name) {
        event.apply(&mut cloud).unwrap();
    }
    cloud
}

const SURFACE_CENTER: Coordinate = Coordinate { x: 175.0, y: 125.0 };

#[test]
fn repeated_layouts_are_deterministic() {
    let labels = [("scrub", 13), ("plume", 10), ("fire", 7), ("smoke", 4), ("ash", 1)];
    let mut first = engine_with(&labels);
    let mut second = engine_with(&labels);
    first.layout();
    second.layout();
    for (text, _) in labels {
        assert_eq!(center_of(&first, text), center_of(&second, text), "{text}");
    }
    assert_eq!(first.final_surface().raster(), second.final_surface().raster());
}

#[test]
fn heavier_labels_ignore_lighter_ones() {
    let mut alone = engine_with(&[("scrub", 13), ("plume", 10)]);
    let mut crowded = engine_with(&[("scrub", 13), ("plume", 10), ("fire", 7), ("ash", 2)]);
    alone.layout();
    crowded.layout();
    assert_eq!(center_of(&alone, "scrub"), center_of(&crowded, "scrub"));
    assert_eq!(center_of(&alone, "plume"), center_of(&crowded, "plume"));
}

/// The glyph centered on `candidate` leaves the surface or lands a probe on
/// an opaque pixel.
fn blocked(draft: &Surface, glyph: &Glyph, candidate: Coordinate) -> bool {
    let top_left = glyph.top_left_for(candidate);
    let (x0, y0) = (top_left.x.floor() as i32, top_left.y.floor() as i32);
    let off_surface = x0 < 0
        || y0 < 0
        || x0 + glyph.width() as i32 > draft.width() as i32
        || y0 + glyph.height() as i32 > draft.height() as i32;
    off_surface
        || glyph.probes().iter().any(|(px, py)| {
            draft
                .opacity_at(x0 + *px as i32, y0 + *py as i32)
                .is_some_and(|alpha| alpha > 0)
        })
}

#[test]
fn each_label_takes_the_first_free_candidate() {
    let mut engine = engine_with(&[("scrub", 13), ("plume", 10), ("fire", 7), ("ash", 2)]);
    let stride = engine.config().placement.candidate_stride;
    let plan = engine.plan_pass(true);
    engine.begin_pass(&plan);

    for (rank, id) in plan.to_place().iter().enumerate() {
        let before: Surface = engine.draft().clone();
        let placement = engine.place(*id).unwrap().unwrap();
        let label = engine.label(*id).unwrap();
        let glyph = label.glyph().unwrap();
        let target = (placement.kind == PlacementKind::Searched).then_some(placement.center);

        let mut skipped = 0usize;
        let mut reached = false;
        for candidate in engine.candidates().iter_strided(stride) {
            if Some(candidate) == target {
                reached = true;
                break;
            }
            assert!(
                blocked(&before, glyph, candidate),
                "{} skipped free candidate {candidate:?}",
                label.text()
            );
            skipped += 1;
        }
        match target {
            Some(center) => {
                assert!(reached, "{} center is not a strided candidate", label.text());
                assert!(!blocked(&before, glyph, center));
            }
            None => assert_eq!(placement.center, SURFACE_CENTER),
        }
        if rank == 0 {
            assert_eq!(skipped, 0);
        }
        if label.text() == "plume" {
            assert_eq!(placement.kind, PlacementKind::Searched);
            assert!(skipped > 0);
        }
    }
}

#[test]
fn huge_weight_event_falls_back() {
    let mut cloud = cloud_from_fixture("wildfire.txt");
    let event = LabelEvent::parse_line("firestorm 1000000").unwrap().unwrap();
    assert_eq!(event.apply(&mut cloud).unwrap(), 1_000_000);
    let report = cloud.layout();
    assert_eq!(report.failed, 0);
    let firestorm = cloud.engine().find("firestorm").unwrap().placement().unwrap();
    assert_eq!(firestorm.kind, PlacementKind::Fallback);
    assert_eq!(firestorm.center, SURFACE_CENTER);
    assert_eq!(
        center_of(cloud.engine(), "scrub"),
        SURFACE_CENTER,
        "an oversized label leaves the surface to the others"
    );
}

#[test]
fn fallback_is_total() {
    let mut config = Config::default();
    config.surface.width = 120;
    config.surface.height = 80;
    let mut engine = PlacementEngine::new(config, Box::new(BlockRasterizer::new())).unwrap();
    engine.put_label("conflagration", 30).unwrap();
    for word in ["ash", "ember", "soot", "heat", "char", "flame", "coal"] {
        engine.put_label(word, 6).unwrap();
    }
    let report = engine.layout();
    assert_eq!(report.failed, 0);
    assert!(report.fallback >= 1);
    assert_eq!(report.placed + report.fallback, engine.len());
    for label in engine.labels() {
        let placement = label.placement().expect("every label gets a position");
        if placement.kind == PlacementKind::Fallback {
            assert_eq!(placement.center, Coordinate::new(60.0, 40.0));
        }
    }
    let big = engine.find("conflagration").unwrap().placement().unwrap();
    assert_eq!(big.kind, PlacementKind::Fallback);
}

#[test]
fn bounding_box_round_trip() {
    let mut surface = Surface::new(300, 120);
    let style = TextStyle::new("sans-serif", 400, 31.0);
    let request = TextRequest {
        text: "plume",
        style: &style,
        origin: Coordinate::new(40.0, 25.0),
        blur_radius: None,
    };
    surface.draw_text(&mut BlockRasterizer::new(), &request).unwrap();

    let bbox = BoundingBox::measure(surface.raster(), 1).unwrap();
    let cropped = bbox.crop(surface.raster());
    let again = BoundingBox::measure(&cropped, 1).unwrap();
    assert_eq!(again.start(), Coordinate::ORIGIN);
    assert_eq!((again.width(), again.height()), (bbox.width(), bbox.height()));
}

#[test]
fn layout_without_changes_is_idempotent() {
    let mut engine = engine_with(&[("scrub", 13), ("plume", 10), ("fire", 7)]);
    engine.layout();
    let before = engine.final_surface().raster().clone();
    let draft = engine.draft().raster().clone();
    engine.layout();
    assert_eq!(engine.final_surface().raster(), &before);
    assert_eq!(engine.draft().raster(), &draft);

    let report = engine.relayout();
    assert_eq!(report.reused, 3);
    assert_eq!(engine.final_surface().raster(), &before);
}

#[test]
fn scrub_plume_fire_scenario() {
    let mut engine = engine_with(&[("scrub", 13), ("plume", 10), ("fire", 7)]);
    let report = engine.layout();
    assert_eq!(report.placed + report.fallback, 3);

    let scrub = engine.find("scrub").unwrap().placement().unwrap();
    assert_eq!(scrub.kind, PlacementKind::Searched);
    assert_eq!(scrub.center, SURFACE_CENTER);

    let plume = center_of(&engine, "plume").distance(SURFACE_CENTER);
    let fire = center_of(&engine, "fire").distance(SURFACE_CENTER);
    assert!(plume > 0.0);
    assert!(fire > 0.0);
    let order: Vec<&str> = engine.labels().into_iter().map(|l| l.text()).collect();
    assert_eq!(order, vec!["scrub", "plume", "fire"]);
}

#[test]
fn identical_labels_keep_insertion_order() {
    let mut engine = engine_with(&[]);
    let first = engine.put_label("ember", 5).unwrap();
    let second = engine.put_label("ember", 5).unwrap();
    engine.layout();
    let a = engine.label(first).unwrap().placement().unwrap();
    let b = engine.label(second).unwrap().placement().unwrap();
    assert_eq!(a.center, SURFACE_CENTER);
    assert_ne!(b.center, SURFACE_CENTER);
}

#[test]
fn overtaking_weight_reorders_placement() {
    let mut engine = engine_with(&[("scrub", 13), ("plume", 10)]);
    engine.layout();
    assert_eq!(center_of(&engine, "scrub"), SURFACE_CENTER);

    engine.set_weight("plume", 14).unwrap();
    let report = engine.relayout();
    assert_eq!(report.reused, 0);
    assert_eq!(center_of(&engine, "plume"), SURFACE_CENTER);
    assert_ne!(center_of(&engine, "scrub"), SURFACE_CENTER);
    assert_eq!(engine.find("plume").unwrap().font_size(), 52.0);
}

#[test]
fn incremental_relayout_matches_full_layout() {
    let mut incremental = engine_with(&[("scrub", 13), ("plume", 10), ("fire", 7), ("ash", 2)]);
    incremental.layout();
    incremental.set_weight("fire", 9).unwrap();
    incremental.add_or_increment("smoke").unwrap();
    let report = incremental.relayout();
    assert_eq!(report.reused, 2);

    let mut full = engine_with(&[("scrub", 13), ("plume", 10), ("fire", 9), ("ash", 2), ("smoke", 1)]);
    full.layout();
    assert_eq!(incremental.final_surface().raster(), full.final_surface().raster());
    for text in ["scrub", "plume", "fire", "ash", "smoke"] {
        assert_eq!(center_of(&incremental, text), center_of(&full, text), "{text}");
    }
}

#[test]
fn fixture_events_build_expected_weights() {
    let cloud = cloud_from_fixture("wildfire.txt");
    let engine = cloud.engine();
    let weights: Vec<(&str, u32)> = engine
        .labels()
        .into_iter()
        .map(|label| (label.text(), label.weight()))
        .collect();
    assert_eq!(
        weights,
        vec![
            ("scrub", 13),
            ("plume", 10),
            ("fire", 7),
            ("smoke", 4),
            ("red flag", 3),
            ("evacuation", 2),
            ("ash", 1),
        ]
    );
}

#[test]
fn deferred_units_match_synchronous_layout() {
    let mut deferred = cloud_from_fixture("wildfire.txt");
    let mut sync = cloud_from_fixture("wildfire.txt");

    deferred.schedule_layout();
    let mut units = 0;
    while deferred.tick() {
        units += 1;
    }
    assert_eq!(units, deferred.engine().len() + 1);
    sync.layout();

    assert_eq!(
        deferred.engine().final_surface().raster(),
        sync.engine().final_surface().raster()
    );
    for label in sync.engine().labels() {
        assert_eq!(
            center_of(deferred.engine(), label.text()),
            label.placement().unwrap().center
        );
    }

    deferred.remove("scrub").unwrap();
    deferred.schedule_relayout();
    deferred.run_until_idle();
    assert_eq!(deferred.engine().find("scrub").unwrap().weight(), 12);
}
