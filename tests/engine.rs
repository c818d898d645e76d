// End-to-end checks through the public layer, loader and compositor API

use std::sync::{Arc, Mutex};
use std::time::Duration;

use glowmatrix::config::LayerConfig;
use glowmatrix::loader::{ImageLoadRequest, ImageLoader, ImageResource, ImageTarget, LoadStatus, MemorySource, PixelRun};
use glowmatrix::{Compositor, DynamicColor, Layer, LayerContext, LayerKind, ManualClock, Pattern, PuckManEvent, Rgb, Rgba, Serpentine, ThemeColor};

fn context(cols: usize, rows: usize) -> (LayerContext, ManualClock) {
    let clock = ManualClock::new(0);
    let ctx = LayerContext::new(Serpentine::new(cols, rows), Arc::new(clock.clone())).with_seed(Some(42));
    (ctx, clock)
}

fn pattern_layer(ctx: LayerContext, pattern: Pattern, color: Rgb) -> Layer {
    let mut layer = Layer::new(ctx);
    layer.setup(LayerKind::Pattern, pattern.id()).unwrap();
    layer.set_color(ThemeColor::Fixed(color));
    layer
}

fn lit(layer: &Layer) -> Vec<usize> {
    layer.leds().iter().enumerate().filter(|(_, px)| !px.is_dark()).map(|(i, _)| i).collect()
}

#[test]
fn orbit_advances_with_a_fading_trail() {
    let (ctx, clock) = context(16, 16);
    let mut layer = pattern_layer(ctx, Pattern::Orbit, Rgb::WHITE);

    for _ in 0..3 {
        clock.advance(21);
        layer.reanimate();
    }

    let leds = layer.leds();
    assert_eq!(leds[2], Rgba::opaque(Rgb::WHITE));
    assert!(leds[1].r < 255 && leds[1].r > leds[0].r && leds[0].r > 0);
    assert_eq!(lit(&layer), vec![0, 1, 2]);
}

#[test]
fn orbit_waits_for_its_interval() {
    let (ctx, clock) = context(16, 16);
    let mut layer = pattern_layer(ctx, Pattern::Orbit, Rgb::WHITE);

    clock.advance(21);
    layer.reanimate();
    // Too soon for another step
    clock.advance(5);
    layer.reanimate();
    assert_eq!(lit(&layer), vec![0]);
    assert_eq!(layer.leds()[0], Rgba::opaque(Rgb::WHITE));
}

#[test]
fn reselecting_the_running_pattern_keeps_its_state() {
    let (ctx, clock) = context(16, 16);
    let mut layer = pattern_layer(ctx, Pattern::Orbit, Rgb::WHITE);
    for _ in 0..3 {
        clock.advance(21);
        layer.reanimate();
    }

    layer.set_pattern(Pattern::Orbit.id(), false, false).unwrap();
    clock.advance(21);
    layer.reanimate();
    assert_eq!(layer.leds()[3], Rgba::opaque(Rgb::WHITE));
}

#[test]
fn switching_patterns_starts_them_fresh() {
    let (ctx, clock) = context(16, 16);
    let mut layer = pattern_layer(ctx, Pattern::Orbit, Rgb::WHITE);
    for _ in 0..5 {
        clock.advance(21);
        layer.reanimate();
    }

    layer.set_pattern(Pattern::Solid.id(), false, false).unwrap();
    clock.advance(201);
    layer.reanimate();
    assert!(layer.leds().iter().all(|px| *px == Rgba::opaque(Rgb::WHITE)));

    // Back to orbit: the cursor starts over at the first pixel
    layer.set_pattern(Pattern::Orbit.id(), false, false).unwrap();
    clock.advance(21);
    layer.reanimate();
    let leds = layer.leds();
    assert_eq!(leds[0], Rgba::opaque(Rgb::WHITE));
    assert!(leds[5].r < 255);
}

#[test]
fn starship_race_ends_in_a_flood() {
    let (ctx, clock) = context(16, 16);
    let mut layer = pattern_layer(ctx, Pattern::StarshipRace, Rgb::WHITE);

    let mut frames = 0;
    let flood = loop {
        clock.advance(89);
        layer.reanimate();
        let first = layer.leds()[0];
        if !first.is_dark() && layer.leds().iter().all(|px| *px == first) {
            break first;
        }
        frames += 1;
        assert!(frames < 10_000, "race never finished");
    };

    // The winner's color holds through the cooldown
    for _ in 0..5 {
        clock.advance(89);
        layer.reanimate();
        assert!(layer.leds().iter().all(|px| *px == flood));
    }
}

#[test]
fn unknown_pattern_falls_back_to_nothing() {
    let (ctx, clock) = context(4, 4);
    let mut layer = Layer::new(ctx);
    assert!(layer.setup(LayerKind::Pattern, 200).is_err());
    assert_eq!(layer.patterns().unwrap().pattern(), Pattern::NoPattern);
    clock.advance(500);
    layer.reanimate();
    assert!(layer.leds().is_all_transparent());
}

#[test]
fn pattern_events_reach_the_callback() {
    let (ctx, clock) = context(16, 16);
    let mut layer = pattern_layer(ctx, Pattern::PuckMan, Rgb::WHITE);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    layer.set_callback(move |code| sink.lock().unwrap().push(code));

    clock.advance(151);
    layer.reanimate();
    // The first frame lays out a new maze
    assert_eq!(*seen.lock().unwrap(), vec![PuckManEvent::CycleRestarted.code()]);
}

#[test]
fn compositor_stacks_patterns_and_accents() {
    let (ctx, clock) = context(8, 8);
    let mut comp = Compositor::new(ctx, 3, Arc::new(DynamicColor::default()));
    let base = LayerConfig {
        kind: "pattern".to_string(),
        id: Pattern::Solid.id(),
        color: "0000FF".to_string(),
        ..LayerConfig::default()
    };
    let accent = LayerConfig {
        kind: "accent".to_string(),
        id: Pattern::Orbit.id(),
        color: "FF0000".to_string(),
        ..LayerConfig::default()
    };
    assert!(comp.apply_config(&[base, accent]).is_empty());

    clock.advance(201);
    comp.reanimate();
    clock.advance(21);
    comp.reanimate();

    let frame = comp.compose().to_vec();
    assert_eq!(frame.len(), 64);
    // The accent clears itself each frame so only its cursor shows
    assert_eq!(frame[1], Rgb::new(255, 0, 0));
    assert!(frame.iter().enumerate().filter(|(i, _)| *i != 1).all(|(_, px)| *px == Rgb::new(0, 0, 255)));
    assert!(comp.layer(2).is_none());
}

#[test]
fn dynamic_theme_follows_the_shared_color() {
    let (ctx, clock) = context(4, 4);
    let dynamic = Arc::new(DynamicColor::default());
    let mut comp = Compositor::new(ctx, 1, dynamic.clone());
    let config = LayerConfig {
        kind: "pattern".to_string(),
        id: Pattern::Solid.id(),
        color: "complement".to_string(),
        ..LayerConfig::default()
    };
    comp.apply_config(&[config]);

    clock.advance(201);
    comp.reanimate();
    let expected = dynamic.complement();
    assert_eq!(comp.compose()[0], expected);
}

fn smiley_source() -> Arc<MemorySource> {
    let mut source = MemorySource::new();
    source.insert(
        "smiley",
        ImageResource {
            runs: vec![
                PixelRun { start: 0, count: 2, color: Rgba::opaque(Rgb::new(0, 255, 0)) },
                PixelRun { start: 2, count: 2, color: Rgba::opaque(Rgb::new(10, 20, 30)) },
            ],
            proxy_color: Some("00FF00".to_string()),
        },
    );
    Arc::new(source)
}

#[tokio::test]
async fn image_layer_composes_over_a_pattern() {
    let (queue, _task) = ImageLoader::spawn(
        &tokio::runtime::Handle::current(),
        smiley_source(),
        4,
        Duration::from_millis(5),
    );
    let (ctx, clock) = context(4, 4);
    let mut comp = Compositor::new(ctx.with_loader(queue), 2, Arc::new(DynamicColor::default()));
    let base = LayerConfig {
        kind: "pattern".to_string(),
        id: Pattern::Solid.id(),
        color: "0000FF".to_string(),
        ..LayerConfig::default()
    };
    let image = LayerConfig {
        kind: "image".to_string(),
        image: "smiley".to_string(),
        color: "FFFFFF".to_string(),
        ..LayerConfig::default()
    };
    assert!(comp.apply_config(&[base, image]).is_empty());

    clock.advance(201);
    comp.reanimate();
    assert_eq!(comp.layer(1).unwrap().image_status(), Some(LoadStatus::Pending));

    tokio::time::sleep(Duration::from_millis(80)).await;
    clock.advance(1);
    comp.reanimate();
    assert_eq!(comp.layer(1).unwrap().image_status(), Some(LoadStatus::Idle));

    let frame = comp.compose();
    // Proxy pixels take the layer's theme color
    assert_eq!(frame[0], Rgb::WHITE);
    assert_eq!(frame[1], Rgb::WHITE);
    assert_eq!(frame[2], Rgb::new(10, 20, 30));
    assert!(frame[4..].iter().all(|px| *px == Rgb::new(0, 0, 255)));
}

#[tokio::test]
async fn abandoned_requests_never_write() {
    let (queue, _task) = ImageLoader::spawn(
        &tokio::runtime::Handle::current(),
        smiley_source(),
        4,
        Duration::from_millis(5),
    );
    let stats = queue.stats();

    // The layer moved on to another image before the loader got to it
    let moved_on = ImageTarget::new(16);
    assert!(queue.submit(ImageLoadRequest::new("smiley", &moved_on)));
    moved_on.bump_generation();

    // The layer is gone altogether
    let gone = ImageTarget::new(16);
    assert!(queue.submit(ImageLoadRequest::new("smiley", &gone)));
    drop(gone);

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(stats.abandoned(), 2);
    assert_eq!(stats.completed(), 0);
    let slot = moved_on.lock();
    assert_eq!(slot.status, LoadStatus::Idle);
    assert!(slot.pixels.is_all_transparent());
}

#[test]
fn rendered_pixels_pass_through_at_full_brightness() {
    let (ctx, clock) = context(4, 4);
    let mut layer = pattern_layer(ctx, Pattern::Solid, Rgb::new(200, 100, 50));
    clock.advance(201);
    layer.reanimate();
    assert_eq!(layer.overlays().brightness(), 255);
    assert_eq!(layer.get_pixel(5), Rgba::new(200, 100, 50, 255));
}
