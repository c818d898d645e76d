// Layer module - One compositable layer: content, overlays, scrolling, read path
//
// A layer owns one PixelBuffer for its whole life. `reanimate()` refreshes the
// buffer once per frame; the compositor then reads it back through
// `get_pixel()` (or `render_into()`), which applies the scroll transform, the
// proxy/black substitutions and the overlay brightness.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::buffer::PixelBuffer;
use crate::compositor::DynamicColor;
use crate::error::{EngineError, EngineResult};
use crate::info::{ClockSource, InfoDisplay, InfoKind, SystemCalendar};
use crate::loader::{ImageLoadRequest, ImageTarget, LoadQueue, LoadStatus};
use crate::math8::scale8;
use crate::overlay::OverlayEngine;
use crate::patterns::PatternEngine;
use crate::serpentine::{Heading, Motion, Serpentine};
use crate::text::{GlyphProvider, MiniFont, TextScroller};
use crate::timing::Clock;
use crate::transform::PositionTransform;
use crate::types::{Rgb, Rgba};

pub const DEFAULT_IMAGE_RETRY_MS: u64 = 500;
const LAYER_AUTOCYCLE_MS: u64 = 10_000;
const LAYER_FLIPFLOP_MS: u64 = 6_000;
const DEFAULT_COLOR: Rgb = Rgb::new(255, 255, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Pattern,
    Accent,
    Image,
    Text,
    Info,
}

impl LayerKind {
    pub fn from_id(id: u8) -> EngineResult<Self> {
        match id {
            0 => Ok(LayerKind::Pattern),
            1 => Ok(LayerKind::Accent),
            2 => Ok(LayerKind::Image),
            3 => Ok(LayerKind::Text),
            4 => Ok(LayerKind::Info),
            _ => Err(EngineError::UnknownLayerKind(id)),
        }
    }

    pub fn id(&self) -> u8 {
        *self as u8
    }

    pub fn name(&self) -> &'static str {
        match self {
            LayerKind::Pattern => "pattern",
            LayerKind::Accent => "accent",
            LayerKind::Image => "image",
            LayerKind::Text => "text",
            LayerKind::Info => "info",
        }
    }
}

/// Where a layer takes its theme color from each frame.
#[derive(Clone)]
pub enum ThemeColor {
    Fixed(Rgb),
    Dynamic(Arc<DynamicColor>),
    Complement(Arc<DynamicColor>),
}

impl ThemeColor {
    pub fn resolve(&self) -> Rgb {
        match self {
            ThemeColor::Fixed(rgb) => *rgb,
            ThemeColor::Dynamic(dynamic) => dynamic.color(),
            ThemeColor::Complement(dynamic) => dynamic.complement(),
        }
    }
}

/// Collaborators shared by every layer of a compositor.
#[derive(Clone)]
pub struct LayerContext {
    pub grid: Serpentine,
    pub clock: Arc<dyn Clock>,
    pub loader: Option<LoadQueue>,
    pub glyphs: Arc<dyn GlyphProvider>,
    pub calendar: Arc<dyn ClockSource>,
    pub image_retry_ms: u64,
    pub seed: Option<u64>,
}

impl LayerContext {
    pub fn new(grid: Serpentine, clock: Arc<dyn Clock>) -> Self {
        LayerContext {
            grid,
            clock,
            loader: None,
            glyphs: Arc::new(MiniFont),
            calendar: Arc::new(SystemCalendar),
            image_retry_ms: DEFAULT_IMAGE_RETRY_MS,
            seed: None,
        }
    }

    pub fn with_loader(mut self, loader: LoadQueue) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn with_calendar(mut self, calendar: Arc<dyn ClockSource>) -> Self {
        self.calendar = calendar;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }
}

struct ImageContent {
    target: Arc<ImageTarget>,
    id: Option<String>,
    fresh: bool,
    proxy: Option<Rgb>,
    retry_at: u64,
}

enum Content {
    Pattern(PatternEngine),
    Image(ImageContent),
    Text(TextScroller),
    Info(InfoDisplay),
}

pub type LayerCallback = Box<dyn FnMut(u8) + Send>;

pub struct Layer {
    kind: LayerKind,
    ctx: LayerContext,
    leds: PixelBuffer,
    content: Content,
    overlays: OverlayEngine,
    theme: ThemeColor,
    color: Rgb,
    heading: Heading,
    motion: Option<Motion>,
    transform: PositionTransform,
    rng: StdRng,
    events: Vec<u8>,
    callback: Option<LayerCallback>,
}

impl Layer {
    /// A pattern layer showing nothing until a pattern is chosen.
    pub fn new(ctx: LayerContext) -> Self {
        let grid = ctx.grid;
        let rng = match ctx.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Layer {
            kind: LayerKind::Pattern,
            leds: PixelBuffer::new(grid.len()),
            content: Content::Pattern(pattern_engine(grid)),
            overlays: OverlayEngine::new(),
            theme: ThemeColor::Fixed(DEFAULT_COLOR),
            color: DEFAULT_COLOR,
            heading: Heading::Still,
            motion: None,
            transform: PositionTransform::new(grid),
            rng,
            events: Vec::new(),
            callback: None,
            ctx,
        }
    }

    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    pub fn leds(&self) -> &PixelBuffer {
        &self.leds
    }

    pub fn overlays(&self) -> &OverlayEngine {
        &self.overlays
    }

    pub fn heading(&self) -> Heading {
        self.heading
    }

    pub fn color(&self) -> Rgb {
        self.color
    }

    /// Active pattern engine, for pattern and accent layers.
    pub fn patterns(&self) -> Option<&PatternEngine> {
        match &self.content {
            Content::Pattern(engine) => Some(engine),
            _ => None,
        }
    }

    pub fn image_status(&self) -> Option<LoadStatus> {
        match &self.content {
            Content::Image(image) => Some(image.target.lock().status),
            _ => None,
        }
    }

    /// Rebuilds the layer as `kind`. `id` is the pattern id for pattern and
    /// accent layers and the info id for info layers; other kinds ignore it.
    /// An unknown id leaves the layer on its safe default and is reported.
    pub fn setup(&mut self, kind: LayerKind, id: u8) -> EngineResult<()> {
        let grid = self.ctx.grid;
        self.kind = kind;
        self.leds.clear();
        self.overlays = OverlayEngine::new();
        self.transform.reset();
        debug!(kind = kind.name(), id, "layer setup");

        match kind {
            LayerKind::Pattern | LayerKind::Accent => {
                let mut engine = pattern_engine(grid);
                let result = engine.set_pattern_id(id, false, false);
                self.content = Content::Pattern(engine);
                result
            }
            LayerKind::Image => {
                self.content = Content::Image(ImageContent {
                    target: ImageTarget::new(grid.len()),
                    id: None,
                    fresh: false,
                    proxy: None,
                    retry_at: 0,
                });
                Ok(())
            }
            LayerKind::Text => {
                self.content = Content::Text(TextScroller::new("", self.ctx.glyphs.as_ref()));
                Ok(())
            }
            LayerKind::Info => {
                let (info, result) = match InfoKind::from_id(id) {
                    Ok(info) => (info, Ok(())),
                    Err(e) => (InfoKind::Time12h, Err(e)),
                };
                self.content = Content::Info(InfoDisplay::new(info));
                result
            }
        }
    }

    /// Choosing a pattern always drops the transient overlay.
    pub fn set_pattern(&mut self, id: u8, reverse: bool, disable_auto_timers: bool) -> EngineResult<()> {
        let Content::Pattern(engine) = &mut self.content else {
            return Err(EngineError::WrongLayerKind("pattern"));
        };
        self.overlays.clear_transient();
        engine.set_pattern_id(id, reverse, disable_auto_timers)
    }

    pub fn set_overlay(&mut self, id: u8, persistent: bool) -> EngineResult<()> {
        self.overlays.set_overlay_id(id, persistent)
    }

    pub fn set_autocycle(&mut self, interval: u64, enabled: bool) -> EngineResult<()> {
        let Content::Pattern(engine) = &mut self.content else {
            return Err(EngineError::WrongLayerKind("pattern"));
        };
        engine.set_autocycle(interval, enabled);
        Ok(())
    }

    pub fn set_flipflop(&mut self, interval: u64, enabled: bool) -> EngineResult<()> {
        let Content::Pattern(engine) = &mut self.content else {
            return Err(EngineError::WrongLayerKind("pattern"));
        };
        engine.set_flipflop(interval, enabled);
        Ok(())
    }

    pub fn set_color(&mut self, theme: ThemeColor) {
        self.color = theme.resolve();
        self.theme = theme;
    }

    /// Receives pattern event codes (see `PuckManEvent`).
    pub fn set_callback(&mut self, callback: impl FnMut(u8) + Send + 'static) {
        self.callback = Some(Box::new(callback));
    }

    /// Unknown ids stop the layer scrolling and are reported.
    pub fn set_heading(&mut self, id: u8) -> EngineResult<()> {
        let (heading, result) = match Heading::from_id(id) {
            Ok(heading) => (heading, Ok(())),
            Err(e) => (Heading::Still, Err(e)),
        };
        self.heading = heading;
        self.motion = heading.motion(self.ctx.grid);
        self.transform.reset();
        result
    }

    /// Custom scroll parameters, beyond the eight compass headings.
    pub fn set_motion(&mut self, motion: Option<Motion>) {
        self.motion = motion;
        self.transform.reset();
    }

    /// Switches the image. Anything still in flight for the old id is
    /// abandoned by the loader.
    pub fn set_image(&mut self, id: &str) -> EngineResult<()> {
        let Content::Image(image) = &mut self.content else {
            return Err(EngineError::WrongLayerKind("image"));
        };
        image.target.bump_generation();
        image.id = Some(id.to_string());
        image.fresh = false;
        image.retry_at = 0;
        if self.ctx.loader.is_none() {
            return Err(EngineError::NoImageLoader);
        }
        Ok(())
    }

    pub fn set_text(&mut self, text: &str) -> EngineResult<()> {
        let Content::Text(scroller) = &mut self.content else {
            return Err(EngineError::WrongLayerKind("text"));
        };
        *scroller = TextScroller::new(text, self.ctx.glyphs.as_ref());
        self.leds.clear();
        Ok(())
    }

    pub fn set_info(&mut self, id: u8) -> EngineResult<()> {
        let Content::Info(display) = &mut self.content else {
            return Err(EngineError::WrongLayerKind("info"));
        };
        let (kind, result) = match InfoKind::from_id(id) {
            Ok(kind) => (kind, Ok(())),
            Err(e) => (InfoKind::Time12h, Err(e)),
        };
        *display = InfoDisplay::new(kind);
        result
    }

    pub fn clear(&mut self) {
        self.leds.clear();
    }

    /// Advances the layer by one frame.
    pub fn reanimate(&mut self) {
        let now = self.ctx.clock.millis();
        self.color = self.theme.resolve();
        let frozen = self.overlays.is_frozen(now, &self.leds);

        match &mut self.content {
            Content::Pattern(engine) => {
                if engine.tick_timers(now) {
                    self.overlays.clear_transient();
                }
                if !frozen {
                    // Accents only light a few pixels over whatever is below
                    if self.kind == LayerKind::Accent {
                        self.leds.clear();
                    }
                    engine.run(now, &mut self.leds, self.color, &mut self.rng, &mut self.events);
                }
            }
            Content::Image(image) => {
                if frozen {
                    // The decay eats the image; reload it once the freeze ends
                    image.fresh = false;
                } else {
                    refresh_image(image, now, &mut self.leds, self.ctx.loader.as_ref(), self.ctx.image_retry_ms);
                }
            }
            Content::Text(scroller) => {
                if !frozen {
                    scroller.step(now, &mut self.leds, self.ctx.grid, self.color);
                }
            }
            Content::Info(display) => {
                if !frozen {
                    display.step(
                        now,
                        &mut self.leds,
                        self.ctx.grid,
                        self.color,
                        self.ctx.glyphs.as_ref(),
                        self.ctx.calendar.as_ref(),
                    );
                }
            }
        }

        self.overlays.apply(now, &mut self.leds, &mut self.rng);

        for code in self.events.drain(..) {
            if let Some(callback) = self.callback.as_mut() {
                callback(code);
            }
        }
    }

    /// Pixel shown at output cell `i`. Scrolling layers advance their drift
    /// once every cell of a frame has been read, so read each cell once per
    /// frame and do not mix with `render_into` in the same frame.
    pub fn get_pixel(&mut self, i: usize) -> Rgba {
        let source = match &self.motion {
            Some(motion) => self.transform.translate(i, motion),
            None => Some(i),
        };
        match source.and_then(|s| self.leds.get(s)) {
            Some(px) => self.finish(px),
            None => Rgba::TRANSPARENT,
        }
    }

    /// Whole-frame variant of `get_pixel`.
    pub fn render_into(&mut self, dst: &mut PixelBuffer) {
        match &self.motion {
            Some(motion) => self.transform.translate_into(&self.leds, dst, motion),
            None => dst.copy_from(&self.leds),
        }
        for i in 0..dst.len() {
            dst[i] = self.finish(dst[i]);
        }
    }

    fn finish(&self, mut px: Rgba) -> Rgba {
        match (&self.content, self.kind) {
            (_, LayerKind::Pattern | LayerKind::Accent) if px.rgb().is_black() => return Rgba::TRANSPARENT,
            (Content::Image(image), _) => {
                if image.proxy == Some(px.rgb()) {
                    px.set_rgb(self.color);
                }
            }
            _ => {}
        }
        let brightness = self.overlays.brightness();
        px.set_rgb(px.rgb().scale(brightness));
        px.a = scale8(px.a, alpha_scale(brightness));
        px
    }
}

/// Alpha multiplier for a brightness: ramps 0..252 over the bottom quarter,
/// then leaves alpha alone.
pub fn alpha_scale(brightness: u8) -> u8 {
    if brightness < 64 {
        brightness * 4
    } else {
        255
    }
}

fn pattern_engine(grid: Serpentine) -> PatternEngine {
    let mut engine = PatternEngine::new(grid);
    engine.set_autocycle(LAYER_AUTOCYCLE_MS, false);
    engine.set_flipflop(LAYER_FLIPFLOP_MS, false);
    engine
}

fn refresh_image(image: &mut ImageContent, now: u64, leds: &mut PixelBuffer, loader: Option<&LoadQueue>, retry_ms: u64) {
    if image.fresh {
        return;
    }
    let Some(id) = image.id.as_deref() else {
        return;
    };

    let status = image.target.lock().status;
    match status {
        LoadStatus::Idle => {
            let Some(loader) = loader else {
                return;
            };
            if now < image.retry_at {
                return;
            }
            // Pending goes in first so a fast consumer cannot be overwritten
            image.target.lock().status = LoadStatus::Pending;
            if !loader.submit(ImageLoadRequest::new(id, &image.target)) {
                let mut slot = image.target.lock();
                if slot.status == LoadStatus::Pending {
                    slot.status = LoadStatus::Idle;
                }
            }
        }
        LoadStatus::Pending => {}
        LoadStatus::Loaded => {
            let mut slot = image.target.lock();
            leds.copy_from(&slot.pixels);
            image.proxy = slot.proxy;
            image.fresh = true;
            slot.status = LoadStatus::Idle;
            trace!(id, "image copied into layer");
        }
        LoadStatus::Failed => {
            image.target.lock().status = LoadStatus::Idle;
            image.retry_at = now + retry_ms;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{ImageLoader, ImageResource, MemorySource, PixelRun};
    use crate::overlay::Overlay;
    use crate::patterns::{Pattern, PuckManEvent};
    use crate::timing::ManualClock;
    use std::sync::Mutex;
    use std::time::Duration;

    fn context(cols: usize, rows: usize) -> (LayerContext, ManualClock) {
        let clock = ManualClock::new(0);
        let ctx = LayerContext::new(Serpentine::new(cols, rows), Arc::new(clock.clone())).with_seed(Some(7));
        (ctx, clock)
    }

    #[test]
    fn test_layer_kind_ids() {
        for id in 0..=4 {
            assert_eq!(LayerKind::from_id(id).unwrap().id(), id);
        }
        assert!(matches!(LayerKind::from_id(5), Err(EngineError::UnknownLayerKind(5))));
    }

    #[test]
    fn test_alpha_scale_endpoints() {
        assert_eq!(alpha_scale(0), 0);
        assert_eq!(alpha_scale(16), 64);
        assert_eq!(alpha_scale(63), 252);
        assert_eq!(alpha_scale(64), 255);
        assert_eq!(alpha_scale(255), 255);
    }

    #[test]
    fn test_pattern_black_reads_transparent() {
        let (ctx, clock) = context(4, 4);
        let mut layer = Layer::new(ctx);
        layer.setup(LayerKind::Pattern, Pattern::Solid.id()).unwrap();
        layer.set_color(ThemeColor::Fixed(Rgb::BLACK));
        clock.advance(201);
        layer.reanimate();
        assert!(layer.leds()[0].a == 255);
        assert_eq!(layer.get_pixel(0), Rgba::TRANSPARENT);

        layer.set_color(ThemeColor::Fixed(Rgb::new(0, 0, 200)));
        clock.advance(201);
        layer.reanimate();
        assert_eq!(layer.get_pixel(3), Rgba::new(0, 0, 200, 255));
    }

    #[test]
    fn test_wrong_kind_is_reported() {
        let (ctx, _clock) = context(4, 4);
        let mut layer = Layer::new(ctx);
        layer.setup(LayerKind::Text, 0).unwrap();
        assert!(matches!(layer.set_pattern(1, false, false), Err(EngineError::WrongLayerKind("pattern"))));
        assert!(matches!(layer.set_image("x"), Err(EngineError::WrongLayerKind("image"))));
        assert!(layer.set_text("HI").is_ok());
    }

    #[test]
    fn test_unknown_ids_fall_back() {
        let (ctx, _clock) = context(4, 4);
        let mut layer = Layer::new(ctx);
        assert!(layer.setup(LayerKind::Pattern, 200).is_err());
        assert_eq!(layer.patterns().unwrap().pattern(), Pattern::NoPattern);
        assert!(layer.set_heading(42).is_err());
        assert_eq!(layer.heading(), Heading::Still);
        assert!(layer.set_overlay(9, true).is_err());
        assert_eq!(layer.overlays().persistent(), Overlay::NoOverlay);
        assert!(layer.setup(LayerKind::Info, 9).is_err());
    }

    #[test]
    fn test_set_pattern_clears_transient_overlay() {
        let (ctx, _clock) = context(4, 4);
        let mut layer = Layer::new(ctx);
        layer.set_overlay(Overlay::Breathing.id(), false).unwrap();
        layer.set_overlay(Overlay::Flicker.id(), true).unwrap();
        layer.set_pattern(Pattern::Solid.id(), false, false).unwrap();
        assert_eq!(layer.overlays().transient(), Overlay::NoOverlay);
        assert_eq!(layer.overlays().persistent(), Overlay::Flicker);
    }

    #[test]
    fn test_autocycle_clears_transient_overlay() {
        let (ctx, clock) = context(4, 4);
        let mut layer = Layer::new(ctx);
        layer.set_pattern(Pattern::Solid.id(), false, false).unwrap();
        layer.set_overlay(Overlay::Breathing.id(), false).unwrap();
        layer.set_autocycle(1_000, true).unwrap();
        clock.advance(5);
        layer.reanimate();
        assert_ne!(layer.patterns().unwrap().pattern(), Pattern::Solid);
        assert_eq!(layer.overlays().transient(), Overlay::NoOverlay);
    }

    #[test]
    fn test_accent_clears_every_frame() {
        let (ctx, clock) = context(8, 1);
        let mut layer = Layer::new(ctx);
        layer.setup(LayerKind::Accent, Pattern::Orbit.id()).unwrap();
        layer.set_color(ThemeColor::Fixed(Rgb::WHITE));
        for _ in 0..3 {
            clock.advance(50);
            layer.reanimate();
        }
        let lit = layer.leds().iter().filter(|p| !p.is_dark()).count();
        assert!(lit <= 1, "accent kept {} trailing pixels", lit);
    }

    #[test]
    fn test_puckman_events_reach_callback() {
        let (ctx, clock) = context(16, 16);
        let mut layer = Layer::new(ctx);
        layer.setup(LayerKind::Pattern, Pattern::PuckMan.id()).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        layer.set_callback(move |code| sink.lock().unwrap().push(code));
        for _ in 0..100 {
            clock.advance(151);
            layer.reanimate();
        }
        let seen = seen.lock().unwrap();
        assert_eq!(seen.first(), Some(&PuckManEvent::CycleRestarted.code()));
        assert!(seen.contains(&PuckManEvent::PowerPhase.code()));
    }

    #[test]
    fn test_heading_scrolls_content_in() {
        let (ctx, clock) = context(4, 4);
        let mut layer = Layer::new(ctx);
        layer.setup(LayerKind::Pattern, Pattern::Solid.id()).unwrap();
        layer.set_color(ThemeColor::Fixed(Rgb::WHITE));
        layer.set_heading(Heading::West.id()).unwrap();
        clock.advance(201);
        layer.reanimate();

        let mut frame = PixelBuffer::new(16);
        layer.render_into(&mut frame);
        assert!(frame.is_all_transparent());
        for _ in 0..4 {
            layer.render_into(&mut frame);
        }
        assert!(!frame.is_all_transparent());
    }

    #[test]
    fn test_brightness_scales_rgb_and_alpha() {
        let (ctx, clock) = context(2, 2);
        let mut layer = Layer::new(ctx);
        layer.setup(LayerKind::Pattern, Pattern::Solid.id()).unwrap();
        layer.set_color(ThemeColor::Fixed(Rgb::new(200, 100, 50)));
        clock.advance(201);
        layer.reanimate();
        assert_eq!(layer.get_pixel(0), Rgba::new(200, 100, 50, 255));

        // Flicker drops brightness to 0 or leaves it at 255
        layer.set_overlay(Overlay::Flicker.id(), true).unwrap();
        let mut saw_dark = false;
        for _ in 0..40 {
            clock.advance(151);
            layer.reanimate();
            let px = layer.get_pixel(0);
            match layer.overlays().brightness() {
                0 => {
                    saw_dark = true;
                    assert_eq!(px.a, 0);
                    assert!(px.rgb().is_black());
                }
                255 => assert_eq!(px.a, 255),
                other => panic!("unexpected brightness {}", other),
            }
        }
        assert!(saw_dark);
    }

    fn loader_source() -> Arc<MemorySource> {
        let mut memory = MemorySource::new();
        memory.insert(
            "ghost",
            ImageResource {
                runs: vec![
                    PixelRun { start: 0, count: 2, color: Rgba::opaque(Rgb::new(0, 255, 0)) },
                    PixelRun { start: 2, count: 1, color: Rgba::new(255, 0, 0, 128) },
                ],
                proxy_color: Some("00FF00".to_string()),
            },
        );
        Arc::new(memory)
    }

    #[tokio::test]
    async fn test_image_layer_loads_and_substitutes_proxy() {
        let (queue, _task) = ImageLoader::spawn(
            &tokio::runtime::Handle::current(),
            loader_source(),
            2,
            Duration::from_millis(5),
        );
        let (ctx, clock) = context(2, 2);
        let mut layer = Layer::new(ctx.with_loader(queue));
        layer.setup(LayerKind::Image, 0).unwrap();
        layer.set_color(ThemeColor::Fixed(Rgb::new(9, 9, 9)));
        layer.set_image("ghost").unwrap();

        clock.advance(1);
        layer.reanimate();
        assert_eq!(layer.image_status(), Some(LoadStatus::Pending));
        tokio::time::sleep(Duration::from_millis(60)).await;

        clock.advance(1);
        layer.reanimate();
        assert_eq!(layer.get_pixel(0), Rgba::new(9, 9, 9, 255));
        assert_eq!(layer.get_pixel(2), Rgba::new(255, 0, 0, 128));
        assert!(layer.get_pixel(3).is_transparent());
        assert_eq!(layer.image_status(), Some(LoadStatus::Idle));
    }

    #[tokio::test]
    async fn test_image_layer_retries_after_failure() {
        let (queue, _task) = ImageLoader::spawn(
            &tokio::runtime::Handle::current(),
            loader_source(),
            2,
            Duration::from_millis(5),
        );
        let stats = queue.stats();
        let (ctx, clock) = context(2, 2);
        let mut layer = Layer::new(ctx.with_loader(queue));
        layer.setup(LayerKind::Image, 0).unwrap();
        layer.set_image("nothing-here").unwrap();

        clock.advance(1);
        layer.reanimate();
        tokio::time::sleep(Duration::from_millis(60)).await;
        layer.reanimate();
        assert_eq!(layer.image_status(), Some(LoadStatus::Idle));

        // Still inside the retry window
        clock.advance(100);
        layer.reanimate();
        assert_eq!(layer.image_status(), Some(LoadStatus::Idle));

        clock.advance(DEFAULT_IMAGE_RETRY_MS);
        layer.reanimate();
        assert_eq!(layer.image_status(), Some(LoadStatus::Pending));
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(stats.failed(), 2);
    }

    #[test]
    fn test_image_without_loader_is_reported() {
        let (ctx, clock) = context(2, 2);
        let mut layer = Layer::new(ctx);
        layer.setup(LayerKind::Image, 0).unwrap();
        assert!(matches!(layer.set_image("ghost"), Err(EngineError::NoImageLoader)));
        clock.advance(1);
        layer.reanimate();
        assert_eq!(layer.image_status(), Some(LoadStatus::Idle));
    }

    #[test]
    fn test_text_layer_scrolls() {
        let (ctx, clock) = context(8, 7);
        let mut layer = Layer::new(ctx);
        layer.setup(LayerKind::Text, 0).unwrap();
        layer.set_color(ThemeColor::Fixed(Rgb::WHITE));
        layer.set_text("HI").unwrap();
        clock.advance(201);
        layer.reanimate();
        assert!(!layer.leds().is_all_transparent());
    }
}
