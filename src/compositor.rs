// Compositor module - Layer stack, shared dynamic color and the final RGB blend

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::buffer::PixelBuffer;
use crate::config::LayerConfig;
use crate::error::{EngineError, EngineResult};
use crate::layer::{Layer, LayerContext, LayerKind, ThemeColor};
use crate::math8::blend8;
use crate::types::{hsv, Rgb};

pub const DEFAULT_DYNAMIC_COLOR_MS: u64 = 100;
const DYNAMIC_HUE_STEP: u8 = 3;

/// Slowly rotating theme color shared by every layer that asks for it.
#[derive(Debug)]
pub struct DynamicColor {
    hue: AtomicU8,
    previous: AtomicU64,
    interval: u64,
}

impl DynamicColor {
    pub fn new(interval: u64) -> Self {
        DynamicColor { hue: AtomicU8::new(0), previous: AtomicU64::new(0), interval }
    }

    pub fn hue(&self) -> u8 {
        self.hue.load(Ordering::Relaxed)
    }

    pub fn color(&self) -> Rgb {
        hsv(self.hue(), 255, 255)
    }

    pub fn complement(&self) -> Rgb {
        self.color().complement()
    }

    /// Steps the hue once `interval` ms have passed since the last step.
    pub fn advance(&self, now: u64) {
        let previous = self.previous.load(Ordering::Relaxed);
        if now.saturating_sub(previous) > self.interval {
            self.previous.store(now, Ordering::Relaxed);
            self.hue.fetch_add(DYNAMIC_HUE_STEP, Ordering::Relaxed);
        }
    }
}

impl Default for DynamicColor {
    fn default() -> Self {
        Self::new(DEFAULT_DYNAMIC_COLOR_MS)
    }
}

/// `overlay` mixed over `existing` by `amount` (0 keeps existing).
pub fn nblend(existing: Rgb, overlay: Rgb, amount: u8) -> Rgb {
    Rgb::new(
        blend8(existing.r, overlay.r, amount),
        blend8(existing.g, overlay.g, amount),
        blend8(existing.b, overlay.b, amount),
    )
}

pub struct Compositor {
    ctx: LayerContext,
    dynamic: Arc<DynamicColor>,
    layers: Vec<Option<Layer>>,
    frame: Vec<Rgb>,
    scratch: PixelBuffer,
}

impl Compositor {
    pub fn new(ctx: LayerContext, layer_count: usize, dynamic: Arc<DynamicColor>) -> Self {
        let len = ctx.grid.len();
        Compositor {
            ctx,
            dynamic,
            layers: (0..layer_count).map(|_| None).collect(),
            frame: vec![Rgb::BLACK; len],
            scratch: PixelBuffer::new(len),
        }
    }

    pub fn dynamic_color(&self) -> Arc<DynamicColor> {
        self.dynamic.clone()
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)?.as_ref()
    }

    pub fn layer_mut(&mut self, index: usize) -> Option<&mut Layer> {
        self.layers.get_mut(index)?.as_mut()
    }

    /// Fresh pattern layer sharing this compositor's collaborators. Seeded
    /// runs give every slot its own stream.
    pub fn new_layer(&self, index: usize) -> Layer {
        let seed = self.ctx.seed.map(|s| s.wrapping_add(index as u64));
        Layer::new(self.ctx.clone().with_seed(seed))
    }

    /// Out-of-range slots are ignored.
    pub fn set_layer(&mut self, index: usize, layer: Option<Layer>) {
        if let Some(slot) = self.layers.get_mut(index) {
            *slot = layer;
        }
    }

    pub fn clear_layers(&mut self) {
        for slot in self.layers.iter_mut() {
            *slot = None;
        }
    }

    pub fn theme_color(&self, spec: &str) -> EngineResult<ThemeColor> {
        match spec {
            "dynamic" => Ok(ThemeColor::Dynamic(self.dynamic.clone())),
            "complement" => Ok(ThemeColor::Complement(self.dynamic.clone())),
            hex => Rgb::from_hex(hex).map(ThemeColor::Fixed).map_err(EngineError::Other),
        }
    }

    /// Builds slot `index` from `config`. Bad values fall back to safe
    /// defaults; the errors are logged and handed back.
    pub fn apply_layer_config(&mut self, index: usize, config: &LayerConfig) -> Vec<EngineError> {
        let mut errors = Vec::new();
        if index >= self.layers.len() {
            return errors;
        }
        let mut layer = self.new_layer(index);

        let kind = match config.layer_kind() {
            Some(kind) => kind,
            None => {
                warn!(index, kind = %config.kind, "unknown layer kind, using pattern");
                LayerKind::Pattern
            }
        };
        let mut note = |result: EngineResult<()>| {
            if let Err(e) = result {
                warn!(index, "layer config: {}", e);
                errors.push(e);
            }
        };

        note(layer.setup(kind, config.id));
        match self.theme_color(&config.color) {
            Ok(theme) => layer.set_color(theme),
            Err(e) => note(Err(e)),
        }
        note(layer.set_heading(config.heading));
        note(layer.set_overlay(config.persistent_overlay, true));

        match kind {
            LayerKind::Pattern | LayerKind::Accent => {
                note(layer.set_pattern(config.id, config.reverse, false));
                if config.autocycle_ms > 0 {
                    note(layer.set_autocycle(config.autocycle_ms, true));
                }
                if config.flipflop_ms > 0 {
                    note(layer.set_flipflop(config.flipflop_ms, true));
                }
            }
            LayerKind::Image => {
                if !config.image.is_empty() {
                    note(layer.set_image(&config.image));
                }
            }
            LayerKind::Text => note(layer.set_text(&config.text)),
            LayerKind::Info => {}
        }
        // Transient overlay last, choosing a pattern clears it
        note(layer.set_overlay(config.overlay, false));

        debug!(index, kind = kind.name(), "layer built");
        self.layers[index] = Some(layer);
        errors
    }

    /// Rebuilds the whole stack; slots past the config stay empty.
    pub fn apply_config(&mut self, layers: &[LayerConfig]) -> Vec<EngineError> {
        self.clear_layers();
        let mut errors = Vec::new();
        for (index, config) in layers.iter().enumerate().take(self.layers.len()) {
            errors.extend(self.apply_layer_config(index, config));
        }
        errors
    }

    pub fn reanimate(&mut self) {
        self.dynamic.advance(self.ctx.clock.millis());
        for layer in self.layers.iter_mut().flatten() {
            layer.reanimate();
        }
    }

    /// Blends every layer bottom-up over black and returns the frame.
    pub fn compose(&mut self) -> &[Rgb] {
        self.frame.fill(Rgb::BLACK);
        for layer in self.layers.iter_mut().flatten() {
            layer.render_into(&mut self.scratch);
            for (out, px) in self.frame.iter_mut().zip(self.scratch.iter()) {
                *out = nblend(*out, px.rgb(), px.a);
            }
        }
        &self.frame
    }

    pub fn frame(&self) -> &[Rgb] {
        &self.frame
    }
}
