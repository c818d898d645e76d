// Overlay module - Post-processing applied after the layer content is drawn
//
// Two slots run every frame, transient first. Breathing and flicker only move
// the layer-wide brightness multiplier; frozen decay holds the frame and eats
// it away pixel by pixel.

use rand::Rng;
use tracing::debug;

use crate::buffer::PixelBuffer;
use crate::error::{EngineError, EngineResult};
use crate::math8::{scale8, triwave8};
use crate::timing::IntervalTimer;

const BREATHING_INTERVAL: u64 = 10;
const BREATHING_MIN: u8 = 2;
const FLICKER_INTERVAL: u64 = 150;
const FLICKER_FADE_CHANCE: u8 = 10;
const FLICKER_FADE: u8 = 150;
const FREEZE_INTERVAL: u64 = 7_000;
const DECAY_CHANCE: u8 = 7;
const DECAY_AMOUNT: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Overlay {
    #[default]
    NoOverlay,
    Breathing,
    Flicker,
    FrozenDecay,
}

impl Overlay {
    pub fn from_id(id: u8) -> EngineResult<Self> {
        match id {
            0 => Ok(Overlay::NoOverlay),
            1 => Ok(Overlay::Breathing),
            2 => Ok(Overlay::Flicker),
            3 => Ok(Overlay::FrozenDecay),
            _ => Err(EngineError::UnknownOverlay(id)),
        }
    }

    pub fn id(&self) -> u8 {
        match self {
            Overlay::NoOverlay => 0,
            Overlay::Breathing => 1,
            Overlay::Flicker => 2,
            Overlay::FrozenDecay => 3,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Overlay::NoOverlay => "none",
            Overlay::Breathing => "breathing",
            Overlay::Flicker => "flicker",
            Overlay::FrozenDecay => "frozen-decay",
        }
    }

    fn drives_brightness(&self) -> bool {
        matches!(self, Overlay::Breathing | Overlay::Flicker)
    }
}

/// Holds a layer's frame still for a while, letting it decay.
///
/// The freeze lasts at most `FAILSAFE_MS`. Once every pixel has gone dark the
/// remaining freeze is cut to `PAUSE_MS`, so a fully decayed frame does not sit
/// frozen for the whole failsafe window.
#[derive(Debug, Clone)]
pub struct Freezer {
    frozen: bool,
    frozen_since: u64,
    budget: u64,
    all_dark: bool,
    // Next instant after which the timer fires; None until first armed
    deadline: Option<u64>,
}

impl Freezer {
    pub const FAILSAFE_MS: u64 = 3_000;
    pub const PAUSE_MS: u64 = 500;

    pub fn new() -> Self {
        Freezer {
            frozen: false,
            frozen_since: 0,
            budget: Self::FAILSAFE_MS,
            all_dark: false,
            deadline: None,
        }
    }

    pub fn budget(&self) -> u64 {
        self.budget
    }

    /// Periodic freeze trigger. The first call only arms it, so the first
    /// freeze lands on the next call made after time has moved on.
    pub fn timer(&mut self, now: u64, interval: u64) {
        match self.deadline {
            None => self.deadline = Some(now),
            Some(deadline) if now > deadline => {
                self.deadline = Some(now + interval);
                self.frozen = true;
                self.frozen_since = now;
                debug!(now, "freezer engaged");
            }
            Some(_) => {}
        }
    }

    pub fn is_frozen(&mut self, now: u64, leds: &PixelBuffer) -> bool {
        if now.saturating_sub(self.frozen_since) > self.budget {
            self.frozen = false;
            self.all_dark = false;
            self.budget = Self::FAILSAFE_MS;
        } else if !self.all_dark {
            // Also runs while unfrozen, so a freeze soon after a dark frame starts on the short pause
            self.all_dark = leds.is_all_dark();
            let remaining = (self.frozen_since + Self::FAILSAFE_MS).saturating_sub(now);
            if self.all_dark && remaining > Self::PAUSE_MS {
                self.frozen_since = now;
                self.budget = Self::PAUSE_MS;
            }
        }
        self.frozen
    }
}

impl Default for Freezer {
    fn default() -> Self {
        Self::new()
    }
}

pub struct OverlayEngine {
    transient: Overlay,
    persistent: Overlay,
    timer: IntervalTimer,
    breath_phase: u8,
    brightness: u8,
    freezer: Freezer,
}

impl OverlayEngine {
    pub fn new() -> Self {
        OverlayEngine {
            transient: Overlay::NoOverlay,
            persistent: Overlay::NoOverlay,
            timer: IntervalTimer::new(),
            breath_phase: 0,
            brightness: 255,
            freezer: Freezer::new(),
        }
    }

    pub fn transient(&self) -> Overlay {
        self.transient
    }

    pub fn persistent(&self) -> Overlay {
        self.persistent
    }

    /// Layer-wide brightness multiplier, 255 when nothing dims the layer.
    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    pub fn set_overlay(&mut self, overlay: Overlay, persistent: bool) {
        if persistent {
            self.persistent = overlay;
        } else {
            self.transient = overlay;
        }
    }

    /// Unknown ids clear the slot and report the error.
    pub fn set_overlay_id(&mut self, id: u8, persistent: bool) -> EngineResult<()> {
        match Overlay::from_id(id) {
            Ok(overlay) => {
                self.set_overlay(overlay, persistent);
                Ok(())
            }
            Err(e) => {
                self.set_overlay(Overlay::NoOverlay, persistent);
                Err(e)
            }
        }
    }

    pub fn clear_transient(&mut self) {
        self.transient = Overlay::NoOverlay;
    }

    pub fn is_frozen(&mut self, now: u64, leds: &PixelBuffer) -> bool {
        self.freezer.is_frozen(now, leds)
    }

    pub fn apply<R: Rng>(&mut self, now: u64, leds: &mut PixelBuffer, rng: &mut R) {
        for overlay in [self.transient, self.persistent] {
            self.apply_one(overlay, now, leds, rng);
        }
        if !self.transient.drives_brightness() && !self.persistent.drives_brightness() {
            self.brightness = 255;
        }
    }

    fn apply_one<R: Rng>(&mut self, overlay: Overlay, now: u64, leds: &mut PixelBuffer, rng: &mut R) {
        match overlay {
            Overlay::NoOverlay => {}
            Overlay::Breathing => {
                if self.timer.ready(now, BREATHING_INTERVAL) {
                    let swing = scale8(triwave8(self.breath_phase), 255 - BREATHING_MIN);
                    self.brightness = swing + BREATHING_MIN;
                    self.breath_phase = self.breath_phase.wrapping_add(1);
                }
            }
            Overlay::Flicker => {
                leds.fade_randomly(rng, FLICKER_FADE_CHANCE, FLICKER_FADE);
                if self.timer.ready(now, FLICKER_INTERVAL) {
                    self.brightness = if rng.gen_range(1..=10) > 4 { 255 } else { 0 };
                }
            }
            Overlay::FrozenDecay => {
                self.freezer.timer(now, FREEZE_INTERVAL);
                if self.freezer.is_frozen(now, leds) {
                    leds.decay_randomly(rng, DECAY_CHANCE, DECAY_AMOUNT);
                }
            }
        }
    }
}

impl Default for OverlayEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Rgb, Rgba};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn lit_buffer(len: usize) -> PixelBuffer {
        let mut buf = PixelBuffer::new(len);
        buf.fill(Rgba::opaque(Rgb::WHITE));
        buf
    }

    #[test]
    fn test_overlay_ids() {
        assert_eq!(Overlay::from_id(3).unwrap(), Overlay::FrozenDecay);
        assert!(matches!(Overlay::from_id(9), Err(EngineError::UnknownOverlay(9))));

        let mut engine = OverlayEngine::new();
        engine.set_overlay(Overlay::Flicker, true);
        assert!(engine.set_overlay_id(42, true).is_err());
        assert_eq!(engine.persistent(), Overlay::NoOverlay);
    }

    #[test]
    fn test_freezer_first_call_only_arms() {
        let mut freezer = Freezer::new();
        let buf = lit_buffer(4);
        freezer.timer(1_000, 7_000);
        assert!(!freezer.frozen);
        freezer.timer(1_000, 7_000);
        assert!(!freezer.frozen);
        freezer.timer(1_001, 7_000);
        assert!(freezer.is_frozen(1_001, &buf));
    }

    #[test]
    fn test_freezer_failsafe_bound() {
        let mut freezer = Freezer::new();
        let buf = lit_buffer(4);
        freezer.timer(0, 7_000);
        freezer.timer(1, 7_000);
        assert!(freezer.is_frozen(3_001, &buf));
        assert!(!freezer.is_frozen(3_002, &buf));
        assert_eq!(freezer.budget(), Freezer::FAILSAFE_MS);
        // Not again until the interval has passed
        freezer.timer(5_000, 7_000);
        assert!(!freezer.is_frozen(5_000, &buf));
        freezer.timer(7_002, 7_000);
        assert!(freezer.is_frozen(7_002, &buf));
    }

    #[test]
    fn test_freezer_dark_frame_shortens_to_pause() {
        let mut freezer = Freezer::new();
        let dark = PixelBuffer::new(4);
        freezer.timer(0, 7_000);
        freezer.timer(1, 7_000);
        assert!(freezer.is_frozen(100, &dark));
        assert_eq!(freezer.budget(), Freezer::PAUSE_MS);
        assert!(freezer.is_frozen(600, &dark));
        assert!(!freezer.is_frozen(601, &dark));
        assert!(freezer.budget() <= Freezer::FAILSAFE_MS);
    }

    #[test]
    fn test_freezer_dark_frame_while_unfrozen_primes_pause() {
        let mut freezer = Freezer::new();
        let dark = PixelBuffer::new(4);
        assert!(!freezer.is_frozen(100, &dark));
        assert_eq!(freezer.budget(), Freezer::PAUSE_MS);
    }

    #[test]
    fn test_freezer_dark_near_end_keeps_budget() {
        let mut freezer = Freezer::new();
        let dark = PixelBuffer::new(4);
        freezer.timer(0, 7_000);
        freezer.timer(1, 7_000);
        // Only 301 ms left, less than the pause
        assert!(freezer.is_frozen(2_700, &dark));
        assert_eq!(freezer.budget(), Freezer::FAILSAFE_MS);
        assert!(!freezer.is_frozen(3_002, &dark));
    }

    #[test]
    fn test_breathing_stays_in_range() {
        let mut engine = OverlayEngine::new();
        let mut rng = StdRng::seed_from_u64(3);
        let mut buf = lit_buffer(4);
        engine.set_overlay(Overlay::Breathing, false);
        let mut seen_min = 255;
        let mut seen_max = 0;
        for step in 1..=600 {
            engine.apply(step * 11, &mut buf, &mut rng);
            seen_min = seen_min.min(engine.brightness());
            seen_max = seen_max.max(engine.brightness());
        }
        assert_eq!(seen_min, 2);
        assert!(seen_max >= 250);
        // The buffer itself is untouched
        assert!(buf.iter().all(|p| *p == Rgba::opaque(Rgb::WHITE)));
    }

    #[test]
    fn test_flicker_is_on_or_off() {
        let mut engine = OverlayEngine::new();
        let mut rng = StdRng::seed_from_u64(5);
        let mut buf = lit_buffer(16);
        engine.set_overlay(Overlay::Flicker, true);
        let mut on = 0;
        let mut off = 0;
        for step in 1..=200 {
            engine.apply(step * 151, &mut buf, &mut rng);
            match engine.brightness() {
                255 => on += 1,
                0 => off += 1,
                b => panic!("unexpected brightness {}", b),
            }
        }
        assert!(on > off && off > 0);
    }

    #[test]
    fn test_brightness_restored_without_dimming_overlay() {
        let mut engine = OverlayEngine::new();
        let mut rng = StdRng::seed_from_u64(5);
        let mut buf = lit_buffer(4);
        engine.set_overlay(Overlay::Breathing, false);
        engine.apply(11, &mut buf, &mut rng);
        assert_eq!(engine.brightness(), 2);
        engine.clear_transient();
        engine.apply(22, &mut buf, &mut rng);
        assert_eq!(engine.brightness(), 255);
    }

    #[test]
    fn test_frozen_decay_eats_frame() {
        let mut engine = OverlayEngine::new();
        let mut rng = StdRng::seed_from_u64(11);
        let mut buf = lit_buffer(32);
        engine.set_overlay(Overlay::FrozenDecay, true);
        for step in 0..300 {
            engine.apply(step * 10, &mut buf, &mut rng);
        }
        assert!(buf.iter().any(|p| p.a < 255));
    }
}
