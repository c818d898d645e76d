// Fill patterns - Whole-strip fills, scrolling streams and palette fades

use rand::Rng;
use tracing::warn;

use super::{Direction, Frame};
use crate::types::{cyclic_gradient, gradient_at, hsv, Rgb, Rgba, HUE_ALIEN_GREEN, HUE_ORANGE, HUE_PURPLE, HUE_RED};

const SOLID_INTERVAL: u64 = 200;
const SPARKLE_INTERVAL: u64 = 20;
const SPARKLE_FADE: u8 = 32;
const MATRIX_INTERVAL: u64 = 50;
const MATRIX_GREEN: Rgb = Rgb::new(0x00, 0xFF, 0x40);

pub fn solid(f: &mut Frame) {
    if f.ready(SOLID_INTERVAL) {
        f.leds.fill(Rgba::opaque(f.color));
    }
}

pub fn sparkle(f: &mut Frame) {
    if !f.ready(SPARKLE_INTERVAL) {
        return;
    }
    f.leds.fade_to_black_by(SPARKLE_FADE);
    let i = f.rng.gen_range(0..f.len());
    f.leds[i] = Rgba::opaque(f.color);
}

// Green code rain: the stream shifts one cell and a new head is rolled
pub fn matrix_rain(f: &mut Frame) {
    if !f.ready(MATRIX_INTERVAL) {
        return;
    }
    let head = if f.rng.gen::<u8>() > 205 {
        Rgba::opaque(MATRIX_GREEN)
    } else {
        Rgba::TRANSPARENT
    };
    if let Some(px) = f.leds.shift(f.direction == Direction::Backward) {
        *px = head;
    }
}

pub struct DynamicRainbow {
    delta: usize,
}

impl DynamicRainbow {
    const INTERVAL: u64 = 50;

    pub fn new() -> Self {
        DynamicRainbow { delta: 0 }
    }

    pub fn draw(&mut self, f: &mut Frame) {
        if !f.ready(Self::INTERVAL) {
            return;
        }
        let len = f.len();
        let hue = ((len - 1 - self.delta) * 255 / len) as u8;
        if let Some(px) = f.leds.shift(f.direction == Direction::Backward) {
            *px = Rgba::opaque(hsv(hue, 255, 255));
        }
        self.delta = (self.delta + 1) % len;
    }
}

// Whole strip walks a looping palette, one byte of phase per draw
pub struct PaletteFade {
    gradient: Option<colorgrad::Gradient>,
    fallback: Rgb,
    phase: u8,
}

impl PaletteFade {
    const INTERVAL: u64 = 50;

    pub fn halloween() -> Self {
        let colors = [
            hsv(HUE_ORANGE, 255, 255),
            hsv(HUE_PURPLE, 255, 255),
            hsv(HUE_RED, 255, 255),
            hsv(HUE_ALIEN_GREEN, 255, 255),
        ];
        let gradient = match cyclic_gradient(&colors) {
            Ok(g) => Some(g),
            Err(e) => {
                warn!("halloween palette unavailable: {}", e);
                None
            }
        };
        PaletteFade { gradient, fallback: colors[0], phase: 0 }
    }

    fn color(&self) -> Rgb {
        match &self.gradient {
            Some(g) => gradient_at(g, self.phase as f64 / 255.0),
            None => self.fallback,
        }
    }

    pub fn draw(&mut self, f: &mut Frame) {
        if !f.ready(Self::INTERVAL) {
            return;
        }
        f.leds.fill(Rgba::opaque(self.color()));
        self.phase = self.phase.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::testing::Rig;

    #[test]
    fn test_solid_waits_for_interval() {
        let mut rig = Rig::new(4, 4);
        solid(&mut rig.step(100));
        assert_eq!(rig.lit(), 0);
        solid(&mut rig.step(101));
        assert_eq!(rig.lit(), 16);
    }

    #[test]
    fn test_sparkle_lights_one_new_cell() {
        let mut rig = Rig::new(8, 8);
        sparkle(&mut rig.step(21));
        assert_eq!(rig.lit(), 1);
    }

    #[test]
    fn test_matrix_rain_only_green_or_transparent() {
        let mut rig = Rig::new(8, 4);
        for _ in 0..200 {
            matrix_rain(&mut rig.step(51));
        }
        for px in rig.leds.iter() {
            assert!(px.is_transparent() || px.rgb() == MATRIX_GREEN);
        }
        assert!(rig.lit() > 0);
    }

    #[test]
    fn test_dynamic_rainbow_shifts_hues() {
        let mut rig = Rig::new(8, 1);
        let mut rainbow = DynamicRainbow::new();
        rainbow.draw(&mut rig.step(51));
        let first = rig.leds[0];
        rainbow.draw(&mut rig.step(51));
        assert_eq!(rig.leds[1], first);
        assert_ne!(rig.leds[0], first);
        assert_eq!(first.rgb(), hsv((7 * 255 / 8) as u8, 255, 255));
    }

    #[test]
    fn test_dynamic_rainbow_backward_fills_from_end() {
        let mut rig = Rig::new(8, 1);
        rig.direction = Direction::Backward;
        let mut rainbow = DynamicRainbow::new();
        rainbow.draw(&mut rig.step(51));
        assert_eq!(rig.leds[7].a, 255);
        assert!(rig.leds[0].is_transparent());
    }

    #[test]
    fn test_palette_fade_fills_uniformly() {
        let mut rig = Rig::new(4, 2);
        let mut fade = PaletteFade::halloween();
        fade.draw(&mut rig.step(51));
        let first = rig.leds[0];
        assert!(rig.leds.iter().all(|p| *p == first));
        assert_eq!(fade.phase, 1);
    }
}
