// Grid patterns - Effects drawn in x/y space and mapped through the serpentine

use super::{Direction, Frame};
use crate::math8::sin8;
use crate::serpentine::Point;
use crate::types::{hsv, Rgba};

fn put(f: &mut Frame, x: usize, y: usize, color: Rgba) {
    let p = Point::new(x, y);
    if f.grid.contains(p) {
        let i = f.grid.to_linear(p);
        if i < f.len() {
            f.leds[i] = color;
        }
    }
}

/// A rod hanging from the top-center pivot with a bob that swings on a sine.
pub struct Pendulum {
    phase: u8,
}

impl Pendulum {
    const INTERVAL: u64 = 20;
    const FADE: u8 = 40;
    const PHASE_STEP: u8 = 4;

    pub fn new() -> Self {
        Pendulum { phase: 0 }
    }

    pub fn draw(&mut self, f: &mut Frame) {
        if !f.ready(Self::INTERVAL) {
            return;
        }
        let (cols, rows) = (f.grid.cols, f.grid.rows);
        if cols == 0 || rows == 0 {
            return;
        }
        f.leds.fade_to_black_by(Self::FADE);

        let pivot_x = ((cols - 1) / 2) as i32;
        let bob_x = ((sin8(self.phase) as usize * (cols - 1) + 127) / 255) as i32;
        let bob_y = rows - 1;

        let rod = Rgba::opaque(f.color.scale(96));
        if bob_y > 0 {
            for y in 0..bob_y {
                let x = pivot_x + (bob_x - pivot_x) * y as i32 / bob_y as i32;
                put(f, x as usize, y, rod);
            }
        }
        let bob = Rgba::opaque(f.color);
        put(f, bob_x as usize, bob_y, bob);

        self.phase = match f.direction {
            Direction::Forward => self.phase.wrapping_add(Self::PHASE_STEP),
            Direction::Backward => self.phase.wrapping_sub(Self::PHASE_STEP),
        };
    }
}

// Diamond-shaped hue rings expanding out of the center
pub struct Funky {
    phase: u8,
}

impl Funky {
    const INTERVAL: u64 = 40;
    const RING_HUE_STEP: i32 = 16;
    const PHASE_HUE_STEP: i32 = 8;

    pub fn new() -> Self {
        Funky { phase: 0 }
    }

    pub fn draw(&mut self, f: &mut Frame) {
        if !f.ready(Self::INTERVAL) {
            return;
        }
        let (cols, rows) = (f.grid.cols, f.grid.rows);
        let (cx, cy) = ((cols / 2) as i32, (rows / 2) as i32);
        let base = f.color.hue() as i32;
        for y in 0..rows {
            for x in 0..cols {
                let ring = (x as i32 - cx).abs() + (y as i32 - cy).abs();
                let hue = base + ring * Self::RING_HUE_STEP - self.phase as i32 * Self::PHASE_HUE_STEP;
                put(f, x, y, Rgba::opaque(hsv(hue.rem_euclid(256) as u8, 255, 255)));
            }
        }
        self.phase = match f.direction {
            Direction::Forward => self.phase.wrapping_add(1),
            Direction::Backward => self.phase.wrapping_sub(1),
        };
    }
}

/// Columns of alternating theme and complement bands, neighbouring columns
/// sliding in opposite directions.
pub struct Riffle {
    offset: i64,
}

impl Riffle {
    const INTERVAL: u64 = 80;

    pub fn new() -> Self {
        Riffle { offset: 0 }
    }

    pub fn draw(&mut self, f: &mut Frame) {
        if !f.ready(Self::INTERVAL) {
            return;
        }
        let (cols, rows) = (f.grid.cols, f.grid.rows);
        let band = (rows / 4).max(1) as i64;
        let theme = Rgba::opaque(f.color);
        let complement = Rgba::opaque(f.color.complement());
        for x in 0..cols {
            let shift = if x % 2 == 0 { self.offset } else { -self.offset };
            for y in 0..rows {
                let color = if (y as i64 + shift).rem_euclid(2 * band) < band { theme } else { complement };
                put(f, x, y, color);
            }
        }
        let step = match f.direction {
            Direction::Forward => 1,
            Direction::Backward => -1,
        };
        self.offset = (self.offset + step).rem_euclid(2 * band);
    }
}
