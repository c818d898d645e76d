// Sweep patterns - Single cursors travelling along the strip

use rand::Rng;

use super::{Direction, Frame};
use crate::types::{hsv, Rgba, HUE_ALIEN_GREEN, HUE_ORANGE, HUE_PURPLE, HUE_RED};

/// Next cursor position for an orbit travelling in `direction`, with wrap.
fn orbit_step(pos: usize, len: usize, direction: Direction) -> usize {
    match direction {
        Direction::Forward => (pos + 1) % len,
        Direction::Backward => (pos + len - 1) % len,
    }
}

fn orbit_start(len: usize, direction: Direction) -> usize {
    match direction {
        Direction::Forward => 0,
        Direction::Backward => len - 1,
    }
}

pub struct Orbit {
    pos: Option<usize>,
}

impl Orbit {
    const INTERVAL: u64 = 20;
    const FADE: u8 = 20;

    pub fn new() -> Self {
        Orbit { pos: None }
    }

    #[cfg(test)]
    pub fn position(&self) -> Option<usize> {
        self.pos
    }

    pub fn draw(&mut self, f: &mut Frame) {
        if !f.ready(Self::INTERVAL) {
            return;
        }
        let len = f.len();
        f.leds.fade_to_black_by(Self::FADE);
        let pos = self.pos.unwrap_or_else(|| orbit_start(len, f.direction)).min(len - 1);
        f.leds[pos] = Rgba::opaque(f.color);
        self.pos = Some(orbit_step(pos, len, f.direction));
    }
}

// Halloween orbit: no fade, the hue changes once per lap
pub struct HueOrbit {
    pos: Option<usize>,
    hue_index: usize,
}

impl HueOrbit {
    const INTERVAL: u64 = 20;
    const HUES: [u8; 6] = [HUE_ORANGE, HUE_PURPLE, HUE_ORANGE, HUE_RED, HUE_ORANGE, HUE_ALIEN_GREEN];

    pub fn new() -> Self {
        HueOrbit { pos: None, hue_index: 0 }
    }

    pub fn draw(&mut self, f: &mut Frame) {
        if !f.ready(Self::INTERVAL) {
            return;
        }
        let len = f.len();
        let start = orbit_start(len, f.direction);
        let pos = self.pos.unwrap_or(start).min(len - 1);
        f.leds[pos] = Rgba::opaque(hsv(Self::HUES[self.hue_index], 255, 255));
        let next = orbit_step(pos, len, f.direction);
        if next == start {
            self.hue_index = (self.hue_index + 1) % Self::HUES.len();
        }
        self.pos = Some(next);
    }
}

pub struct Cylon {
    pos: usize,
    forward: bool,
}

impl Cylon {
    const INTERVAL: u64 = 20;
    const FADE: u8 = 20;

    pub fn new() -> Self {
        Cylon { pos: 0, forward: true }
    }

    pub fn draw(&mut self, f: &mut Frame) {
        if !f.ready(Self::INTERVAL) {
            return;
        }
        let len = f.len();
        f.leds.fade_to_black_by(Self::FADE);
        let color = f.color;
        *f.led(self.pos.min(len - 1)) += color;

        if len < 2 {
            return;
        }
        if self.forward {
            self.pos += 1;
        } else {
            self.pos = self.pos.saturating_sub(1);
        }
        if self.pos == 0 || self.pos >= len - 1 {
            self.forward = !self.forward;
        }
    }
}

// Two cursors crossing each other: the theme color and its complement
pub struct Weave {
    pos: usize,
}

impl Weave {
    const INTERVAL: u64 = 60;
    const FADE: u8 = 20;

    pub fn new() -> Self {
        Weave { pos: 0 }
    }

    pub fn draw(&mut self, f: &mut Frame) {
        if !f.ready(Self::INTERVAL) {
            return;
        }
        let len = f.len();
        let pos = self.pos % len;
        f.leds.fade_to_black_by(Self::FADE);
        f.leds[pos] += f.color;
        f.leds[len - 1 - pos] += f.color.complement();
        self.pos = (pos + 2) % len;
    }
}

// Cells split from the middle and travel outward in both directions
pub struct Mitosis {
    start: usize,
    pos: usize,
}

impl Mitosis {
    const INTERVAL: u64 = 50;
    const FADE: u8 = 30;
    const CELL_SIZE: usize = 1;

    pub fn new(len: usize) -> Self {
        Mitosis { start: len / 2, pos: len / 2 }
    }

    pub fn draw(&mut self, f: &mut Frame) {
        if !f.ready(Self::INTERVAL) {
            return;
        }
        let len = f.len();
        f.leds.fade_to_black_by(Self::FADE);
        let color = Rgba::opaque(f.color);
        for i in 0..Self::CELL_SIZE {
            let outward = self.pos + (Self::CELL_SIZE - 1) - i;
            if outward < len {
                f.leds[outward] = color;
                f.leds[len - 1 - outward] = color;
            }
        }
        self.pos += 1;
        if self.pos + (Self::CELL_SIZE - 1) >= len {
            self.pos = self.start;
        }
    }
}

pub struct ShootingStar {
    start: usize,
    stop: usize,
    pos: usize,
    cooled_at: Option<u64>,
}

impl ShootingStar {
    const INTERVAL: u64 = 5;
    const SIZE: usize = 5;
    const TRAIL_DECAY: u8 = 40;
    const STARS_PER_MINUTE: u64 = 27;

    pub fn new<R: Rng>(len: usize, rng: &mut R) -> Self {
        let (start, stop) = Self::pick_run(len, rng);
        ShootingStar { start, stop, pos: start, cooled_at: None }
    }

    #[cfg(test)]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[cfg(test)]
    pub fn start(&self) -> usize {
        self.start
    }

    // Start somewhere in the first quarter, stop somewhere past the middle
    fn pick_run<R: Rng>(len: usize, rng: &mut R) -> (usize, usize) {
        let start = rng.gen_range(0..(len / 4).max(1));
        let stop_lo = (Self::SIZE + len / 2).min(len.saturating_sub(1));
        let stop = rng.gen_range(stop_lo..len.max(stop_lo + 1));
        (start, stop)
    }

    /// Pause between stars so roughly STARS_PER_MINUTE appear.
    fn cooldown(len: usize) -> u64 {
        let busy = Self::STARS_PER_MINUTE * len as u64 * Self::INTERVAL;
        60_000u64.saturating_sub(busy) / Self::STARS_PER_MINUTE
    }

    pub fn draw(&mut self, f: &mut Frame) {
        if !f.ready(Self::INTERVAL) {
            return;
        }
        let len = f.len();
        f.leds.fade_randomly(f.rng, 128, Self::TRAIL_DECAY);

        let cooling = match self.cooled_at {
            Some(at) => f.now.saturating_sub(at) <= Self::cooldown(len),
            None => false,
        };
        if cooling {
            return;
        }

        let color = f.color;
        for i in 0..Self::SIZE {
            let idx = self.pos + (Self::SIZE - 1) - i;
            if idx < len {
                *f.led(idx) += color;
            }
        }
        self.pos += 1;
        if self.pos + (Self::SIZE - 1) >= self.stop + 1 {
            let (start, stop) = Self::pick_run(len, f.rng);
            self.start = start;
            self.stop = stop;
            self.pos = start;
            self.cooled_at = Some(f.now);
        }
    }
}
