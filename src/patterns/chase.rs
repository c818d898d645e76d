// Chase patterns - Spaced chases and running sine waves with oscillating speed

use super::Frame;
use crate::math8::sin8;
use crate::timing::IntervalTimer;
use crate::types::Rgba;

/// Swings a draw interval between its initial value and zero, one step per
/// update period, reversing at either bound. Paced on its own timer.
pub struct Pacer {
    initial: i64,
    interval: i64,
    delta: i64,
    period: u64,
    timer: IntervalTimer,
}

impl Pacer {
    pub fn new(initial: u64, step: u64, period: u64) -> Self {
        Pacer {
            initial: initial as i64,
            interval: initial as i64,
            delta: step as i64,
            period,
            timer: IntervalTimer::new(),
        }
    }

    pub fn interval(&mut self, now: u64) -> u64 {
        if self.timer.ready(now, self.period) {
            self.interval -= self.delta;
            if self.interval <= 0 || self.interval >= self.initial {
                self.delta = -self.delta;
            }
            self.interval = self.interval.clamp(0, self.initial);
        }
        self.interval as u64
    }
}

// One routine for theater chase, checkerboard and binary system: every
// `spacing`-th cell lit, the phase stepping by one each draw
pub struct Chase {
    spacing: usize,
    phase: usize,
    pacer: Pacer,
}

impl Chase {
    pub fn new(spacing: usize) -> Self {
        Chase { spacing: spacing.max(1), phase: 0, pacer: Pacer::new(200, 10, 1000) }
    }

    pub fn draw(&mut self, f: &mut Frame) {
        let interval = self.pacer.interval(f.now);
        if !f.ready(interval) {
            return;
        }
        let len = f.len();
        let fade = 255usize.saturating_sub(self.spacing * 8) as u8;
        f.leds.fade_to_black_by(fade);

        let color = Rgba::opaque(f.color);
        let mut i = self.phase;
        while i < len {
            *f.led(i) = color;
            i += self.spacing;
        }
        self.phase = (self.phase + 1) % self.spacing;
    }
}

pub struct RunningLights {
    waves: usize,
    phase: usize,
    pacer: Pacer,
}

impl RunningLights {
    pub fn new(waves: usize) -> Self {
        RunningLights { waves: waves.max(1), phase: 0, pacer: Pacer::new(30, 2, 1000) }
    }

    pub fn draw(&mut self, f: &mut Frame) {
        let interval = self.pacer.interval(f.now);
        if !f.ready(interval) {
            return;
        }
        let len = f.len();
        let span = (len - 1).max(1);
        for i in 0..len {
            // Angle wraps at a byte, giving `waves` periods over the strip
            let angle = (self.waves * (i + self.phase) * 255 / span) as u8;
            let color = f.color.scale(sin8(angle));
            // The waves run toward the start of the strip
            *f.led(len - 1 - i) = Rgba::opaque(color);
        }
        self.phase = (self.phase + 1) % (len / self.waves).max(1);
    }
}
