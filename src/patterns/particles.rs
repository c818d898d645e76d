// Particle patterns - Bubbles and bouncing balls thrown along the strip

use rand::Rng;

use super::Frame;
use crate::math8::lerp16by16;
use crate::types::hsv;

const PARTICLE_VALUE: u8 = 192;

fn strip_position(len: usize, height: u16) -> usize {
    let last = (len - 1).min(u16::MAX as usize) as u16;
    lerp16by16(0, last, height) as usize
}

/// Bubbles launched at random that rise quadratically and pop at the end.
pub struct Bubbles {
    times: [u8; Self::COUNT],
}

impl Bubbles {
    const INTERVAL: u64 = 100;
    const COUNT: usize = 8;
    const SPAWN_ODDS: u8 = 33;
    const TIME_STEP: u8 = 10;

    pub fn new() -> Self {
        Bubbles { times: [0; Self::COUNT] }
    }

    pub fn draw(&mut self, f: &mut Frame) {
        if !f.ready(Self::INTERVAL) {
            return;
        }
        let len = f.len();
        f.leds.clear();

        // Largest launch time whose first step still stays near the start
        let launch_max = ((u16::MAX as usize / len) as f64).sqrt() as u8;
        let base_hue = f.color.hue();

        for i in 0..Self::COUNT {
            if self.times[i] == 0 && f.rng.gen_range(0..Self::SPAWN_ODDS) == 0 {
                self.times[i] = f.rng.gen_range(1..launch_max.max(2));
            }
            let t = self.times[i];
            if t == 0 {
                continue;
            }

            let height = if t == u8::MAX {
                u16::MAX
            } else {
                (t as u32 * (t as u32 + 1)).min(u16::MAX as u32) as u16
            };
            let pos = strip_position(len, height);
            let hue = base_hue.wrapping_add((i * (256 / Self::COUNT)) as u8);
            *f.led(pos) += hsv(hue, 255, PARTICLE_VALUE);
            f.motion_blur((3 * pos / len) as i32, pos);

            self.times[i] = if t == u8::MAX { 0 } else { t.saturating_add(Self::TIME_STEP) };
        }
    }
}

/// Balls thrown up with random velocity, falling back under constant gravity.
pub struct BouncingBalls {
    times: [u16; Self::COUNT],
    velocities: [u16; Self::COUNT],
}

impl BouncingBalls {
    const INTERVAL: u64 = 40;
    const COUNT: usize = 5;
    // 512 would overflow the height
    const VI_MAX: u16 = 510;
    const TIME_STEP: u16 = 4;
    const BLUR_LENGTH: i32 = 3;

    pub fn new() -> Self {
        BouncingBalls { times: [0; Self::COUNT], velocities: [0; Self::COUNT] }
    }

    pub fn draw(&mut self, f: &mut Frame) {
        if !f.ready(Self::INTERVAL) {
            return;
        }
        let len = f.len();
        f.leds.clear();

        for i in 0..Self::COUNT {
            let t = self.times[i];
            let vi = self.velocities[i];
            let (height, velocity) = if t >= vi {
                // Landed: throw again
                self.times[i] = 0;
                self.velocities[i] = f.rng.gen_range(Self::VI_MAX / 3..=Self::VI_MAX);
                (0, 0)
            } else {
                ((vi - t) * t, vi as i32 - 2 * t as i32)
            };

            let pos = strip_position(len, height);
            *f.led(pos) += hsv((i * (256 / Self::COUNT)) as u8, 255, PARTICLE_VALUE);
            f.motion_blur(Self::BLUR_LENGTH * velocity / Self::VI_MAX as i32, pos);

            self.times[i] += Self::TIME_STEP;
        }
    }
}
