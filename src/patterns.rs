// Patterns module - Pattern ids, direction, and the per-layer pattern engine
//
// Every generator keeps its own state struct inside `PatternState`. The state
// is rebuilt whenever the pattern that ran last frame differs from the one
// about to run, so switching away and back always starts a pattern fresh.

mod chase;
mod fill;
mod grid;
mod particles;
mod puckman;
mod race;
mod sweep;

pub use puckman::PuckManEvent;

use rand::rngs::StdRng;
use tracing::debug;

use crate::buffer::PixelBuffer;
use crate::error::{EngineError, EngineResult};
use crate::serpentine::Serpentine;
use crate::timing::{Cadence, IntervalTimer};
use crate::types::{Rgb, Rgba};

pub const DEFAULT_AUTOCYCLE_MS: u64 = 30_000;
pub const DEFAULT_FLIPFLOP_MS: u64 = 6_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pattern {
    DynamicRainbow,
    Solid,
    Orbit,
    RunningLights,
    Riffle,
    Sparkle,
    Weave,
    Pendulum,
    BinarySystem,
    ShootingStar,
    PuckMan,
    Cylon,
    Funky,
    NoPattern,
    TheaterChase,
    Mitosis,
    Bubbles,
    Matrix,
    StarshipRace,
    BouncingBalls,
    HalloweenFade,
    HalloweenOrbit,
    Checkerboard,
}

impl Pattern {
    /// Autocycle order; NoPattern is never cycled to.
    pub const CYCLE: [Pattern; 22] = [
        Pattern::DynamicRainbow,
        Pattern::Solid,
        Pattern::Orbit,
        Pattern::RunningLights,
        Pattern::Riffle,
        Pattern::Sparkle,
        Pattern::Weave,
        Pattern::Pendulum,
        Pattern::BinarySystem,
        Pattern::ShootingStar,
        Pattern::PuckMan,
        Pattern::Cylon,
        Pattern::Funky,
        Pattern::TheaterChase,
        Pattern::Mitosis,
        Pattern::Bubbles,
        Pattern::Matrix,
        Pattern::StarshipRace,
        Pattern::BouncingBalls,
        Pattern::HalloweenFade,
        Pattern::HalloweenOrbit,
        Pattern::Checkerboard,
    ];

    pub fn from_id(id: u8) -> EngineResult<Self> {
        let pattern = match id {
            0 => Pattern::DynamicRainbow,
            1 => Pattern::Solid,
            2 => Pattern::Orbit,
            3 => Pattern::RunningLights,
            4 => Pattern::Riffle,
            5 => Pattern::Sparkle,
            6 => Pattern::Weave,
            7 => Pattern::Pendulum,
            8 => Pattern::BinarySystem,
            9 => Pattern::ShootingStar,
            10 => Pattern::PuckMan,
            11 => Pattern::Cylon,
            12 => Pattern::Funky,
            50 => Pattern::NoPattern,
            51 => Pattern::TheaterChase,
            52 => Pattern::Mitosis,
            54 => Pattern::Bubbles,
            55 => Pattern::Matrix,
            56 => Pattern::StarshipRace,
            57 => Pattern::BouncingBalls,
            58 => Pattern::HalloweenFade,
            59 => Pattern::HalloweenOrbit,
            60 => Pattern::Checkerboard,
            _ => return Err(EngineError::UnknownPattern(id)),
        };
        Ok(pattern)
    }

    pub fn id(&self) -> u8 {
        match self {
            Pattern::DynamicRainbow => 0,
            Pattern::Solid => 1,
            Pattern::Orbit => 2,
            Pattern::RunningLights => 3,
            Pattern::Riffle => 4,
            Pattern::Sparkle => 5,
            Pattern::Weave => 6,
            Pattern::Pendulum => 7,
            Pattern::BinarySystem => 8,
            Pattern::ShootingStar => 9,
            Pattern::PuckMan => 10,
            Pattern::Cylon => 11,
            Pattern::Funky => 12,
            Pattern::NoPattern => 50,
            Pattern::TheaterChase => 51,
            Pattern::Mitosis => 52,
            Pattern::Bubbles => 54,
            Pattern::Matrix => 55,
            Pattern::StarshipRace => 56,
            Pattern::BouncingBalls => 57,
            Pattern::HalloweenFade => 58,
            Pattern::HalloweenOrbit => 59,
            Pattern::Checkerboard => 60,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Pattern::DynamicRainbow => "dynamic_rainbow",
            Pattern::Solid => "solid",
            Pattern::Orbit => "orbit",
            Pattern::RunningLights => "running_lights",
            Pattern::Riffle => "riffle",
            Pattern::Sparkle => "sparkle",
            Pattern::Weave => "weave",
            Pattern::Pendulum => "pendulum",
            Pattern::BinarySystem => "binary_system",
            Pattern::ShootingStar => "shooting_star",
            Pattern::PuckMan => "puck_man",
            Pattern::Cylon => "cylon",
            Pattern::Funky => "funky",
            Pattern::NoPattern => "none",
            Pattern::TheaterChase => "theater_chase",
            Pattern::Mitosis => "mitosis",
            Pattern::Bubbles => "bubbles",
            Pattern::Matrix => "matrix",
            Pattern::StarshipRace => "starship_race",
            Pattern::BouncingBalls => "bouncing_balls",
            Pattern::HalloweenFade => "halloween_fade",
            Pattern::HalloweenOrbit => "halloween_orbit",
            Pattern::Checkerboard => "checkerboard",
        }
    }

    /// Next pattern in the cycle and whether the cycle wrapped around.
    pub fn next(&self) -> (Pattern, bool) {
        match Self::CYCLE.iter().position(|p| p == self) {
            Some(i) if i + 1 < Self::CYCLE.len() => (Self::CYCLE[i + 1], false),
            Some(_) => (Self::CYCLE[0], true),
            None => (Self::CYCLE[0], false),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub fn from_reverse(reverse: bool) -> Self {
        if reverse {
            Direction::Backward
        } else {
            Direction::Forward
        }
    }

    pub fn map(&self, index: usize, len: usize) -> usize {
        match self {
            Direction::Forward => index,
            Direction::Backward => len - 1 - index,
        }
    }
}

/// Everything a generator may touch while drawing one frame.
pub(crate) struct Frame<'a> {
    pub leds: &'a mut PixelBuffer,
    pub grid: Serpentine,
    pub color: Rgb,
    pub direction: Direction,
    pub now: u64,
    pub rng: &'a mut StdRng,
    timer: &'a mut IntervalTimer,
    events: &'a mut Vec<u8>,
}

impl<'a> Frame<'a> {
    pub fn len(&self) -> usize {
        self.leds.len()
    }

    /// Shared pattern pacing; false means "not yet, leave the buffer alone".
    pub fn ready(&mut self, interval: u64) -> bool {
        self.timer.ready(self.now, interval)
    }

    /// Index after applying the travel direction.
    pub fn at(&self, index: usize) -> usize {
        self.direction.map(index, self.leds.len())
    }

    /// Pixel at `index` after applying the travel direction.
    pub fn led(&mut self, index: usize) -> &mut Rgba {
        let i = self.at(index);
        &mut self.leds[i]
    }

    pub fn emit(&mut self, code: u8) {
        self.events.push(code);
    }

    /// Smears the pixel at `pos` over `blur` neighbours, behind it for
    /// positive values and ahead of it for negative ones.
    pub fn motion_blur(&mut self, blur: i32, pos: usize) {
        let len = self.len();
        let span = blur.unsigned_abs() as usize;
        if span == 0 || pos >= len {
            return;
        }
        let source = *self.led(pos);
        for i in 1..=span {
            let target = if blur > 0 {
                match pos.checked_sub(i) {
                    Some(t) => t,
                    None => break,
                }
            } else if pos + i < len {
                pos + i
            } else {
                break;
            };
            let px = self.led(target);
            *px += source;
            px.fade_to_black_by((120 + i * 120 / span).min(255) as u8);
        }
    }
}

enum PatternState {
    Idle,
    Solid,
    Sparkle,
    Orbit(sweep::Orbit),
    Cylon(sweep::Cylon),
    Weave(sweep::Weave),
    Mitosis(sweep::Mitosis),
    HueOrbit(sweep::HueOrbit),
    ShootingStar(sweep::ShootingStar),
    Chase(chase::Chase),
    RunningLights(chase::RunningLights),
    Rainbow(fill::DynamicRainbow),
    MatrixRain,
    PaletteFade(fill::PaletteFade),
    Pendulum(grid::Pendulum),
    Funky(grid::Funky),
    Riffle(grid::Riffle),
    Bubbles(particles::Bubbles),
    Balls(particles::BouncingBalls),
    Race(race::StarshipRace),
    PuckMan(puckman::PuckMan),
}

impl PatternState {
    fn fresh(pattern: Pattern, grid: Serpentine, rng: &mut StdRng) -> Self {
        let len = grid.len();
        match pattern {
            Pattern::NoPattern => PatternState::Idle,
            Pattern::Solid => PatternState::Solid,
            Pattern::Sparkle => PatternState::Sparkle,
            Pattern::Orbit => PatternState::Orbit(sweep::Orbit::new()),
            Pattern::Cylon => PatternState::Cylon(sweep::Cylon::new()),
            Pattern::Weave => PatternState::Weave(sweep::Weave::new()),
            Pattern::Mitosis => PatternState::Mitosis(sweep::Mitosis::new(len)),
            Pattern::HalloweenOrbit => PatternState::HueOrbit(sweep::HueOrbit::new()),
            Pattern::ShootingStar => PatternState::ShootingStar(sweep::ShootingStar::new(len, rng)),
            Pattern::TheaterChase => PatternState::Chase(chase::Chase::new(3)),
            Pattern::Checkerboard => PatternState::Chase(chase::Chase::new(2)),
            Pattern::BinarySystem => PatternState::Chase(chase::Chase::new(16)),
            Pattern::RunningLights => PatternState::RunningLights(chase::RunningLights::new(3)),
            Pattern::DynamicRainbow => PatternState::Rainbow(fill::DynamicRainbow::new()),
            Pattern::Matrix => PatternState::MatrixRain,
            Pattern::HalloweenFade => PatternState::PaletteFade(fill::PaletteFade::halloween()),
            Pattern::Pendulum => PatternState::Pendulum(grid::Pendulum::new()),
            Pattern::Funky => PatternState::Funky(grid::Funky::new()),
            Pattern::Riffle => PatternState::Riffle(grid::Riffle::new()),
            Pattern::Bubbles => PatternState::Bubbles(particles::Bubbles::new()),
            Pattern::BouncingBalls => PatternState::Balls(particles::BouncingBalls::new()),
            Pattern::StarshipRace => PatternState::Race(race::StarshipRace::new(len)),
            Pattern::PuckMan => PatternState::PuckMan(puckman::PuckMan::new(len)),
        }
    }

    fn draw(&mut self, f: &mut Frame) {
        match self {
            PatternState::Idle => {}
            PatternState::Solid => fill::solid(f),
            PatternState::Sparkle => fill::sparkle(f),
            PatternState::Orbit(s) => s.draw(f),
            PatternState::Cylon(s) => s.draw(f),
            PatternState::Weave(s) => s.draw(f),
            PatternState::Mitosis(s) => s.draw(f),
            PatternState::HueOrbit(s) => s.draw(f),
            PatternState::ShootingStar(s) => s.draw(f),
            PatternState::Chase(s) => s.draw(f),
            PatternState::RunningLights(s) => s.draw(f),
            PatternState::Rainbow(s) => s.draw(f),
            PatternState::MatrixRain => fill::matrix_rain(f),
            PatternState::PaletteFade(s) => s.draw(f),
            PatternState::Pendulum(s) => s.draw(f),
            PatternState::Funky(s) => s.draw(f),
            PatternState::Riffle(s) => s.draw(f),
            PatternState::Bubbles(s) => s.draw(f),
            PatternState::Balls(s) => s.draw(f),
            PatternState::Race(s) => s.draw(f),
            PatternState::PuckMan(s) => s.draw(f),
        }
    }
}

/// Runs the active pattern for one layer, plus autocycle and flipflop.
pub struct PatternEngine {
    grid: Serpentine,
    pattern: Pattern,
    last_ran: Option<Pattern>,
    state: PatternState,
    reverse: bool,
    timer: IntervalTimer,
    autocycle: Cadence,
    flipflop: Cadence,
}

impl PatternEngine {
    pub fn new(grid: Serpentine) -> Self {
        PatternEngine {
            grid,
            pattern: Pattern::NoPattern,
            last_ran: None,
            state: PatternState::Idle,
            reverse: false,
            timer: IntervalTimer::new(),
            autocycle: Cadence::new(DEFAULT_AUTOCYCLE_MS),
            flipflop: Cadence::new(DEFAULT_FLIPFLOP_MS),
        }
    }

    pub fn pattern(&self) -> Pattern {
        self.pattern
    }

    pub fn reverse(&self) -> bool {
        self.reverse
    }

    pub fn set_pattern(&mut self, pattern: Pattern, reverse: bool, disable_auto_timers: bool) {
        if disable_auto_timers {
            self.autocycle.enabled = false;
            self.flipflop.enabled = false;
        }
        self.pattern = if pattern == Pattern::NoPattern && self.autocycle.enabled {
            pattern.next().0
        } else {
            pattern
        };
        self.reverse = reverse;
        debug!(pattern = self.pattern.name(), reverse, "pattern selected");
    }

    /// Unknown ids select NoPattern and report the error.
    pub fn set_pattern_id(&mut self, id: u8, reverse: bool, disable_auto_timers: bool) -> EngineResult<()> {
        match Pattern::from_id(id) {
            Ok(pattern) => {
                self.set_pattern(pattern, reverse, disable_auto_timers);
                Ok(())
            }
            Err(e) => {
                self.set_pattern(Pattern::NoPattern, reverse, disable_auto_timers);
                Err(e)
            }
        }
    }

    /// Advances to the next pattern; wrapping the cycle flips direction.
    pub fn increment_pattern(&mut self) {
        let (next, wrapped) = self.pattern.next();
        let reverse = if wrapped { !self.reverse } else { self.reverse };
        self.set_pattern(next, reverse, false);
    }

    pub fn set_autocycle(&mut self, interval: u64, enabled: bool) {
        self.autocycle.configure(interval, enabled);
    }

    pub fn set_flipflop(&mut self, interval: u64, enabled: bool) {
        self.flipflop.configure(interval, enabled);
    }

    pub fn autocycle_enabled(&self) -> bool {
        self.autocycle.enabled
    }

    /// Runs autocycle and flipflop; true when the active pattern changed.
    pub fn tick_timers(&mut self, now: u64) -> bool {
        let mut changed = false;
        if self.autocycle.due(now) {
            let before = self.pattern;
            self.increment_pattern();
            changed = before != self.pattern;
        }
        if self.flipflop.due(now) {
            self.reverse = !self.reverse;
        }
        changed
    }

    /// Draws one frame of the active pattern. Events raised by the pattern
    /// are appended to `events`.
    pub fn run(&mut self, now: u64, leds: &mut PixelBuffer, color: Rgb, rng: &mut StdRng, events: &mut Vec<u8>) {
        if self.last_ran != Some(self.pattern) {
            self.state = PatternState::fresh(self.pattern, self.grid, rng);
            if self.pattern == Pattern::Matrix {
                leds.clear();
            }
            self.last_ran = Some(self.pattern);
        }
        if leds.is_empty() {
            return;
        }

        let mut frame = Frame {
            leds,
            grid: self.grid,
            color,
            direction: Direction::from_reverse(self.reverse),
            now,
            rng,
            timer: &mut self.timer,
            events,
        };
        self.state.draw(&mut frame);
    }
}
