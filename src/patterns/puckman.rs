// Puck-Man - A chomper eating dots, chased by four ghosts until it gets the power pellet

use super::Frame;
use crate::types::{hsv, Rgb, Rgba, HUE_AQUA, HUE_BLUE, HUE_ORANGE, HUE_PINK, HUE_RED, HUE_YELLOW};

/// Notifications raised through the layer callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PuckManEvent {
    CycleRestarted = 0,
    PowerPhase = 1,
    GhostCaught = 2,
}

impl PuckManEvent {
    pub fn code(self) -> u8 {
        self as u8
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Dot {
    Eaten,
    Dot,
    Pellet,
}

#[derive(Clone, Copy, Debug)]
struct Ghost {
    hue: u8,
    pos: usize,
    visible: bool,
}

pub struct PuckMan {
    pos: usize,
    delta: i64,
    ghosts: [Ghost; 4],
    ghost_delta: i64,
    pellet: usize,
    flash: bool,
    dots: Vec<Dot>,
    speed_jumps: u8,
    powered: bool,
}

impl PuckMan {
    const INTERVAL: u64 = 150;
    const GHOST_HUES: [u8; 4] = [HUE_RED, HUE_PINK, HUE_AQUA, HUE_ORANGE];

    pub fn new(len: usize) -> Self {
        let mut ghosts = [Ghost { hue: 0, pos: 0, visible: true }; 4];
        for (i, ghost) in ghosts.iter_mut().enumerate() {
            ghost.hue = Self::GHOST_HUES[i];
        }
        PuckMan {
            pos: 0,
            delta: 1,
            ghosts,
            ghost_delta: 1,
            pellet: Self::pellet_position(len),
            flash: true,
            dots: vec![Dot::Eaten; len],
            speed_jumps: 0,
            powered: false,
        }
    }

    /// Three sixteenths of the way along, on an even (dotted) cell.
    pub fn pellet_position(len: usize) -> usize {
        (3 * len / 16) & !1
    }

    fn wrap(pos: usize, delta: i64, len: usize) -> usize {
        (pos as i64 + delta).rem_euclid(len as i64) as usize
    }

    fn restart(&mut self, len: usize) {
        for (i, ghost) in self.ghosts.iter_mut().enumerate() {
            ghost.pos = Self::wrap(0, -(i as i64 + 2), len);
            ghost.visible = true;
        }
        self.delta = 1;
        self.ghost_delta = 1;
        self.speed_jumps = 0;
        self.powered = false;
        self.pellet = Self::pellet_position(len);
        for (i, dot) in self.dots.iter_mut().enumerate() {
            if i % 2 == 0 {
                *dot = Dot::Dot;
            }
        }
        if let Some(dot) = self.dots.get_mut(self.pellet) {
            *dot = Dot::Pellet;
        }
    }

    pub fn draw(&mut self, f: &mut Frame) {
        if !f.ready(Self::INTERVAL) {
            return;
        }
        let len = f.len();
        if self.dots.len() != len {
            self.dots = vec![Dot::Eaten; len];
        }
        f.leds.clear();

        if self.pos == 0 {
            self.restart(len);
            f.emit(PuckManEvent::CycleRestarted.code());
        }

        for i in (0..len).step_by(2) {
            *f.led(i) = Rgba::opaque(if self.dots[i] == Dot::Dot { Rgb::WHITE } else { Rgb::BLACK });
        }

        let pellet_left = self.dots[self.pellet] == Dot::Pellet;
        if pellet_left {
            let color = if self.flash { hsv(HUE_RED, 255, 255) } else { Rgb::BLACK };
            *f.led(self.pellet) = Rgba::opaque(color);
            self.flash = !self.flash;

            for ghost in self.ghosts.iter() {
                *f.led(ghost.pos) = Rgba::opaque(hsv(ghost.hue, 255, Self::value(ghost.visible)));
            }
        } else if self.ghosts.iter().any(|g| g.visible) {
            if !self.powered {
                self.powered = true;
                f.emit(PuckManEvent::PowerPhase.code());
            }
            // Ghosts flee, the puck turns around and speeds up as the phase drags on
            self.ghost_delta = -2;
            self.delta = match self.speed_jumps {
                0..=4 => -1,
                5..=9 => -2,
                _ => -3,
            };
            self.speed_jumps = self.speed_jumps.saturating_add(1);

            let pos = self.pos;
            if let Some(ghost) = self.ghosts.iter_mut().find(|g| g.visible && g.pos == pos) {
                ghost.visible = false;
                f.emit(PuckManEvent::GhostCaught.code());
            }

            for ghost in self.ghosts.iter() {
                *f.led(ghost.pos) = Rgba::opaque(hsv(HUE_BLUE, 255, Self::value(ghost.visible)));
            }
        } else {
            self.delta = 1;
        }

        for ghost in self.ghosts.iter_mut() {
            ghost.pos = Self::wrap(ghost.pos, self.ghost_delta, len);
        }

        *f.led(self.pos) = Rgba::opaque(hsv(HUE_YELLOW, 255, 255));
        self.dots[self.pos] = Dot::Eaten;
        self.pos = Self::wrap(self.pos, self.delta, len);
    }

    fn value(visible: bool) -> u8 {
        if visible {
            255
        } else {
            0
        }
    }
}
