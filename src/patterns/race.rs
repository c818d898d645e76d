// Starship race - Five racers lapping the strip until one covers the distance

use rand::Rng;

use super::Frame;
use crate::types::{hsv, Rgba};

#[derive(Clone, Copy, Debug)]
struct Starship {
    distance: u16,
    hue: u8,
}

pub struct StarshipRace {
    ships: [Starship; Self::SHIPS],
    // Minimum speed that moves a ship one cell per redraw
    range: u16,
    go: bool,
    redraws: u8,
    boost: u16,
    countdown: u8,
    winner: Option<u8>,
}

impl StarshipRace {
    const INTERVAL: u64 = 88;
    const SHIPS: usize = 5;
    // Three and a half laps of 255
    const TARGET: u16 = 11 * 255 / 2;
    const BOOST_PERIOD: u8 = 4;
    const COOLDOWN_TICKS: u8 = 10;

    pub fn new(len: usize) -> Self {
        StarshipRace {
            ships: Self::grid_line(),
            range: (255.0 / len.max(1) as f32).ceil() as u16,
            go: true,
            redraws: 0,
            boost: 0,
            countdown: 0,
            winner: None,
        }
    }

    fn grid_line() -> [Starship; Self::SHIPS] {
        let mut ships = [Starship { distance: 0, hue: 0 }; Self::SHIPS];
        for (i, ship) in ships.iter_mut().enumerate() {
            ship.hue = (i * (256 / Self::SHIPS)) as u8;
        }
        ships
    }

    pub fn draw(&mut self, f: &mut Frame) {
        if !f.ready(Self::INTERVAL) {
            return;
        }
        let len = f.len();

        if self.go {
            f.leds.clear();
            for ship in self.ships.iter_mut() {
                ship.distance += f.rng.gen_range(self.boost..=self.range + self.boost);
            }
            self.ships.sort_by(|a, b| b.distance.cmp(&a.distance));

            for ship in self.ships.iter() {
                let lap = ship.distance % 256;
                let mut pos = lap as usize * (len - 1) / 256;
                // One ship per cell: fall back behind whoever is already there
                while !f.led(pos).is_dark() && pos > 0 {
                    pos -= 1;
                }
                *f.led(pos) = Rgba::opaque(hsv(ship.hue, 255, 255));
            }

            self.redraws += 1;
            if self.redraws == Self::BOOST_PERIOD {
                self.redraws = 0;
                self.boost += 1;
            }
        } else {
            self.countdown = self.countdown.saturating_sub(1);
            if self.countdown == 0 {
                self.go = true;
            }
        }

        if self.ships[0].distance >= Self::TARGET {
            let hue = self.ships[0].hue;
            f.leds.fill(Rgba::opaque(hsv(hue, 255, 255)));
            self.winner = Some(hue);
            self.ships = Self::grid_line();
            self.go = false;
            self.redraws = 0;
            self.boost = 0;
            self.countdown = Self::COOLDOWN_TICKS;
        }
    }
}
