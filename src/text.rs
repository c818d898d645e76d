// Text module - Glyph provider capability, built-in mini font, scrolling text

use crate::buffer::PixelBuffer;
use crate::serpentine::{Point, Serpentine};
use crate::timing::IntervalTimer;
use crate::types::{Rgb, Rgba};

/// Bitmap for one character. `coverage` is row-major, 0 = empty, 255 = full ink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Glyph {
    pub width: usize,
    pub height: usize,
    pub coverage: Vec<u8>,
}

impl Glyph {
    pub fn at(&self, x: usize, y: usize) -> u8 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        self.coverage.get(y * self.width + x).copied().unwrap_or(0)
    }

    fn inked_rows(&self) -> Option<(usize, usize)> {
        let inked: Vec<usize> = (0..self.height)
            .filter(|&y| (0..self.width).any(|x| self.at(x, y) > 0))
            .collect();
        Some((*inked.first()?, *inked.last()?))
    }
}

/// Supplies glyph bitmaps; characters without a glyph are skipped.
pub trait GlyphProvider: Send + Sync {
    fn glyph(&self, c: char) -> Option<Glyph>;
}

/// Built-in variable-width 3x5 font. Lowercase folds to uppercase.
#[derive(Debug, Clone, Copy, Default)]
pub struct MiniFont;

impl MiniFont {
    pub const HEIGHT: usize = 5;

    // Row bitmaps, leftmost column in the highest bit of `width`
    fn bitmap(c: char) -> Option<(usize, [u8; 5])> {
        let rows = match c.to_ascii_uppercase() {
            '0' => (3, [0b111, 0b101, 0b101, 0b101, 0b111]),
            '1' => (3, [0b010, 0b110, 0b010, 0b010, 0b111]),
            '2' => (3, [0b111, 0b001, 0b111, 0b100, 0b111]),
            '3' => (3, [0b111, 0b001, 0b111, 0b001, 0b111]),
            '4' => (3, [0b101, 0b101, 0b111, 0b001, 0b001]),
            '5' => (3, [0b111, 0b100, 0b111, 0b001, 0b111]),
            '6' => (3, [0b111, 0b100, 0b111, 0b101, 0b111]),
            '7' => (3, [0b111, 0b001, 0b001, 0b001, 0b001]),
            '8' => (3, [0b111, 0b101, 0b111, 0b101, 0b111]),
            '9' => (3, [0b111, 0b101, 0b111, 0b001, 0b111]),
            'A' => (3, [0b010, 0b101, 0b111, 0b101, 0b101]),
            'B' => (3, [0b110, 0b101, 0b110, 0b101, 0b110]),
            'C' => (3, [0b011, 0b100, 0b100, 0b100, 0b011]),
            'D' => (3, [0b110, 0b101, 0b101, 0b101, 0b110]),
            'E' => (3, [0b111, 0b100, 0b110, 0b100, 0b111]),
            'F' => (3, [0b111, 0b100, 0b110, 0b100, 0b100]),
            'G' => (3, [0b011, 0b100, 0b101, 0b101, 0b011]),
            'H' => (3, [0b101, 0b101, 0b111, 0b101, 0b101]),
            'I' => (3, [0b111, 0b010, 0b010, 0b010, 0b111]),
            'J' => (3, [0b001, 0b001, 0b001, 0b101, 0b010]),
            'K' => (3, [0b101, 0b101, 0b110, 0b101, 0b101]),
            'L' => (3, [0b100, 0b100, 0b100, 0b100, 0b111]),
            'M' => (3, [0b101, 0b111, 0b111, 0b101, 0b101]),
            'N' => (3, [0b110, 0b101, 0b101, 0b101, 0b101]),
            'O' => (3, [0b010, 0b101, 0b101, 0b101, 0b010]),
            'P' => (3, [0b110, 0b101, 0b110, 0b100, 0b100]),
            'Q' => (3, [0b010, 0b101, 0b101, 0b110, 0b011]),
            'R' => (3, [0b110, 0b101, 0b110, 0b101, 0b101]),
            'S' => (3, [0b011, 0b100, 0b010, 0b001, 0b110]),
            'T' => (3, [0b111, 0b010, 0b010, 0b010, 0b010]),
            'U' => (3, [0b101, 0b101, 0b101, 0b101, 0b111]),
            'V' => (3, [0b101, 0b101, 0b101, 0b101, 0b010]),
            'W' => (3, [0b101, 0b101, 0b111, 0b111, 0b101]),
            'X' => (3, [0b101, 0b101, 0b010, 0b101, 0b101]),
            'Y' => (3, [0b101, 0b101, 0b010, 0b010, 0b010]),
            'Z' => (3, [0b111, 0b001, 0b010, 0b100, 0b111]),
            ' ' => (2, [0, 0, 0, 0, 0]),
            '.' => (1, [0, 0, 0, 0, 1]),
            ',' => (1, [0, 0, 0, 1, 1]),
            ':' => (1, [0, 1, 0, 1, 0]),
            '!' => (1, [1, 1, 1, 0, 1]),
            '\'' => (1, [1, 1, 0, 0, 0]),
            '-' => (3, [0b000, 0b000, 0b111, 0b000, 0b000]),
            '+' => (3, [0b000, 0b010, 0b111, 0b010, 0b000]),
            '/' => (3, [0b001, 0b001, 0b010, 0b100, 0b100]),
            '?' => (3, [0b111, 0b001, 0b011, 0b000, 0b010]),
            _ => return None,
        };
        Some(rows)
    }
}

impl GlyphProvider for MiniFont {
    fn glyph(&self, c: char) -> Option<Glyph> {
        let (width, rows) = Self::bitmap(c)?;
        let mut coverage = Vec::with_capacity(width * Self::HEIGHT);
        for row in rows {
            for x in 0..width {
                let bit = 1 << (width - 1 - x);
                coverage.push(if row & bit != 0 { 255 } else { 0 });
            }
        }
        Some(Glyph { width, height: Self::HEIGHT, coverage })
    }
}

/// Glyph ink as a pixel: color scaled by coverage, empty cells transparent.
pub fn ink(color: Rgb, coverage: u8) -> Rgba {
    if coverage == 0 {
        Rgba::TRANSPARENT
    } else {
        Rgba::opaque(color.scale(coverage))
    }
}

/// Text that crawls in from the right edge, one column per tick, and loops.
pub struct TextScroller {
    glyphs: Vec<Glyph>,
    index: usize,
    column: usize,
    tracking: usize,
    top: usize,
    height: usize,
    timer: IntervalTimer,
}

impl TextScroller {
    pub const INTERVAL: u64 = 200;
    const TRACKING: usize = 1;

    pub fn new(text: &str, font: &dyn GlyphProvider) -> Self {
        let glyphs: Vec<Glyph> = text.chars().filter_map(|c| font.glyph(c)).filter(|g| g.width > 0).collect();
        // Vertical extent of the ink across the whole text
        let (top, bottom) = glyphs
            .iter()
            .filter_map(Glyph::inked_rows)
            .fold(None, |acc: Option<(usize, usize)>, (t, b)| match acc {
                Some((at, ab)) => Some((at.min(t), ab.max(b))),
                None => Some((t, b)),
            })
            .unwrap_or((0, 0));
        TextScroller {
            glyphs,
            index: 0,
            column: 0,
            tracking: 0,
            top,
            height: bottom - top + 1,
            timer: IntervalTimer::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// Shifts the text one column left when the interval has elapsed.
    /// Returns true when a column was shifted in.
    pub fn step(&mut self, now: u64, leds: &mut PixelBuffer, grid: Serpentine, color: Rgb) -> bool {
        if self.glyphs.is_empty() || grid.cols == 0 || grid.len() != leds.len() {
            return false;
        }
        if !self.timer.ready(now, Self::INTERVAL) {
            return false;
        }

        for y in 0..grid.rows {
            for x in 0..grid.cols - 1 {
                let from = grid.to_linear(Point::new(x + 1, y));
                let to = grid.to_linear(Point::new(x, y));
                leds[to] = leds[from];
            }
        }

        let edge = grid.cols - 1;
        if self.tracking > 0 {
            for y in 0..grid.rows {
                leds[grid.to_linear(Point::new(edge, y))] = Rgba::TRANSPARENT;
            }
            self.tracking -= 1;
            return true;
        }

        let margin = grid.rows.saturating_sub(self.height) / 2;
        let glyph = &self.glyphs[self.index];
        for y in 0..grid.rows {
            let px = if y >= margin && y - margin < self.height {
                ink(color, glyph.at(self.column, y - margin + self.top))
            } else {
                Rgba::TRANSPARENT
            };
            leds[grid.to_linear(Point::new(edge, y))] = px;
        }

        self.column += 1;
        if self.column >= glyph.width {
            self.column = 0;
            self.tracking = Self::TRACKING;
            self.index = (self.index + 1) % self.glyphs.len();
        }
        true
    }
}
