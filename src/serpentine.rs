// Serpentine module - Boustrophedon coordinate mapping and scroll headings
//
// Even rows run left-to-right, odd rows right-to-left, matching how matrix
// panels are usually wired.

use crate::error::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Point {
    pub x: usize,
    pub y: usize,
}

impl Point {
    pub const fn new(x: usize, y: usize) -> Self {
        Point { x, y }
    }
}

/// Matrix dimensions plus the serpentine addressing rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Serpentine {
    pub cols: usize,
    pub rows: usize,
}

impl Serpentine {
    pub const fn new(cols: usize, rows: usize) -> Self {
        Serpentine { cols, rows }
    }

    pub const fn len(&self) -> usize {
        self.cols * self.rows
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x < self.cols && p.y < self.rows
    }

    pub fn to_linear(&self, p: Point) -> usize {
        if p.y % 2 == 1 {
            self.cols * p.y + (self.cols - 1 - p.x)
        } else {
            self.cols * p.y + p.x
        }
    }

    pub fn to_cartesian(&self, index: usize) -> Point {
        let y = index / self.cols;
        let x = if y % 2 == 1 {
            self.cols - 1 - (index % self.cols)
        } else {
            index % self.cols
        };
        Point { x, y }
    }

    /// Linear index of (x, y), or None when outside the matrix.
    pub fn index_of(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 {
            return None;
        }
        let p = Point::new(x as usize, y as usize);
        self.contains(p).then(|| self.to_linear(p))
    }
}

/// How far apart repeated copies of scrolling content are spaced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gap {
    Cells(u16),
    FrameSize, // one full frame of empty space between copies
}

/// Parameters for a scrolling layer: entry offsets, per-sweep speed and wrap behavior.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Motion {
    pub entry_x: i32,
    pub entry_y: i32,
    pub speed_x: i32,
    pub speed_y: i32,
    pub wrap: bool,
    pub gap: Gap,
}

// Scroll heading for a layer (compass direction the content travels)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heading {
    Still,
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Heading {
    pub fn from_id(id: u8) -> Result<Self, EngineError> {
        match id {
            0 => Ok(Heading::Still),
            1 => Ok(Heading::North),
            2 => Ok(Heading::NorthEast),
            3 => Ok(Heading::East),
            4 => Ok(Heading::SouthEast),
            5 => Ok(Heading::South),
            6 => Ok(Heading::SouthWest),
            7 => Ok(Heading::West),
            8 => Ok(Heading::NorthWest),
            _ => Err(EngineError::UnknownHeading(id)),
        }
    }

    pub fn id(&self) -> u8 {
        *self as u8
    }

    /// Motion that brings content in from off-frame and wraps it forever.
    pub fn motion(&self, grid: Serpentine) -> Option<Motion> {
        let (w, h) = (grid.cols as i32, grid.rows as i32);
        let (entry_x, entry_y, speed_x, speed_y) = match self {
            Heading::Still => return None,
            Heading::North => (0, h, 0, -1),
            Heading::NorthEast => (w, h, -1, -1),
            Heading::East => (w, 0, -1, 0),
            Heading::SouthEast => (w, -h, -1, 1),
            Heading::South => (0, -h, 0, 1),
            Heading::SouthWest => (-w, -h, 1, 1),
            Heading::West => (-w, 0, 1, 0),
            Heading::NorthWest => (-w, h, 1, -1),
        };
        Some(Motion { entry_x, entry_y, speed_x, speed_y, wrap: true, gap: Gap::FrameSize })
    }
}
