// Transform module - Scrolling position transform with entry tracking
//
// Output cell -> source cell lookup for a layer whose content drifts across
// the matrix. Drift advances once per full sweep (when the last index of the
// frame has been looked up), so a frame is always drawn from one drift value.

use crate::buffer::PixelBuffer;
use crate::serpentine::{Gap, Motion, Point, Serpentine};
use crate::types::Rgba;

#[derive(Debug, Clone)]
pub struct PositionTransform {
    grid: Serpentine,
    dx: i32,
    dy: i32,
    initial: bool,
    has_entered: bool,
    visible: bool,      // any cell mapped in bounds during the last completed sweep
    sweep_visible: bool, // same, for the sweep in progress
}

impl PositionTransform {
    pub fn new(grid: Serpentine) -> Self {
        PositionTransform {
            grid,
            dx: 0,
            dy: 0,
            initial: true,
            has_entered: false,
            visible: false,
            sweep_visible: false,
        }
    }

    /// Re-arms the transform; the next lookup reseeds drift from the entry offsets.
    pub fn reset(&mut self) {
        self.dx = 0;
        self.dy = 0;
        self.initial = true;
        self.has_entered = false;
        self.visible = false;
        self.sweep_visible = false;
    }

    pub fn has_entered(&self) -> bool {
        self.has_entered
    }

    pub fn drift(&self) -> (i32, i32) {
        (self.dx, self.dy)
    }

    /// Source index shown at output cell `index`, or None when nothing is there.
    pub fn translate(&mut self, index: usize, motion: &Motion) -> Option<usize> {
        let len = self.grid.len();
        if index >= len {
            return None;
        }
        let (w, h) = (self.grid.cols as i32, self.grid.rows as i32);

        if self.initial {
            self.initial = false;
            self.dx = entry_drift(motion.entry_x, w);
            self.dy = entry_drift(motion.entry_y, h);
        }

        let departed = self.has_entered && !motion.wrap && !self.visible;
        let source = if departed { None } else { self.lookup(index, motion) };

        if index == len - 1 && !departed {
            self.finish_sweep(motion);
        }
        source
    }

    /// Full-buffer variant: fills every cell of `dst` from `src`, transparent
    /// where the shifted content does not reach.
    pub fn translate_into(&mut self, src: &PixelBuffer, dst: &mut PixelBuffer, motion: &Motion) {
        for i in 0..dst.len() {
            dst[i] = self
                .translate(i, motion)
                .and_then(|s| src.get(s))
                .unwrap_or(Rgba::TRANSPARENT);
        }
    }

    fn lookup(&mut self, index: usize, motion: &Motion) -> Option<usize> {
        let (w, h) = (self.grid.cols as i32, self.grid.rows as i32);
        let (gap_x, gap_y) = gap_cells(motion.gap, w, h);
        let p = self.grid.to_cartesian(index);

        // Canonical frame: drift always increases along each axis
        let ux = if motion.speed_x > 0 { w - 1 - p.x as i32 } else { p.x as i32 };
        let uy = if motion.speed_y > 0 { h - 1 - p.y as i32 } else { p.y as i32 };

        let mut vx = ux + self.dx;
        let mut vy = uy + self.dy;
        if self.has_entered && motion.wrap {
            vx = vx.rem_euclid(w + gap_x);
            vy = vy.rem_euclid(h + gap_y);
        }

        if vx < 0 || vx >= w || vy < 0 || vy >= h {
            return None;
        }
        self.sweep_visible = true;

        if motion.speed_x > 0 {
            vx = w - 1 - vx;
        }
        if motion.speed_y > 0 {
            vy = h - 1 - vy;
        }
        Some(self.grid.to_linear(Point::new(vx as usize, vy as usize)))
    }

    fn finish_sweep(&mut self, motion: &Motion) {
        let (w, h) = (self.grid.cols as i32, self.grid.rows as i32);
        self.visible = self.sweep_visible;
        self.sweep_visible = false;

        self.dx += (motion.speed_x % w).abs();
        self.dy += (motion.speed_y % h).abs();

        if self.dx >= 0 && self.dy >= 0 {
            self.has_entered = true;
        }
        if self.has_entered && motion.wrap {
            let (gap_x, gap_y) = gap_cells(motion.gap, w, h);
            self.dx = self.dx.rem_euclid(w + gap_x);
            self.dy = self.dy.rem_euclid(h + gap_y);
        }
    }
}

// Offsets at or past the frame edge start the content that far off-frame
fn entry_drift(offset: i32, extent: i32) -> i32 {
    if offset >= extent {
        -offset.abs()
    } else {
        offset
    }
}

fn gap_cells(gap: Gap, w: i32, h: i32) -> (i32, i32) {
    match gap {
        Gap::Cells(n) => (n as i32, n as i32),
        Gap::FrameSize => (w, h),
    }
}
