// Info module - Wall-clock source and time/date rendering

use time::{OffsetDateTime, PrimitiveDateTime};

use crate::buffer::PixelBuffer;
use crate::error::{EngineError, EngineResult};
use crate::serpentine::Serpentine;
use crate::text::{ink, Glyph, GlyphProvider};
use crate::timing::IntervalTimer;
use crate::types::Rgb;

/// Local calendar time, injected so tests can pin the date.
pub trait ClockSource: Send + Sync {
    fn now(&self) -> PrimitiveDateTime;
}

/// Local time from the OS, UTC when the offset cannot be determined.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCalendar;

impl ClockSource for SystemCalendar {
    fn now(&self) -> PrimitiveDateTime {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        PrimitiveDateTime::new(now.date(), now.time())
    }
}

/// Pinned time for tests and demos.
#[derive(Debug, Clone, Copy)]
pub struct FixedCalendar(pub PrimitiveDateTime);

impl ClockSource for FixedCalendar {
    fn now(&self) -> PrimitiveDateTime {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoKind {
    Time12h,
    Time24h,
    DateMmDd,
    DateDdMm,
    Time12hDateMmDd,
    Time24hDateDdMm,
}

impl InfoKind {
    pub fn from_id(id: u8) -> EngineResult<Self> {
        match id {
            0 => Ok(InfoKind::Time12h),
            1 => Ok(InfoKind::Time24h),
            2 => Ok(InfoKind::DateMmDd),
            3 => Ok(InfoKind::DateDdMm),
            4 => Ok(InfoKind::Time12hDateMmDd),
            5 => Ok(InfoKind::Time24hDateDdMm),
            _ => Err(EngineError::UnknownInfo(id)),
        }
    }

    pub fn id(&self) -> u8 {
        *self as u8
    }

    /// Text lines shown for `at`, top to bottom.
    pub fn lines(&self, at: PrimitiveDateTime) -> Vec<String> {
        let time12 = || {
            let hour = match at.hour() % 12 {
                0 => 12,
                h => h,
            };
            format!("{}:{:02}", hour, at.minute())
        };
        let time24 = || format!("{:02}:{:02}", at.hour(), at.minute());
        let month = u8::from(at.month());
        let mmdd = || format!("{:02}/{:02}", month, at.day());
        let ddmm = || format!("{:02}/{:02}", at.day(), month);

        match self {
            InfoKind::Time12h => vec![time12()],
            InfoKind::Time24h => vec![time24()],
            InfoKind::DateMmDd => vec![mmdd()],
            InfoKind::DateDdMm => vec![ddmm()],
            InfoKind::Time12hDateMmDd => vec![time12(), mmdd()],
            InfoKind::Time24hDateDdMm => vec![time24(), ddmm()],
        }
    }
}

/// Redraws the time or date once a second, centered on the matrix.
pub struct InfoDisplay {
    kind: InfoKind,
    timer: IntervalTimer,
}

impl InfoDisplay {
    pub const INTERVAL: u64 = 1_000;
    const LINE_GAP: usize = 1;

    pub fn new(kind: InfoKind) -> Self {
        InfoDisplay { kind, timer: IntervalTimer::new() }
    }

    pub fn kind(&self) -> InfoKind {
        self.kind
    }

    /// Returns true when the buffer was redrawn.
    pub fn step(
        &mut self,
        now: u64,
        leds: &mut PixelBuffer,
        grid: Serpentine,
        color: Rgb,
        font: &dyn GlyphProvider,
        calendar: &dyn ClockSource,
    ) -> bool {
        if !self.timer.ready(now, Self::INTERVAL) {
            return false;
        }
        self.draw(leds, grid, color, font, calendar.now());
        true
    }

    pub fn draw(&self, leds: &mut PixelBuffer, grid: Serpentine, color: Rgb, font: &dyn GlyphProvider, at: PrimitiveDateTime) {
        leds.clear();
        let lines: Vec<Vec<Glyph>> = self
            .kind
            .lines(at)
            .iter()
            .map(|line| line.chars().filter_map(|c| font.glyph(c)).collect())
            .collect();

        let line_height = |glyphs: &Vec<Glyph>| glyphs.iter().map(|g| g.height).max().unwrap_or(0);
        let total: usize = lines.iter().map(line_height).sum::<usize>() + Self::LINE_GAP * lines.len().saturating_sub(1);
        let mut y = grid.rows.saturating_sub(total) / 2;

        for glyphs in &lines {
            // Drop the tracking column when the line would not fit
            let tight: usize = glyphs.iter().map(|g| g.width).sum();
            let tracking = if tight + glyphs.len().saturating_sub(1) <= grid.cols { 1 } else { 0 };
            let width = tight + tracking * glyphs.len().saturating_sub(1);
            let mut x = grid.cols.saturating_sub(width) / 2;

            for glyph in glyphs {
                for gy in 0..glyph.height {
                    for gx in 0..glyph.width {
                        let coverage = glyph.at(gx, gy);
                        if coverage == 0 {
                            continue;
                        }
                        if let Some(i) = grid.index_of((x + gx) as i32, (y + gy) as i32) {
                            leds[i] = ink(color, coverage);
                        }
                    }
                }
                x += glyph.width + tracking;
            }
            y += line_height(glyphs) + Self::LINE_GAP;
        }
    }
}
