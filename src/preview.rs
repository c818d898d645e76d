// Preview module - Draws the matrix in the terminal instead of on LEDs
use anyhow::Result;
use crossterm::event::{poll, read, Event, KeyCode, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Terminal;
use std::io::{self, Stdout};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::output::PixelSink;
use crate::serpentine::{Point, Serpentine};
use crate::types::Rgb;

/// Terminal rows for the matrix, two characters per LED so cells look square.
pub fn matrix_lines(frame: &[Rgb], grid: Serpentine) -> Vec<Line<'static>> {
    (0..grid.rows)
        .map(|y| {
            let spans: Vec<Span<'static>> = (0..grid.cols)
                .map(|x| {
                    let px = frame.get(grid.to_linear(Point::new(x, y))).copied().unwrap_or(Rgb::BLACK);
                    Span::styled("██", Style::default().fg(Color::Rgb(px.r, px.g, px.b)))
                })
                .collect();
            Line::from(spans)
        })
        .collect()
}

pub struct PreviewSink {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    grid: Serpentine,
    shutdown: Arc<AtomicBool>,
    frames: u64,
    fps: f64,
    fps_since: Instant,
}

impl PreviewSink {
    /// Takes over the terminal; 'q' or Ctrl-C raises `shutdown`.
    pub fn new(grid: Serpentine, shutdown: Arc<AtomicBool>) -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;
        Ok(PreviewSink { terminal, grid, shutdown, frames: 0, fps: 0.0, fps_since: Instant::now() })
    }

    fn poll_keys(&self) -> Result<()> {
        while poll(Duration::from_millis(0))? {
            if let Event::Key(key) = read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Char('Q') => self.shutdown.store(true, Ordering::Relaxed),
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        self.shutdown.store(true, Ordering::Relaxed)
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }
}

impl PixelSink for PreviewSink {
    fn send(&mut self, frame: &[Rgb]) -> Result<()> {
        self.poll_keys()?;

        self.frames += 1;
        let elapsed = self.fps_since.elapsed();
        if elapsed >= Duration::from_secs(1) {
            self.fps = self.frames as f64 / elapsed.as_secs_f64();
            self.frames = 0;
            self.fps_since = Instant::now();
        }

        let lines = matrix_lines(frame, self.grid);
        let title = format!(" glowmatrix {}x{}  {:.0} fps  (q to quit) ", self.grid.cols, self.grid.rows, self.fps);
        self.terminal.draw(|f| {
            let area = f.size();
            let paragraph = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
            f.render_widget(paragraph, area);
        })?;
        Ok(())
    }
}

impl Drop for PreviewSink {
    fn drop(&mut self) {
        let _ = self.terminal.show_cursor();
        let _ = disable_raw_mode();
        let _ = self.terminal.backend_mut().execute(LeaveAlternateScreen);
    }
}
