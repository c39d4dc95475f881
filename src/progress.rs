//! Throttled textual progress indicator.

use std::io::Write;
use std::time::{Duration, Instant};

/// Default minimum time between two renders
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

/// Default bar width in characters
pub const DEFAULT_WIDTH: usize = 50;

/// Renders `42%[=====>     ] 21/50` lines, overwriting in place with `\r`.
///
/// Purely presentational: rendering never affects the counters.
pub struct ProgressReporter<W: Write> {
    out: W,
    current: usize,
    total: usize,
    last_render: Option<Instant>,
    interval: Duration,
    width: usize,
}

impl<W: Write> ProgressReporter<W> {
    pub fn new(out: W, total: usize) -> Self {
        Self {
            out,
            current: 0,
            total,
            last_render: None,
            interval: DEFAULT_INTERVAL,
            width: DEFAULT_WIDTH,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width.max(1);
        self
    }

    /// Advance by one and render unless the last render was too recent.
    pub fn step(&mut self) {
        self.current += 1;
        let due = self
            .last_render
            .map(|at| at.elapsed() >= self.interval)
            .unwrap_or(true);
        if due {
            self.render();
        }
    }

    /// Render now, ignoring the throttle.
    pub fn render(&mut self) {
        self.last_render = Some(Instant::now());
        let line = self.line();
        // Progress output is best effort.
        if let Err(e) = self.out.write_all(line.as_bytes()).and_then(|_| self.out.flush()) {
            log::debug!("progress render failed: {}", e);
        }
    }

    pub fn current_step(&self) -> usize {
        self.current
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Current progress line, without rendering it.
    pub fn line(&self) -> String {
        let percent = if self.total == 0 {
            100
        } else {
            ((self.current * 100) as f64 / self.total as f64).round() as usize
        };
        let filled = ((self.width * percent.min(100)) as f64 / 100.0).round() as usize;
        format!(
            "{}%[{}>{}] {}/{}\r",
            percent,
            "=".repeat(filled),
            " ".repeat(self.width - filled),
            self.current,
            self.total
        )
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
