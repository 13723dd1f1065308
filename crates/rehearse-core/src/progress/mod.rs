//! Single-line terminal progress.
//!
//! [`ProgressReporter`] owns one continuously rewritten status line:
//!
//! ```text
//! Rehearse |██████████░░░░░░░░░░|  50% | 01:12 | ETA: 01:12 | discovery (96/192)
//! ```
//!
//! All state and the output sink live behind one mutex, so concurrent
//! callers never tear the line and the shown percentage never goes
//! backwards. [`SimulationProgress`] layers phase and command accounting on
//! top of it.

mod simulation;

use std::io::{self, IsTerminal, Write};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crossterm::cursor::MoveToColumn;
use crossterm::style::Print;
use crossterm::terminal::{Clear, ClearType};
use crossterm::queue;

pub use simulation::SimulationProgress;

/// Default bar width in cells.
pub const DEFAULT_WIDTH: usize = 50;

/// Computed view of the progress line at one update.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub step: usize,
    pub total: usize,
    /// `min(step / total, 1.0)`; 0 when `total` is 0.
    pub fraction: f64,
    /// `floor(fraction * 100)`.
    pub percentage: u32,
    /// Filled bar cells: `floor(width * fraction)`.
    pub filled: usize,
    pub elapsed: Duration,
    /// `None` until some progress has been made.
    pub eta: Option<Duration>,
    pub label: Option<String>,
}

struct ProgressState {
    total: usize,
    step: usize,
    label: Option<String>,
    drawn: bool,
    sink: Option<Box<dyn Write + Send>>,
}

/// Thread-safe single-line progress indicator.
pub struct ProgressReporter {
    title: String,
    width: usize,
    start: Instant,
    state: Mutex<ProgressState>,
}

impl ProgressReporter {
    /// Render to stdout when it is a terminal; stay silent otherwise.
    pub fn new(total: usize, title: impl Into<String>) -> Self {
        let sink: Option<Box<dyn Write + Send>> = if io::stdout().is_terminal() {
            Some(Box::new(io::stdout()))
        } else {
            None
        };
        Self::build(total, title.into(), sink)
    }

    /// Render into `writer`.
    pub fn with_writer(
        total: usize,
        title: impl Into<String>,
        writer: impl Write + Send + 'static,
    ) -> Self {
        Self::build(total, title.into(), Some(Box::new(writer)))
    }

    /// Track progress without rendering anything.
    pub fn hidden(total: usize, title: impl Into<String>) -> Self {
        Self::build(total, title.into(), None)
    }

    fn build(total: usize, title: String, sink: Option<Box<dyn Write + Send>>) -> Self {
        Self {
            title,
            width: DEFAULT_WIDTH,
            start: Instant::now(),
            state: Mutex::new(ProgressState {
                total,
                step: 0,
                label: None,
                drawn: false,
                sink,
            }),
        }
    }

    /// Set the bar width (cells).
    pub fn width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    /// Move to `step` and redraw. A step lower than the current one is
    /// ignored so the bar never moves backwards.
    pub fn update(&self, step: usize, label: impl Into<String>) -> ProgressSnapshot {
        let mut state = self.lock();
        state.step = state.step.max(step);
        state.label = Some(label.into()).filter(|l| !l.is_empty());
        let snapshot = self.compute(&state);
        self.draw(&mut state, &snapshot);
        snapshot
    }

    /// Jump to the end, draw `message`, and end the line.
    pub fn complete(&self, message: impl Into<String>) -> ProgressSnapshot {
        let mut state = self.lock();
        state.step = state.step.max(state.total);
        state.label = Some(message.into());
        let snapshot = self.compute(&state);
        self.draw(&mut state, &snapshot);
        if let Some(sink) = state.sink.as_mut() {
            let _ = writeln!(sink);
            let _ = sink.flush();
        }
        state.drawn = false;
        snapshot
    }

    /// Print a full line above the progress line, then redraw it.
    pub fn println(&self, line: &str) {
        let mut state = self.lock();
        let redraw = state.drawn;
        if let Some(sink) = state.sink.as_mut() {
            let _ = queue!(
                sink,
                MoveToColumn(0),
                Clear(ClearType::CurrentLine),
                Print(line),
                Print("\n")
            );
            let _ = sink.flush();
        }
        if redraw {
            let snapshot = self.compute(&state);
            self.draw(&mut state, &snapshot);
        }
    }

    /// Current values without redrawing.
    pub fn snapshot(&self) -> ProgressSnapshot {
        let state = self.lock();
        self.compute(&state)
    }

    fn compute(&self, state: &ProgressState) -> ProgressSnapshot {
        let fraction = if state.total == 0 {
            0.0
        } else {
            (state.step as f64 / state.total as f64).min(1.0)
        };
        let elapsed = self.start.elapsed();
        let eta = (fraction > 0.0).then(|| elapsed.mul_f64((1.0 - fraction) / fraction));

        ProgressSnapshot {
            step: state.step,
            total: state.total,
            fraction,
            percentage: (fraction * 100.0).floor() as u32,
            filled: (self.width as f64 * fraction).floor() as usize,
            elapsed,
            eta,
            label: state.label.clone(),
        }
    }

    fn draw(&self, state: &mut ProgressState, snapshot: &ProgressSnapshot) {
        let Some(sink) = state.sink.as_mut() else {
            return;
        };
        let line = render_line(&self.title, self.width, snapshot);
        let _ = queue!(sink, MoveToColumn(0), Clear(ClearType::CurrentLine), Print(line));
        let _ = sink.flush();
        state.drawn = true;
    }

    fn lock(&self) -> MutexGuard<'_, ProgressState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("title", &self.title)
            .field("width", &self.width)
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

/// Render the status line for `snapshot`.
pub fn render_line(title: &str, width: usize, snapshot: &ProgressSnapshot) -> String {
    let filled = snapshot.filled.min(width);
    let bar = format!("{}{}", "█".repeat(filled), "░".repeat(width - filled));
    let eta = snapshot
        .eta
        .map(format_clock)
        .unwrap_or_else(|| "--:--".to_owned());
    let mut line = format!(
        "{title} |{bar}| {:>3}% | {} | ETA: {eta}",
        snapshot.percentage,
        format_clock(snapshot.elapsed)
    );
    if let Some(label) = &snapshot.label {
        line.push_str(" | ");
        line.push_str(label);
    }
    line
}

/// `MM:SS`.
pub fn format_clock(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
