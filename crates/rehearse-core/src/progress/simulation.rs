use std::sync::{Mutex, MutexGuard};

use super::{ProgressReporter, ProgressSnapshot};

/// Longest command text shown in a per-command status line.
const STATUS_COMMAND_WIDTH: usize = 40;

#[derive(Debug, Default)]
struct Cursor {
    feature: String,
    feature_index: usize,
    completed: usize,
}

/// Phase and command accounting over one [`ProgressReporter`].
///
/// The bar's total is the session's command count. Starting a phase only
/// relabels the line; each finished command advances the bar by one and
/// prints a `[PASS]`/`[FAIL]` status line above it.
#[derive(Debug)]
pub struct SimulationProgress {
    reporter: ProgressReporter,
    features: usize,
    total_commands: usize,
    cursor: Mutex<Cursor>,
}

impl SimulationProgress {
    /// `reporter` should have been created with `total_commands` as its total.
    pub fn new(reporter: ProgressReporter, features: usize, total_commands: usize) -> Self {
        Self {
            reporter,
            features,
            total_commands,
            cursor: Mutex::new(Cursor::default()),
        }
    }

    /// Mark the start of phase `index` (zero-based).
    pub fn begin_feature(&self, index: usize, name: &str) -> ProgressSnapshot {
        let mut cursor = self.lock();
        cursor.feature = name.to_owned();
        cursor.feature_index = index;
        let label = format!("Testing: {name} [{}/{}]", index + 1, self.features);
        self.reporter.update(cursor.completed, label)
    }

    /// Count one finished command and print its status line.
    pub fn command_completed(&self, passed: bool, command: &str) -> ProgressSnapshot {
        let mut cursor = self.lock();
        cursor.completed += 1;
        let marker = if passed { "PASS" } else { "FAIL" };
        self.reporter
            .println(&format!("[{marker}] {}", shorten(command, STATUS_COMMAND_WIDTH)));
        let label = format!(
            "{} ({}/{})",
            cursor.feature, cursor.completed, self.total_commands
        );
        self.reporter.update(cursor.completed, label)
    }

    /// Print a line above the bar without advancing it.
    pub fn note(&self, line: &str) {
        let _cursor = self.lock();
        self.reporter.println(line);
    }

    /// Finish the bar with `message`.
    pub fn finish(&self, message: &str) -> ProgressSnapshot {
        let _cursor = self.lock();
        self.reporter.complete(message)
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.reporter.snapshot()
    }

    /// Commands counted so far.
    pub fn completed(&self) -> usize {
        self.lock().completed
    }

    fn lock(&self) -> MutexGuard<'_, Cursor> {
        self.cursor.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn shorten(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_owned()
    } else {
        let head: String = s.chars().take(max).collect();
        format!("{head}...")
    }
}
