//! Process-launch layer.
//!
//! [`ToolRunner`] is the seam between the orchestrator and the outside
//! world. The production implementation is [`ProcessRunner`], which spawns
//! real subprocesses; tests substitute deterministic fakes.
//!
//! A runner never fails: launch errors, missing executables and timeouts
//! all come back as an [`ExecutionResult`] with the matching
//! [`CompletionKind`].

pub mod process;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::command::CommandSpec;

pub use process::{ProcessRunner, ProcessRunnerConfig};

/// Exit code reported when no real process exit was observed.
pub const LAUNCH_FAILURE_EXIT_CODE: i32 = -1;

/// How an invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionKind {
    /// The process exited on its own, with any exit code.
    Completed,
    /// The process exceeded its timeout budget and was killed.
    TimedOut,
    /// The availability probe found the tool missing; nothing was launched.
    ToolUnavailable,
    /// The process could not be launched or communicated with.
    LaunchError,
}

/// Everything captured from one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Process exit code, or [`LAUNCH_FAILURE_EXIT_CODE`].
    pub exit_code: i32,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Wall-clock duration.
    #[serde(rename = "duration_ms", with = "duration_ms")]
    pub duration: Duration,
    pub kind: CompletionKind,
}

impl ExecutionResult {
    /// A process that ran to completion.
    pub fn completed(exit_code: i32, stdout: String, stderr: String, duration: Duration) -> Self {
        Self {
            exit_code,
            stdout,
            stderr,
            duration,
            kind: CompletionKind::Completed,
        }
    }

    /// A process killed after exceeding `timeout`. The reported duration is
    /// the budget itself.
    pub fn timed_out(timeout: Duration) -> Self {
        Self {
            exit_code: LAUNCH_FAILURE_EXIT_CODE,
            stdout: String::new(),
            stderr: format!("Command timed out after {} seconds", timeout.as_secs()),
            duration: timeout,
            kind: CompletionKind::TimedOut,
        }
    }

    /// A synthesized result for a tool the availability probe found missing.
    pub fn tool_unavailable(tool: &str) -> Self {
        Self {
            exit_code: LAUNCH_FAILURE_EXIT_CODE,
            stdout: String::new(),
            stderr: format!("{tool} not available - skipping command"),
            duration: Duration::ZERO,
            kind: CompletionKind::ToolUnavailable,
        }
    }

    /// A launch or communication failure, carrying the error text as stderr.
    pub fn launch_error(message: impl Into<String>, duration: Duration) -> Self {
        Self {
            exit_code: LAUNCH_FAILURE_EXIT_CODE,
            stdout: String::new(),
            stderr: message.into(),
            duration,
            kind: CompletionKind::LaunchError,
        }
    }

    /// `true` when the process completed with exit code 0.
    pub fn succeeded(&self) -> bool {
        self.kind == CompletionKind::Completed && self.exit_code == 0
    }
}

/// Executes a [`CommandSpec`] and reports what happened.
///
/// Implementations must be safe to call from several tasks at once.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec) -> ExecutionResult;
}

// Compile-time assertion: ToolRunner must be usable as `dyn ToolRunner`.
const _: () = {
    fn _assert_object_safe(_: &dyn ToolRunner) {}
};

/// Serde adapter storing a [`Duration`] as whole milliseconds.
pub(crate) mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let ms = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(ms)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}
