//! [`ToolRunner`] backed by real subprocesses.

use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::OnceCell;

use crate::command::CommandSpec;

use super::{CompletionKind, ExecutionResult, LAUNCH_FAILURE_EXIT_CODE, ToolRunner};

/// Settings for a [`ProcessRunner`].
#[derive(Debug, Clone)]
pub struct ProcessRunnerConfig {
    /// Program name that identifies the tool under test in a [`CommandSpec`].
    pub tool_name: String,
    /// Explicit executable to launch instead of searching `PATH`.
    pub tool_path: Option<PathBuf>,
    /// Arguments of the availability probe.
    pub probe_args: Vec<String>,
    /// Timeout of the availability probe.
    pub probe_timeout: Duration,
}

impl ProcessRunnerConfig {
    /// Config for `tool_name` with the default `--version` probe.
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            tool_path: None,
            probe_args: vec!["--version".to_owned()],
            probe_timeout: Duration::from_secs(10),
        }
    }

    /// Launch the tool from an explicit path.
    pub fn tool_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.tool_path = Some(path.into());
        self
    }

    /// Replace the probe arguments.
    pub fn probe_args(mut self, args: Vec<String>) -> Self {
        self.probe_args = args;
        self
    }

    /// Replace the probe timeout.
    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }
}

/// Launches commands as child processes.
///
/// Before the first command aimed at the tool under test, a single
/// availability probe runs. Its answer is cached for the lifetime of the
/// runner; while the tool is unavailable, tool commands are answered with
/// [`CompletionKind::ToolUnavailable`] without spawning anything. Commands
/// for other programs are always launched.
#[derive(Debug)]
pub struct ProcessRunner {
    config: ProcessRunnerConfig,
    availability: OnceCell<bool>,
}

impl ProcessRunner {
    pub fn new(config: ProcessRunnerConfig) -> Self {
        Self {
            config,
            availability: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &ProcessRunnerConfig {
        &self.config
    }

    /// Whether the tool under test can be launched.
    ///
    /// Probes on first call; concurrent first callers wait on the same probe.
    pub async fn tool_available(&self) -> bool {
        *self
            .availability
            .get_or_init(|| async { self.probe().await })
            .await
    }

    async fn probe(&self) -> bool {
        let program = self.tool_program();
        let result = execute(
            program.as_os_str(),
            &self.config.probe_args,
            self.config.probe_timeout,
        )
        .await;

        match result.kind {
            CompletionKind::Completed if result.exit_code == 0 => {
                tracing::info!(
                    tool = %self.config.tool_name,
                    version = %result.stdout.trim(),
                    "tool found"
                );
                true
            }
            CompletionKind::Completed => {
                tracing::warn!(
                    tool = %self.config.tool_name,
                    exit_code = result.exit_code,
                    stderr = %result.stderr.trim(),
                    "tool found but version probe returned an error"
                );
                false
            }
            CompletionKind::TimedOut => {
                tracing::error!(tool = %self.config.tool_name, "tool version probe timed out");
                false
            }
            CompletionKind::ToolUnavailable | CompletionKind::LaunchError => {
                tracing::error!(
                    tool = %self.config.tool_name,
                    error = %result.stderr,
                    "tool not found; ensure it is installed and on PATH"
                );
                false
            }
        }
    }

    fn tool_program(&self) -> PathBuf {
        self.config
            .tool_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(&self.config.tool_name))
    }

    fn targets_tool(&self, spec: &CommandSpec) -> bool {
        spec.program() == self.config.tool_name
    }
}

#[async_trait]
impl ToolRunner for ProcessRunner {
    async fn run(&self, spec: &CommandSpec) -> ExecutionResult {
        if self.targets_tool(spec) {
            if !self.tool_available().await {
                return ExecutionResult::tool_unavailable(&self.config.tool_name);
            }
            let program = self.tool_program();
            return execute(program.as_os_str(), spec.args(), spec.timeout()).await;
        }
        execute(OsStr::new(spec.program()), spec.args(), spec.timeout()).await
    }
}

/// Spawn `program` with `args`, capture its output, and enforce `timeout`.
///
/// stdin is closed. On timeout the child is killed before returning.
async fn execute(program: &OsStr, args: &[String], timeout: Duration) -> ExecutionResult {
    let start = Instant::now();

    let spawned = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn();

    let mut child = match spawned {
        Ok(child) => child,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return ExecutionResult::launch_error(
                format!("executable not found: {}: {e}", program.to_string_lossy()),
                start.elapsed(),
            );
        }
        Err(e) => {
            return ExecutionResult::launch_error(
                format!("failed to launch {}: {e}", program.to_string_lossy()),
                start.elapsed(),
            );
        }
    };

    // Read both pipes while waiting so a chatty child cannot fill a pipe
    // buffer and deadlock.
    let mut stdout_pipe = child.stdout.take();
    let mut stderr_pipe = child.stderr.take();

    let read_stdout = async {
        let mut buf = Vec::new();
        if let Some(ref mut pipe) = stdout_pipe {
            pipe.read_to_end(&mut buf).await.ok();
        }
        String::from_utf8_lossy(&buf).into_owned()
    };

    let read_stderr = async {
        let mut buf = Vec::new();
        if let Some(ref mut pipe) = stderr_pipe {
            pipe.read_to_end(&mut buf).await.ok();
        }
        String::from_utf8_lossy(&buf).into_owned()
    };

    let outcome = tokio::time::timeout(timeout, async {
        tokio::join!(child.wait(), read_stdout, read_stderr)
    })
    .await;

    match outcome {
        Ok((Ok(status), stdout, stderr)) => {
            ExecutionResult::completed(exit_code_of(status), stdout, stderr, start.elapsed())
        }
        Ok((Err(e), _, _)) => ExecutionResult::launch_error(
            format!("failed to wait on {}: {e}", program.to_string_lossy()),
            start.elapsed(),
        ),
        Err(_) => {
            if let Err(e) = child.kill().await {
                tracing::warn!(
                    program = %program.to_string_lossy(),
                    error = %e,
                    "failed to kill timed-out process"
                );
            }
            ExecutionResult::timed_out(timeout)
        }
    }
}

/// Map an exit status to a code. Signal deaths follow the shell
/// convention of `128 + signal`.
fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    LAUNCH_FAILURE_EXIT_CODE
}
