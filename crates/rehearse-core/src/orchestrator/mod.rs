//! Session orchestrator: drives phases end to end.
//!
//! Commands of a phase are issued through the [`ToolRunner`], up to
//! `concurrency` at a time, and settled strictly in issue order: each
//! result is judged, counted, shown on the progress line and appended to
//! the record list before the next one is looked at. Cancellation stops
//! issuing, drops (and so kills) whatever is in flight, and still returns
//! everything settled so far.

use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::command::{Category, CommandSpec};
use crate::phases::{self, Phase};
use crate::progress::SimulationProgress;
use crate::runner::{ExecutionResult, ToolRunner};
use crate::stats::{SessionStats, StatsSnapshot};
use crate::validator::{OutcomeValidator, ValidationVerdict};

/// Randomized operator think-time between commands of a phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PauseRange {
    pub min: Duration,
    pub max: Duration,
}

impl PauseRange {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    pub fn is_zero(&self) -> bool {
        self.max.is_zero()
    }

    fn sample(&self) -> Duration {
        if self.max <= self.min {
            self.min
        } else {
            rand::rng().random_range(self.min..=self.max)
        }
    }
}

/// Orchestrator settings.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Name of the tool under test, recorded in the outcome.
    pub tool: String,
    /// Seed the plan was built with, recorded so the run can be reproduced.
    pub seed: Option<u64>,
    /// Commands of one phase in flight at once.
    pub concurrency: usize,
    pub pause: PauseRange,
}

impl OrchestratorConfig {
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            seed: None,
            concurrency: 1,
            pause: PauseRange::default(),
        }
    }
}

/// One settled invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRecord {
    /// Key of the phase that issued the command.
    pub phase: String,
    pub category: Category,
    /// Space-joined command line.
    pub command: String,
    pub argv: Vec<String>,
    /// When the command was issued.
    pub timestamp: DateTime<Utc>,
    pub result: ExecutionResult,
    pub verdict: ValidationVerdict,
}

/// Everything a finished (or interrupted) session produced.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub tool: String,
    pub seed: Option<u64>,
    pub plan_digest: String,
    /// Commands the plan contained, settled or not.
    pub planned_commands: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// True when the operator cancelled before the plan was exhausted.
    pub interrupted: bool,
    /// Names of the planned phases, keyed by phase key, in session order.
    pub phases: Vec<(String, String)>,
    pub stats: StatsSnapshot,
    /// Settled records in issue order.
    pub records: Vec<CommandRecord>,
}

/// Runs a planned session.
pub struct SessionOrchestrator {
    runner: Arc<dyn ToolRunner>,
    validator: OutcomeValidator,
    stats: Arc<SessionStats>,
    progress: Option<Arc<SimulationProgress>>,
    config: OrchestratorConfig,
    cancel: CancellationToken,
}

impl SessionOrchestrator {
    pub fn new(
        runner: Arc<dyn ToolRunner>,
        validator: OutcomeValidator,
        config: OrchestratorConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            runner,
            validator,
            stats: Arc::new(SessionStats::new()),
            progress: None,
            config,
            cancel,
        }
    }

    /// Drive `progress` as commands settle.
    pub fn with_progress(mut self, progress: Arc<SimulationProgress>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Count verdicts into `stats` instead of a private instance.
    pub fn with_stats(mut self, stats: Arc<SessionStats>) -> Self {
        self.stats = stats;
        self
    }

    pub fn stats(&self) -> &Arc<SessionStats> {
        &self.stats
    }

    /// Run every phase in order and return the accumulated outcome.
    pub async fn run(self, phases: &[Phase]) -> SessionOutcome {
        let started_at = Utc::now();
        let plan_digest = phases::plan_digest(phases);
        let planned_commands = phases::total_commands(phases);
        let concurrency = self.config.concurrency.max(1);
        let mut records = Vec::with_capacity(planned_commands);
        let mut interrupted = false;

        tracing::info!(
            tool = %self.config.tool,
            phases = phases.len(),
            commands = planned_commands,
            concurrency,
            plan_digest = %plan_digest,
            "session starting"
        );

        'phases: for (index, phase) in phases.iter().enumerate() {
            if self.cancel.is_cancelled() {
                interrupted = true;
                break;
            }

            tracing::info!(
                phase = %phase.key,
                name = %phase.name,
                commands = phase.commands.len(),
                "phase starting"
            );
            if let Some(progress) = &self.progress {
                progress.begin_feature(index, &phase.name);
            }

            let mut settled = pin!(
                futures::stream::iter(phase.commands.iter().enumerate())
                    .map(|(position, spec)| self.issue(spec, position))
                    .buffered(concurrency)
            );

            loop {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => {
                        interrupted = true;
                        break 'phases;
                    }
                    next = settled.next() => match next {
                        Some(Some((spec, timestamp, result))) => {
                            records.push(self.settle(phase, spec, timestamp, result));
                        }
                        Some(None) => {
                            interrupted = true;
                            break 'phases;
                        }
                        None => break,
                    }
                }
            }

            let snapshot = self.stats.snapshot();
            let category = snapshot.features.get(phase.category.as_str());
            tracing::info!(
                phase = %phase.key,
                passed = category.map_or(0, |c| c.passed),
                failed = category.map_or(0, |c| c.failed),
                "phase finished"
            );
        }

        if interrupted {
            tracing::warn!(
                settled = records.len(),
                planned = planned_commands,
                "session interrupted; keeping results settled so far"
            );
        }
        if let Some(progress) = &self.progress {
            progress.finish(if interrupted { "Interrupted" } else { "Complete!" });
        }

        let stats = self.stats.snapshot();
        tracing::info!(
            total = stats.total,
            passed = stats.passed,
            failed = stats.failed,
            success_rate = %format!("{:.1}", stats.success_rate()),
            "session finished"
        );

        SessionOutcome {
            tool: self.config.tool.clone(),
            seed: self.config.seed,
            plan_digest,
            planned_commands,
            started_at,
            finished_at: Utc::now(),
            interrupted,
            phases: phases
                .iter()
                .map(|p| (p.key.clone(), p.name.clone()))
                .collect(),
            stats,
            records,
        }
    }

    /// Run one command. `None` when the session was cancelled while it ran:
    /// an interrupt that reached the child too is not the tool's behavior.
    async fn issue<'a>(
        &self,
        spec: &'a CommandSpec,
        position: usize,
    ) -> Option<(&'a CommandSpec, DateTime<Utc>, ExecutionResult)> {
        if position > 0 && !self.config.pause.is_zero() {
            tokio::time::sleep(self.config.pause.sample()).await;
        }
        tracing::debug!(
            command = %spec.display(),
            timeout_secs = spec.timeout().as_secs(),
            "issuing command"
        );
        let timestamp = Utc::now();
        let result = self.runner.run(spec).await;
        if self.cancel.is_cancelled() {
            tracing::debug!(command = %spec.display(), "dropping result of interrupted command");
            return None;
        }
        Some((spec, timestamp, result))
    }

    fn settle(
        &self,
        phase: &Phase,
        spec: &CommandSpec,
        timestamp: DateTime<Utc>,
        result: ExecutionResult,
    ) -> CommandRecord {
        let category = spec.category();
        let verdict = self.validator.evaluate(category, &result);
        self.stats.record(category.as_str(), verdict.passed);

        let command = spec.display();
        tracing::info!(
            command = %command,
            category = %category,
            exit_code = result.exit_code,
            kind = ?result.kind,
            duration_ms = result.duration.as_millis() as u64,
            verdict = verdict.label(),
            "command settled"
        );
        for line in &verdict.evidence {
            tracing::debug!(command = %command, evidence = %line);
        }
        if let Some(progress) = &self.progress {
            progress.command_completed(verdict.passed, &command);
        }

        CommandRecord {
            phase: phase.key.clone(),
            category,
            command,
            argv: spec.argv().to_vec(),
            timestamp,
            result,
            verdict,
        }
    }
}
