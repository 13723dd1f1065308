//! Session-level tests: orchestrator, validator, stats, progress and report
//! wired together against scripted tool runners.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio_util::sync::CancellationToken;

use rehearse_core::command::{Category, CommandSpec};
use rehearse_core::orchestrator::{OrchestratorConfig, SessionOrchestrator};
use rehearse_core::phases::{self, Phase};
use rehearse_core::progress::{ProgressReporter, SimulationProgress};
use rehearse_core::regions::RegionCatalog;
use rehearse_core::report::{ReportGenerator, SessionReport};
use rehearse_core::runner::{
    CompletionKind, ExecutionResult, ProcessRunner, ProcessRunnerConfig, ToolRunner,
};
use rehearse_core::validator::{
    GRACEFUL_MISSING_TOOL, MissingToolPolicy, OutcomeValidator, RuleTable,
};

// ===========================================================================
// Fakes
// ===========================================================================

/// Answers from a table keyed by command line. Unlisted commands succeed,
/// except error-handling ones, which report an error.
#[derive(Default)]
struct ScriptedRunner {
    responses: HashMap<String, ExecutionResult>,
    calls: AtomicUsize,
}

impl ScriptedRunner {
    fn respond(mut self, command: &str, result: ExecutionResult) -> Self {
        self.responses.insert(command.to_owned(), result);
        self
    }
}

#[async_trait]
impl ToolRunner for ScriptedRunner {
    async fn run(&self, spec: &CommandSpec) -> ExecutionResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .get(&spec.display())
            .cloned()
            .unwrap_or_else(|| match spec.category() {
                Category::ErrorHandling => completed(2, "", "error: invalid input"),
                _ => completed(0, "ok", ""),
            })
    }
}

/// Reports the tool as missing for every command.
struct MissingToolRunner;

#[async_trait]
impl ToolRunner for MissingToolRunner {
    async fn run(&self, spec: &CommandSpec) -> ExecutionResult {
        ExecutionResult::tool_unavailable(spec.program())
    }
}

/// Cancels the session on call `cancel_at` and then never returns.
struct CancellingRunner {
    cancel: CancellationToken,
    cancel_at: usize,
    calls: AtomicUsize,
}

#[async_trait]
impl ToolRunner for CancellingRunner {
    async fn run(&self, _spec: &CommandSpec) -> ExecutionResult {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call >= self.cancel_at {
            self.cancel.cancel();
            std::future::pending::<()>().await;
        }
        completed(0, "ok", "")
    }
}

/// Cancels the session on call `cancel_at` and still returns the exit
/// status an interrupted child would report.
struct SignalledChildRunner {
    cancel: CancellationToken,
    cancel_at: usize,
    calls: AtomicUsize,
}

#[async_trait]
impl ToolRunner for SignalledChildRunner {
    async fn run(&self, _spec: &CommandSpec) -> ExecutionResult {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.cancel_at {
            self.cancel.cancel();
            return completed(130, "", "");
        }
        completed(0, "ok", "")
    }
}

/// Later commands finish first.
struct ReverseLatencyRunner;

#[async_trait]
impl ToolRunner for ReverseLatencyRunner {
    async fn run(&self, spec: &CommandSpec) -> ExecutionResult {
        let index: u64 = spec.args()[0].parse().unwrap();
        tokio::time::sleep(Duration::from_millis(60 - index * 10)).await;
        completed(0, &format!("done {index}"), "")
    }
}

// ===========================================================================
// Helpers
// ===========================================================================

fn completed(code: i32, stdout: &str, stderr: &str) -> ExecutionResult {
    ExecutionResult::completed(code, stdout.into(), stderr.into(), Duration::from_millis(10))
}

fn spec(args: &[&str], category: Category) -> CommandSpec {
    CommandSpec::new("driftmgr", args.iter().copied(), category, Duration::from_secs(5))
}

fn phase(key: &str, category: Category, commands: Vec<CommandSpec>) -> Phase {
    Phase::new(key, key, category, commands)
}

fn orchestrator(runner: Arc<dyn ToolRunner>, cancel: CancellationToken) -> SessionOrchestrator {
    SessionOrchestrator::new(
        runner,
        OutcomeValidator::default(),
        OrchestratorConfig::new("driftmgr"),
        cancel,
    )
}

fn default_plan(seed: u64) -> Vec<Phase> {
    phases::build_phases(
        &RegionCatalog::defaults(),
        "driftmgr",
        &mut StdRng::seed_from_u64(seed),
    )
}

// ===========================================================================
// Tests
// ===========================================================================

#[tokio::test]
async fn scenarios_are_judged_per_category() {
    let runner = ScriptedRunner::default()
        .respond(
            "driftmgr discover aws us-east-1",
            completed(0, "Discovered 12 resources", ""),
        )
        .respond("driftmgr invalid-command", completed(1, "", "unknown command"))
        .respond("driftmgr analyze", completed(1, "", ""));
    let plan = vec![
        phase(
            "resource_discovery",
            Category::Discovery,
            vec![spec(&["discover", "aws", "us-east-1"], Category::Discovery)],
        ),
        phase(
            "drift_analysis",
            Category::Analysis,
            vec![spec(&["analyze"], Category::Analysis)],
        ),
        phase(
            "error_handling",
            Category::ErrorHandling,
            vec![spec(&["invalid-command"], Category::ErrorHandling)],
        ),
    ];

    let outcome = orchestrator(Arc::new(runner), CancellationToken::new())
        .run(&plan)
        .await;

    let verdicts: Vec<_> = outcome
        .records
        .iter()
        .map(|r| (r.command.as_str(), r.verdict.passed))
        .collect();
    assert_eq!(
        verdicts,
        [
            ("driftmgr discover aws us-east-1", true),
            ("driftmgr analyze", false),
            ("driftmgr invalid-command", true),
        ]
    );
    assert_eq!((outcome.stats.total, outcome.stats.passed, outcome.stats.failed), (3, 2, 1));
    assert!(outcome.stats.check_invariants().is_ok());
    assert!(!outcome.interrupted);
}

#[tokio::test]
async fn missing_tool_degrades_every_command_to_a_pass() {
    let plan = default_plan(11);
    let total = phases::total_commands(&plan);
    let outcome = orchestrator(Arc::new(MissingToolRunner), CancellationToken::new())
        .run(&plan)
        .await;
    let report = ReportGenerator::new().generate(outcome);

    assert_eq!(report.summary.total as usize, total);
    assert_eq!(report.summary.passed, report.summary.total);
    assert_eq!(report.summary.degraded_passes, report.summary.total);
    assert_eq!(report.summary.successful_commands, 0);
    assert!(report.records.iter().all(|r| {
        r.result.kind == CompletionKind::ToolUnavailable
            && r.verdict.evidence.iter().any(|e| e == GRACEFUL_MISSING_TOOL)
    }));
}

#[tokio::test]
async fn fail_policy_turns_missing_tool_into_failures() {
    let plan = vec![phase(
        "credential_auto_detection",
        Category::Credentials,
        vec![spec(&["credentials", "--show"], Category::Credentials)],
    )];
    let outcome = SessionOrchestrator::new(
        Arc::new(MissingToolRunner),
        OutcomeValidator::new(RuleTable::heuristic(), MissingToolPolicy::Fail),
        OrchestratorConfig::new("driftmgr"),
        CancellationToken::new(),
    )
    .run(&plan)
    .await;
    assert_eq!(outcome.stats.failed, 1);
}

#[tokio::test]
async fn zero_command_session_reports_zero_rate() {
    let outcome = orchestrator(Arc::new(ScriptedRunner::default()), CancellationToken::new())
        .run(&[])
        .await;
    let report = ReportGenerator::new().generate(outcome);
    assert_eq!(report.summary.total, 0);
    assert_eq!(report.summary.success_rate, 0.0);
    assert!(report.records.is_empty());
}

#[tokio::test]
async fn cancellation_keeps_a_partial_report() {
    let cancel = CancellationToken::new();
    let runner = Arc::new(CancellingRunner {
        cancel: cancel.clone(),
        cancel_at: 3,
        calls: AtomicUsize::new(0),
    });
    let plan = vec![
        phase(
            "monitoring",
            Category::Monitoring,
            vec![
                spec(&["monitor", "--start"], Category::Monitoring),
                spec(&["monitor", "--status"], Category::Monitoring),
                spec(&["monitor", "--stop"], Category::Monitoring),
            ],
        ),
        phase(
            "reporting",
            Category::Reporting,
            vec![spec(&["report", "--format", "json"], Category::Reporting)],
        ),
    ];

    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        orchestrator(runner.clone(), cancel).run(&plan),
    )
    .await
    .expect("cancelled session must return");

    assert!(outcome.interrupted);
    assert_eq!(outcome.records.len(), 2);
    assert_eq!(outcome.planned_commands, 4);
    assert_eq!(runner.calls.load(Ordering::SeqCst), 3, "later phases must not start");
    assert!(outcome.stats.check_invariants().is_ok());

    let report = ReportGenerator::new().generate(outcome);
    assert!(report.interrupted);
    assert_eq!(report.summary.features[0].total_commands, 2);
    assert_eq!(report.summary.features[1].total_commands, 0);
}

#[tokio::test]
async fn command_interrupted_with_the_session_is_not_recorded() {
    let cancel = CancellationToken::new();
    let runner = Arc::new(SignalledChildRunner {
        cancel: cancel.clone(),
        cancel_at: 2,
        calls: AtomicUsize::new(0),
    });
    let plan = vec![phase(
        "monitoring",
        Category::Monitoring,
        vec![
            spec(&["monitor", "--start"], Category::Monitoring),
            spec(&["monitor", "--status"], Category::Monitoring),
            spec(&["monitor", "--stop"], Category::Monitoring),
        ],
    )];

    let outcome = orchestrator(runner.clone(), cancel).run(&plan).await;

    assert!(outcome.interrupted);
    assert_eq!(outcome.records.len(), 1);
    assert!(outcome.records.iter().all(|r| r.result.exit_code != 130));
    assert_eq!((outcome.stats.total, outcome.stats.failed), (1, 0));
    assert_eq!(runner.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn already_cancelled_session_runs_nothing() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let runner = Arc::new(ScriptedRunner::default());
    let outcome = orchestrator(runner.clone(), cancel).run(&default_plan(1)).await;
    assert!(outcome.interrupted);
    assert!(outcome.records.is_empty());
    assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn parallel_issue_still_records_in_issue_order() {
    let commands = (0..6)
        .map(|i| spec(&[i.to_string().as_str()], Category::Advanced))
        .collect();
    let plan = vec![phase("advanced", Category::Advanced, commands)];
    let mut config = OrchestratorConfig::new("driftmgr");
    config.concurrency = 6;

    let outcome = SessionOrchestrator::new(
        Arc::new(ReverseLatencyRunner),
        OutcomeValidator::default(),
        config,
        CancellationToken::new(),
    )
    .run(&plan)
    .await;

    let order: Vec<_> = outcome
        .records
        .iter()
        .map(|r| r.result.stdout.clone())
        .collect();
    let expected: Vec<_> = (0..6).map(|i| format!("done {i}")).collect();
    assert_eq!(order, expected);
}

#[tokio::test]
async fn progress_reaches_completion_without_going_backwards() {
    let plan = default_plan(3);
    let total = phases::total_commands(&plan);
    let progress = Arc::new(SimulationProgress::new(
        ProgressReporter::hidden(total, "test"),
        plan.len(),
        total,
    ));

    let outcome = orchestrator(Arc::new(ScriptedRunner::default()), CancellationToken::new())
        .with_progress(progress.clone())
        .run(&plan)
        .await;

    assert_eq!(progress.completed(), total);
    let snap = progress.snapshot();
    assert_eq!(snap.percentage, 100);
    assert_eq!(snap.label.as_deref(), Some("Complete!"));
    assert_eq!(outcome.records.len(), total);
}

#[tokio::test]
async fn full_plan_report_round_trips_through_disk() {
    let plan = default_plan(42);
    let runner = ScriptedRunner::default()
        .respond("driftmgr credentials list", completed(3, "", "no credentials"))
        .respond("driftmgr invalid-command", completed(0, "", ""));
    let mut config = OrchestratorConfig::new("driftmgr");
    config.seed = Some(42);

    let outcome = SessionOrchestrator::new(
        Arc::new(runner),
        OutcomeValidator::default(),
        config,
        CancellationToken::new(),
    )
    .run(&plan)
    .await;
    assert_eq!(outcome.plan_digest, phases::plan_digest(&default_plan(42)));

    let report = ReportGenerator::new().generate(outcome);
    assert_eq!(report.summary.failed, 2);
    assert_eq!(report.seed, Some(42));

    let sum: u64 = report.summary.categories.values().map(|c| c.total).sum();
    assert_eq!(sum, report.summary.total);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.json");
    report.save(&path).unwrap();
    let loaded = SessionReport::load(&path).unwrap();

    assert_eq!(loaded.summary.total, report.summary.total);
    assert_eq!(loaded.summary.failed, report.summary.failed);
    assert_eq!(loaded.plan_digest, report.plan_digest);
    assert!((loaded.summary.success_rate - report.summary.success_rate).abs() < 1e-9);
    let argvs = |r: &SessionReport| r.records.iter().map(|c| c.argv.clone()).collect::<Vec<_>>();
    assert_eq!(argvs(&loaded), argvs(&report));
    let failed: Vec<_> = loaded.failures().map(|r| r.command.as_str()).collect();
    assert_eq!(failed, ["driftmgr credentials list", "driftmgr invalid-command"]);
}

#[tokio::test]
async fn real_process_runner_with_absent_tool() {
    let runner = ProcessRunner::new(ProcessRunnerConfig::new("rehearse-no-such-tool-4f1c"));
    let plan = vec![phase(
        "credential_auto_detection",
        Category::Credentials,
        vec![
            CommandSpec::new(
                "rehearse-no-such-tool-4f1c",
                ["credentials", "--show"],
                Category::Credentials,
                Duration::from_secs(5),
            ),
            CommandSpec::new(
                "rehearse-no-such-tool-4f1c",
                ["credentials", "list"],
                Category::Credentials,
                Duration::from_secs(5),
            ),
        ],
    )];

    let outcome = orchestrator(Arc::new(runner), CancellationToken::new())
        .run(&plan)
        .await;

    assert_eq!(outcome.stats.passed, 2);
    for record in &outcome.records {
        assert_eq!(record.result.kind, CompletionKind::ToolUnavailable);
        assert_eq!(record.result.duration, Duration::ZERO);
        assert!(record.verdict.is_degraded_pass());
    }
}
