//! Session report: the persisted, externally consumable result of a run.
//!
//! [`ReportGenerator::generate`] folds a [`SessionOutcome`] into a
//! [`SessionReport`]: a summary block (totals, rates, per-category and
//! per-feature breakdowns) followed by every record in issue order. All
//! maps are ordered so two reports of the same plan diff cleanly.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::orchestrator::{CommandRecord, SessionOutcome};
use crate::runner::duration_ms;
use crate::stats::{FeatureStatistics, success_rate};

/// Bumped when the report layout changes incompatibly.
pub const REPORT_FORMAT_VERSION: u32 = 1;

/// Errors persisting or loading a report.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write report to {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read report {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize report: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("{} is not a valid session report: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// Aggregates for one phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSummary {
    pub key: String,
    pub name: String,
    /// Settled commands.
    pub total_commands: u64,
    /// Commands that exited 0.
    pub successful_commands: u64,
    /// Verdict-level counters.
    pub passed: u64,
    pub failed: u64,
    pub success_rate: f64,
    #[serde(rename = "total_duration_ms", with = "duration_ms")]
    pub total_duration: Duration,
    /// `total_duration / total_commands`; zero for a phase with no commands.
    #[serde(rename = "avg_duration_ms", with = "duration_ms")]
    pub avg_duration: Duration,
}

/// The summary block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub planned_commands: u64,
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
    /// Verdict pass rate, `passed / total * 100`.
    pub success_rate: f64,
    /// Commands that exited 0.
    pub successful_commands: u64,
    /// Exit-code success rate, for comparison with the verdict rate.
    pub command_success_rate: f64,
    /// Passes that only reflect an absent tool being handled.
    pub degraded_passes: u64,
    #[serde(rename = "total_duration_ms", with = "duration_ms")]
    pub total_duration: Duration,
    /// Verdict counters per category.
    pub categories: BTreeMap<String, FeatureStatistics>,
    /// Per-phase aggregates in session order.
    pub features: Vec<FeatureSummary>,
}

/// One session, as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub format_version: u32,
    pub session_id: Uuid,
    pub tool: String,
    pub seed: Option<u64>,
    pub plan_digest: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub interrupted: bool,
    pub summary: ReportSummary,
    pub records: Vec<CommandRecord>,
}

impl SessionReport {
    /// Write the report as pretty-printed JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ReportError> {
        let json = serde_json::to_string_pretty(self).map_err(ReportError::Serialize)?;
        let write_err = |source: std::io::Error| ReportError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        std::fs::write(path, json + "\n").map_err(write_err)?;
        tracing::info!(path = %path.display(), records = self.records.len(), "report saved");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, ReportError> {
        let text = std::fs::read_to_string(path).map_err(|source| ReportError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ReportError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Records whose verdict failed, in issue order.
    pub fn failures(&self) -> impl Iterator<Item = &CommandRecord> {
        self.records.iter().filter(|r| !r.verdict.passed)
    }

    /// Records issued by phase `key`, in issue order.
    pub fn records_for<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a CommandRecord> {
        self.records.iter().filter(move |r| r.phase == key)
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Builds [`SessionReport`]s.
#[derive(Debug, Clone, Default)]
pub struct ReportGenerator {
    session_id: Option<Uuid>,
}

impl ReportGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a fixed session id instead of a random one.
    pub fn session_id(mut self, id: Uuid) -> Self {
        self.session_id = Some(id);
        self
    }

    pub fn generate(&self, outcome: SessionOutcome) -> SessionReport {
        let records = outcome.records;

        let features = outcome
            .phases
            .iter()
            .map(|(key, name)| summarize_feature(key, name, &records))
            .collect();

        let successful_commands = records.iter().filter(|r| r.result.exit_code == 0).count() as u64;
        let degraded_passes = records
            .iter()
            .filter(|r| r.verdict.is_degraded_pass())
            .count() as u64;
        let total_duration: Duration = records.iter().map(|r| r.result.duration).sum();
        let stats = outcome.stats;

        let summary = ReportSummary {
            planned_commands: outcome.planned_commands as u64,
            total: stats.total,
            passed: stats.passed,
            failed: stats.failed,
            success_rate: stats.success_rate(),
            successful_commands,
            command_success_rate: success_rate(successful_commands, records.len() as u64),
            degraded_passes,
            total_duration,
            categories: stats.features,
            features,
        };

        SessionReport {
            format_version: REPORT_FORMAT_VERSION,
            session_id: self.session_id.unwrap_or_else(Uuid::new_v4),
            tool: outcome.tool,
            seed: outcome.seed,
            plan_digest: outcome.plan_digest,
            started_at: outcome.started_at,
            finished_at: outcome.finished_at,
            interrupted: outcome.interrupted,
            summary,
            records,
        }
    }
}

fn summarize_feature(key: &str, name: &str, records: &[CommandRecord]) -> FeatureSummary {
    let mut summary = FeatureSummary {
        key: key.to_owned(),
        name: name.to_owned(),
        total_commands: 0,
        successful_commands: 0,
        passed: 0,
        failed: 0,
        success_rate: 0.0,
        total_duration: Duration::ZERO,
        avg_duration: Duration::ZERO,
    };
    for record in records.iter().filter(|r| r.phase == key) {
        summary.total_commands += 1;
        summary.total_duration += record.result.duration;
        if record.result.exit_code == 0 {
            summary.successful_commands += 1;
        }
        if record.verdict.passed {
            summary.passed += 1;
        } else {
            summary.failed += 1;
        }
    }
    summary.success_rate = success_rate(summary.passed, summary.total_commands);
    if summary.total_commands > 0 {
        summary.avg_duration = summary.total_duration / summary.total_commands as u32;
    }
    summary
}

// ---------------------------------------------------------------------------
// Console rendering
// ---------------------------------------------------------------------------

/// `[OK]` at 80% and above, `[WARN]` at 60% and above, `[FAIL]` below.
pub fn rate_marker(rate: f64) -> &'static str {
    if rate >= 80.0 {
        "[OK]"
    } else if rate >= 60.0 {
        "[WARN]"
    } else {
        "[FAIL]"
    }
}

/// Human-readable summary of `report`.
pub fn render_summary(report: &SessionReport) -> String {
    let s = &report.summary;
    let mut out = String::new();
    let rule = "=".repeat(60);

    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "Simulation Summary");
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "Tool:            {}", report.tool);
    let _ = writeln!(out, "Session:         {}", report.session_id);
    let _ = writeln!(out, "Plan digest:     {}", short_digest(&report.plan_digest));
    if let Some(seed) = report.seed {
        let _ = writeln!(out, "Seed:            {seed}");
    }
    if report.interrupted {
        let _ = writeln!(
            out,
            "Status:          interrupted ({}/{} commands settled)",
            s.total, s.planned_commands
        );
    } else {
        let _ = writeln!(out, "Status:          completed");
    }
    let _ = writeln!(out, "Total tests:     {}", s.total);
    let _ = writeln!(out, "Passed:          {}", s.passed);
    let _ = writeln!(out, "Failed:          {}", s.failed);
    let _ = writeln!(out, "Success rate:    {:.1}%", s.success_rate);
    let _ = writeln!(
        out,
        "Exit code 0:     {}/{} ({:.1}%)",
        s.successful_commands, s.total, s.command_success_rate
    );
    let _ = writeln!(out, "Total duration:  {:.2}s", s.total_duration.as_secs_f64());
    if s.degraded_passes > 0 {
        let _ = writeln!(
            out,
            "Degraded passes: {} (tool absent; these reflect harness resilience, \
             not tool correctness)",
            s.degraded_passes
        );
    }

    if !s.features.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Feature results:");
        for feature in &s.features {
            let _ = writeln!(
                out,
                "  {:<6} {:<28} {:>4}/{:<4} {:>5.1}%  avg {:.2}s",
                rate_marker(feature.success_rate),
                feature.name,
                feature.passed,
                feature.total_commands,
                feature.success_rate,
                feature.avg_duration.as_secs_f64()
            );
        }
    }
    let _ = write!(out, "{rule}");
    out
}

/// Failed records with their evidence.
pub fn render_failures(report: &SessionReport) -> String {
    let mut out = String::new();
    for record in report.failures() {
        let _ = writeln!(
            out,
            "[FAIL] {} ({}, exit {}, {:?})",
            record.command, record.category, record.result.exit_code, record.result.kind
        );
        let _ = writeln!(out, "       expected: {}", record.verdict.expected_behavior);
        for line in &record.verdict.evidence {
            let _ = writeln!(out, "       - {line}");
        }
    }
    out
}

fn short_digest(digest: &str) -> &str {
    digest.get(..12).unwrap_or(digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Category;
    use crate::runner::ExecutionResult;
    use crate::stats::SessionStats;
    use crate::validator::OutcomeValidator;

    fn record(phase: &str, category: Category, result: ExecutionResult) -> CommandRecord {
        let verdict = OutcomeValidator::default().evaluate(category, &result);
        CommandRecord {
            phase: phase.into(),
            category,
            command: format!("driftmgr {phase}"),
            argv: vec!["driftmgr".into(), phase.into()],
            timestamp: Utc::now(),
            result,
            verdict,
        }
    }

    fn outcome(records: Vec<CommandRecord>, phases: &[(&str, &str)]) -> SessionOutcome {
        let stats = SessionStats::new();
        for r in &records {
            stats.record(r.category.as_str(), r.verdict.passed);
        }
        SessionOutcome {
            tool: "driftmgr".into(),
            seed: Some(7),
            plan_digest: "ab".repeat(32),
            planned_commands: records.len(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            interrupted: false,
            phases: phases
                .iter()
                .map(|(k, n)| ((*k).to_owned(), (*n).to_owned()))
                .collect(),
            stats: stats.snapshot(),
            records,
        }
    }

    fn ok(stdout: &str, ms: u64) -> ExecutionResult {
        ExecutionResult::completed(0, stdout.into(), String::new(), Duration::from_millis(ms))
    }

    #[test]
    fn empty_session_reports_zero_rates() {
        let report = ReportGenerator::new().generate(outcome(vec![], &[]));
        assert_eq!(report.summary.total, 0);
        assert_eq!(report.summary.success_rate, 0.0);
        assert_eq!(report.summary.command_success_rate, 0.0);
        assert!(!report.summary.success_rate.is_nan());
        assert!(render_summary(&report).contains("Success rate:    0.0%"));
    }

    #[test]
    fn feature_averages_and_rates() {
        let records = vec![
            record("drift_analysis", Category::Analysis, ok("", 100)),
            record("drift_analysis", Category::Analysis, ok("", 300)),
            record(
                "drift_analysis",
                Category::Analysis,
                ExecutionResult::completed(
                    1,
                    String::new(),
                    String::new(),
                    Duration::from_millis(200),
                ),
            ),
            record(
                "error_handling",
                Category::ErrorHandling,
                ExecutionResult::completed(
                    1,
                    String::new(),
                    "bad flag".into(),
                    Duration::from_millis(50),
                ),
            ),
        ];
        let report = ReportGenerator::new().generate(outcome(
            records,
            &[("drift_analysis", "Drift Analysis"), ("error_handling", "Error Handling")],
        ));
        let s = &report.summary;
        assert_eq!((s.total, s.passed, s.failed), (4, 3, 1));
        assert_eq!(s.success_rate, 75.0);
        assert_eq!(s.successful_commands, 2);
        assert_eq!(s.command_success_rate, 50.0);
        assert_eq!(s.total_duration, Duration::from_millis(650));

        let analysis = &s.features[0];
        assert_eq!(analysis.total_commands, 3);
        assert_eq!(analysis.avg_duration, Duration::from_millis(200));
        assert!((analysis.success_rate - 200.0 / 3.0).abs() < 1e-9);

        let errors = &s.features[1];
        assert_eq!(errors.passed, 1);
        assert_eq!(errors.successful_commands, 0);

        assert_eq!(s.categories["analysis"].total, 3);
        assert_eq!(s.categories["error-handling"].passed, 1);
    }

    #[test]
    fn unreached_phase_is_listed_with_zeroes() {
        let records = vec![record("credential_auto_detection", Category::Credentials, ok("", 10))];
        let mut out = outcome(
            records,
            &[
                ("credential_auto_detection", "Credential Auto-Detection"),
                ("state_file_detection", "State File Detection"),
            ],
        );
        out.interrupted = true;
        out.planned_commands = 97;
        let report = ReportGenerator::new().generate(out);

        let state = &report.summary.features[1];
        assert_eq!(state.total_commands, 0);
        assert_eq!(state.avg_duration, Duration::ZERO);
        assert!(render_summary(&report).contains("interrupted (1/97 commands settled)"));
    }

    #[test]
    fn degraded_passes_are_counted_and_called_out() {
        let records = vec![
            record(
                "credential_auto_detection",
                Category::Credentials,
                ExecutionResult::tool_unavailable("driftmgr"),
            ),
            record("credential_auto_detection", Category::Credentials, ok("credentials found", 5)),
        ];
        let report = ReportGenerator::new().generate(outcome(
            records,
            &[("credential_auto_detection", "Credential Auto-Detection")],
        ));
        assert_eq!(report.summary.degraded_passes, 1);
        assert!(render_summary(&report).contains("not tool correctness"));
    }

    #[test]
    fn missing_file_reported_by_the_tool_is_not_a_degraded_pass() {
        let records = vec![record(
            "state_file_detection",
            Category::State,
            ExecutionResult::completed(
                1,
                String::new(),
                "Error: state file not found: ./terraform.tfstate".into(),
                Duration::from_millis(4),
            ),
        )];
        let report = ReportGenerator::new().generate(outcome(
            records,
            &[("state_file_detection", "State File Detection")],
        ));
        assert_eq!(report.summary.passed, 1);
        assert_eq!(report.summary.degraded_passes, 0);
        assert!(!render_summary(&report).contains("Degraded passes"));
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/report.json");
        let records = vec![
            record("monitoring", Category::Monitoring, ok("dashboard up", 12)),
            record(
                "monitoring",
                Category::Monitoring,
                ExecutionResult::timed_out(Duration::from_secs(5)),
            ),
            record("reporting", Category::Reporting, ok("", 3)),
        ];
        let report = ReportGenerator::new().generate(outcome(
            records,
            &[("monitoring", "Monitoring & Dashboard"), ("reporting", "Reporting")],
        ));
        report.save(&path).unwrap();

        let loaded = SessionReport::load(&path).unwrap();
        assert_eq!(loaded.session_id, report.session_id);
        assert_eq!(loaded.summary.total, report.summary.total);
        assert_eq!(loaded.summary.passed, report.summary.passed);
        assert_eq!(loaded.summary.categories.len(), report.summary.categories.len());
        assert!((loaded.summary.success_rate - report.summary.success_rate).abs() < 1e-9);
        let commands = |r: &SessionReport| {
            r.records.iter().map(|c| c.command.clone()).collect::<Vec<_>>()
        };
        assert_eq!(commands(&loaded), commands(&report));
        assert_eq!(loaded.records[1].result, report.records[1].result);
        assert_eq!(loaded.records[1].verdict, report.records[1].verdict);
    }

    #[test]
    fn load_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{\"format_version\": 1}").unwrap();
        let err = SessionReport::load(&path).unwrap_err();
        assert!(matches!(err, ReportError::Parse { .. }));

        let err = SessionReport::load(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ReportError::Read { .. }));
    }

    #[test]
    fn save_into_a_file_path_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let report = ReportGenerator::new().generate(outcome(vec![], &[]));
        let err = report.save(&blocker.join("report.json")).unwrap_err();
        assert!(matches!(err, ReportError::Write { .. }));
    }

    #[test]
    fn failures_lists_evidence() {
        let records = vec![
            record("drift_analysis", Category::Analysis, ok("", 1)),
            record(
                "drift_analysis",
                Category::Analysis,
                ExecutionResult::completed(1, String::new(), String::new(), Duration::ZERO),
            ),
        ];
        let report = ReportGenerator::new()
            .generate(outcome(records, &[("drift_analysis", "Drift Analysis")]));
        assert_eq!(report.failures().count(), 1);
        let text = render_failures(&report);
        assert!(text.starts_with("[FAIL] driftmgr drift_analysis (analysis, exit 1"));
        assert!(text.contains("expected: "));
    }

    #[test]
    fn rate_markers() {
        assert_eq!(rate_marker(80.0), "[OK]");
        assert_eq!(rate_marker(79.9), "[WARN]");
        assert_eq!(rate_marker(60.0), "[WARN]");
        assert_eq!(rate_marker(10.0), "[FAIL]");
    }

    #[test]
    fn fixed_session_id() {
        let id = Uuid::nil();
        let report = ReportGenerator::new().session_id(id).generate(outcome(vec![], &[]));
        assert_eq!(report.session_id, id);
    }
}
