//! `rehearse run` command: plan a session, drive it and persist the report.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio_util::sync::CancellationToken;

use rehearse_core::orchestrator::{OrchestratorConfig, SessionOrchestrator};
use rehearse_core::phases::{self, Phase};
use rehearse_core::progress::{ProgressReporter, SimulationProgress};
use rehearse_core::regions::RegionCatalog;
use rehearse_core::report::{ReportGenerator, render_summary};
use rehearse_core::runner::{ProcessRunner, ProcessRunnerConfig};
use rehearse_core::validator::{OutcomeValidator, RuleTable};

use crate::config::RehearseConfig;

/// Exit code for an interrupted session.
pub const EXIT_INTERRUPTED: i32 = 130;
/// Exit code when the session ran but its report could not be written.
pub const EXIT_REPORT_FAILED: i32 = 1;

/// Build the command plan for `config`: region catalog, seeded sampling and
/// the phase filter.
pub fn plan_session(config: &RehearseConfig) -> Result<Vec<Phase>> {
    let catalog = RegionCatalog::load(&config.regions_dir);
    let mut rng = StdRng::seed_from_u64(config.seed);
    let plan = phases::build_phases(&catalog, &config.tool_name, &mut rng);
    Ok(phases::filter_phases(plan, &config.phases)?)
}

/// Run the session and return the process exit code.
pub async fn run_session(config: &RehearseConfig) -> Result<i32> {
    let plan = plan_session(config)?;
    let total = phases::total_commands(&plan);

    println!("Rehearsing {} session", config.tool_name);
    println!("  Phases: {}", plan.len());
    println!("  Commands: {total}");
    println!(
        "  Seed: {}{}",
        config.seed,
        if config.seed_generated { " (random)" } else { "" }
    );
    println!("  Validation: {} (missing tool: {})", config.validation_mode, config.missing_tool);
    if let Some(log_file) = &config.log_file {
        println!("  Log file: {}", log_file.display());
    }
    println!();

    let mut runner_config =
        ProcessRunnerConfig::new(&config.tool_name).probe_timeout(config.probe_timeout);
    if let Some(path) = &config.tool_path {
        runner_config = runner_config.tool_path(path);
    }
    let runner = Arc::new(ProcessRunner::new(runner_config));
    let validator = OutcomeValidator::new(
        RuleTable::for_mode(config.validation_mode),
        config.missing_tool,
    );

    let reporter = if config.progress {
        ProgressReporter::new(total, "Rehearsal")
    } else {
        ProgressReporter::hidden(total, "Rehearsal")
    };
    let progress = Arc::new(SimulationProgress::new(reporter, plan.len(), total));

    let mut orchestrator_config = OrchestratorConfig::new(&config.tool_name);
    orchestrator_config.seed = Some(config.seed);
    orchestrator_config.concurrency = config.concurrency;
    orchestrator_config.pause = config.pause;

    // Set up graceful shutdown: first signal cancels, second force-exits.
    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    let got_first_signal = Arc::new(AtomicBool::new(false));
    let got_first_clone = Arc::clone(&got_first_signal);

    tokio::spawn(async move {
        loop {
            tokio::signal::ctrl_c().await.ok();
            if got_first_clone.swap(true, Ordering::SeqCst) {
                eprintln!("\nForce exit.");
                std::process::exit(EXIT_INTERRUPTED);
            }
            eprintln!("\nShutting down gracefully (Ctrl+C again to force)...");
            cancel_clone.cancel();
        }
    });

    let outcome = SessionOrchestrator::new(runner, validator, orchestrator_config, cancel)
        .with_progress(progress)
        .run(&plan)
        .await;
    let interrupted = outcome.interrupted;

    let report = ReportGenerator::new().generate(outcome);
    let saved = match report.save(&config.report_path) {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(error = %e, "failed to save report");
            eprintln!("error: {e}");
            false
        }
    };

    println!();
    println!("{}", render_summary(&report));
    if saved {
        println!("Report: {}", config.report_path.display());
    } else {
        println!("Report was not saved.");
    }
    if let Some(log_file) = &config.log_file {
        println!("Log: {}", log_file.display());
    }

    if interrupted {
        println!("\nSession interrupted by signal; the report covers the commands settled so far.");
        return Ok(EXIT_INTERRUPTED);
    }
    if !saved {
        return Ok(EXIT_REPORT_FAILED);
    }
    Ok(0)
}
