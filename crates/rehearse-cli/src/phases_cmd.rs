//! `rehearse phases` command: show the planned session without running it.

use anyhow::Result;

use rehearse_core::phases::{self, phase_info};

use crate::config::RehearseConfig;
use crate::run_cmd::plan_session;

/// Print the phase table, and every command when `verbose`.
pub fn run_phases(config: &RehearseConfig, verbose: bool) -> Result<()> {
    let plan = plan_session(config)?;

    println!(
        "{:<28} {:<26} {:<16} {:>8} {:>8}",
        "PHASE", "NAME", "CATEGORY", "COMMANDS", "TIMEOUT"
    );
    println!("{}", "-".repeat(90));

    for phase in &plan {
        let timeout = phase_info(&phase.key)
            .map(|info| format!("{}s", info.timeout.as_secs()))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<28} {:<26} {:<16} {:>8} {:>8}",
            phase.key,
            phase.name,
            phase.category.as_str(),
            phase.commands.len(),
            timeout
        );
        if verbose {
            for command in &phase.commands {
                println!("    {}", command.display());
            }
        }
    }

    println!();
    println!(
        "Total: {} commands in {} phases (seed {}, plan {})",
        phases::total_commands(&plan),
        plan.len(),
        config.seed,
        &phases::plan_digest(&plan)[..12]
    );
    Ok(())
}
