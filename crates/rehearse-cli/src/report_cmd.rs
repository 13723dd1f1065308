//! `rehearse report` command: print a saved session report.

use std::path::Path;

use anyhow::Result;

use rehearse_core::report::{SessionReport, rate_marker, render_failures, render_summary};

/// Run the report command.
pub fn run_report(path: &Path, failures: bool) -> Result<()> {
    let report = SessionReport::load(path)?;

    println!("{}", render_summary(&report));
    println!();

    let categories = &report.summary.categories;
    if !categories.is_empty() {
        println!(
            "{:<16} {:>8} {:>8} {:>8} {:>8}",
            "CATEGORY", "TOTAL", "PASSED", "FAILED", "RATE"
        );
        println!("{}", "-".repeat(60));
        for (name, stats) in categories {
            println!(
                "{:<16} {:>8} {:>8} {:>8} {:>7.1}% {}",
                name,
                stats.total,
                stats.passed,
                stats.failed,
                stats.success_rate,
                rate_marker(stats.success_rate)
            );
        }
        println!();
    }

    let failed = report.failures().count();
    if failures {
        if failed == 0 {
            println!("No failed commands.");
        } else {
            println!("Failed commands ({failed}):");
            print!("{}", render_failures(&report));
        }
    } else if failed > 0 {
        println!("{failed} failed commands; rerun with --failures for details.");
    }

    Ok(())
}
