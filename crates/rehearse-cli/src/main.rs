mod config;
mod logging;
mod phases_cmd;
mod report_cmd;
mod run_cmd;
#[cfg(test)]
mod test_util;
mod tui;

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use rehearse_core::report::SessionReport;
use rehearse_core::validator::{MissingToolPolicy, ValidationMode};

use config::{Overrides, RehearseConfig};

#[derive(Parser)]
#[command(
    name = "rehearse",
    version,
    about = "Rehearse realistic user sessions against a command-line tool and score how it behaves"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a rehearse config file with default settings
    Init {
        /// Program name of the tool under test
        #[arg(long, default_value = config::DEFAULT_TOOL)]
        tool: String,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Run a simulated session and write the report
    Run(RunArgs),
    /// Show the planned phases and commands without running them
    Phases {
        #[command(flatten)]
        plan: PlanArgs,
        /// List every command of every phase
        #[arg(long)]
        verbose: bool,
    },
    /// Print a saved session report
    Report {
        /// Path to the report JSON file
        file: PathBuf,
        /// Show every failed command with its evidence
        #[arg(long)]
        failures: bool,
    },
    /// Browse a saved session report interactively
    Dashboard {
        /// Path to the report JSON file
        file: PathBuf,
    },
    /// Generate shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

/// Flags that shape the command plan.
#[derive(Args)]
struct PlanArgs {
    /// Program name of the tool under test (overrides REHEARSE_TOOL)
    #[arg(long)]
    tool: Option<String>,
    /// Directory holding `{provider}_regions.json` files (overrides REHEARSE_REGIONS_DIR)
    #[arg(long)]
    regions_dir: Option<PathBuf>,
    /// Seed for region sampling; the same seed plans the same session
    #[arg(long)]
    seed: Option<u64>,
    /// Only run this phase (repeatable)
    #[arg(long = "phase", value_name = "KEY")]
    phases: Vec<String>,
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    plan: PlanArgs,
    /// Executable to launch instead of looking the tool up on PATH (overrides REHEARSE_TOOL_PATH)
    #[arg(long)]
    tool_path: Option<PathBuf>,
    /// Report output path (overrides REHEARSE_REPORT_PATH)
    #[arg(long)]
    report: Option<PathBuf>,
    /// Commands of one phase in flight at once
    #[arg(long)]
    concurrency: Option<usize>,
    /// Validation mode: heuristic or strict
    #[arg(long, value_name = "MODE")]
    validation: Option<ValidationMode>,
    /// Shorthand for --validation strict
    #[arg(long, conflicts_with = "validation")]
    strict: bool,
    /// How to score commands when the tool is missing: pass or fail
    #[arg(long, value_name = "POLICY")]
    missing_tool: Option<MissingToolPolicy>,
    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// Do not draw the progress bar
    #[arg(long)]
    no_progress: bool,
}

impl PlanArgs {
    fn into_overrides(self) -> Overrides {
        Overrides {
            tool: self.tool,
            regions_dir: self.regions_dir,
            seed: self.seed,
            phases: self.phases,
            ..Default::default()
        }
    }
}

impl RunArgs {
    fn into_overrides(self) -> Overrides {
        let validation_mode = if self.strict {
            Some(ValidationMode::Strict)
        } else {
            self.validation
        };
        Overrides {
            tool_path: self.tool_path,
            report_path: self.report,
            concurrency: self.concurrency,
            validation_mode,
            missing_tool: self.missing_tool,
            log_file: self.log_file,
            no_progress: self.no_progress,
            ..self.plan.into_overrides()
        }
    }
}

/// Execute the `rehearse init` command: write config file.
fn cmd_init(tool: &str, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let mut cfg = config::ConfigFile::default();
    cfg.tool.name = tool.to_string();
    config::save_config_to(&path, &cfg)?;

    println!("Config written to {}", path.display());
    println!("  tool.name = {tool}");
    println!("  output.report_path = {}", cfg.output.report_path.display());
    println!();
    println!("Next: run `rehearse phases` to preview the session, then `rehearse run`.");

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init { tool, force } => {
            logging::init("info", None)?;
            cmd_init(&tool, force)?;
        }
        Commands::Run(args) => {
            let resolved = RehearseConfig::resolve(&args.into_overrides())?;
            // Keep info-level console logs from tearing the progress bar.
            let console_level =
                if resolved.progress && std::io::stdout().is_terminal() { "warn" } else { "info" };
            logging::init(console_level, resolved.log_file.as_deref())?;

            let code = run_cmd::run_session(&resolved).await?;
            if code != 0 {
                std::process::exit(code);
            }
        }
        Commands::Phases { plan, verbose } => {
            logging::init("warn", None)?;
            let resolved = RehearseConfig::resolve(&plan.into_overrides())?;
            phases_cmd::run_phases(&resolved, verbose)?;
        }
        Commands::Report { file, failures } => {
            logging::init("info", None)?;
            report_cmd::run_report(&file, failures)?;
        }
        Commands::Dashboard { file } => {
            logging::init("warn", None)?;
            let report = SessionReport::load(&file)?;
            tui::run_dashboard(report)?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "rehearse", &mut std::io::stdout());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_flags_become_overrides() {
        let cli = Cli::try_parse_from([
            "rehearse",
            "run",
            "--tool",
            "drift",
            "--seed",
            "42",
            "--phase",
            "reporting",
            "--phase",
            "advanced",
            "--strict",
            "--missing-tool",
            "fail",
            "--concurrency",
            "3",
            "--no-progress",
        ])
        .unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        let overrides = args.into_overrides();
        assert_eq!(overrides.tool.as_deref(), Some("drift"));
        assert_eq!(overrides.seed, Some(42));
        assert_eq!(overrides.phases, ["reporting", "advanced"]);
        assert_eq!(overrides.validation_mode, Some(ValidationMode::Strict));
        assert_eq!(overrides.missing_tool, Some(MissingToolPolicy::Fail));
        assert_eq!(overrides.concurrency, Some(3));
        assert!(overrides.no_progress);
    }

    #[test]
    fn invalid_validation_mode_is_rejected() {
        let result = Cli::try_parse_from(["rehearse", "run", "--validation", "lenient"]);
        assert!(result.is_err());
    }

    #[test]
    fn strict_conflicts_with_validation() {
        let result =
            Cli::try_parse_from(["rehearse", "run", "--strict", "--validation", "heuristic"]);
        assert!(result.is_err());
    }
}
