//! Configuration file management for rehearse.
//!
//! Provides a TOML-based config file at `~/.config/rehearse/config.toml` and
//! a resolution chain: CLI flag > env var > config file > default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use rehearse_core::orchestrator::PauseRange;
use rehearse_core::validator::{MissingToolPolicy, ValidationMode};

pub const ENV_TOOL: &str = "REHEARSE_TOOL";
pub const ENV_TOOL_PATH: &str = "REHEARSE_TOOL_PATH";
pub const ENV_REGIONS_DIR: &str = "REHEARSE_REGIONS_DIR";
pub const ENV_REPORT_PATH: &str = "REHEARSE_REPORT_PATH";

pub const DEFAULT_TOOL: &str = "driftmgr";
pub const DEFAULT_REPORT_PATH: &str = "rehearse_report.json";

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub tool: ToolSection,
    pub session: SessionSection,
    pub validation: ValidationSection,
    pub output: OutputSection,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSection {
    /// Program name of the tool under test.
    pub name: String,
    /// Explicit executable, instead of a PATH lookup of `name`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub probe_timeout_secs: u64,
}

impl Default for ToolSection {
    fn default() -> Self {
        Self {
            name: DEFAULT_TOOL.to_string(),
            path: None,
            probe_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// Seed for region sampling; random when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub concurrency: usize,
    pub pause_min_ms: u64,
    pub pause_max_ms: u64,
    /// Directory holding `{provider}_regions.json` files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regions_dir: Option<PathBuf>,
    /// Phase keys to run; empty runs every phase.
    pub phases: Vec<String>,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            seed: None,
            concurrency: 1,
            pause_min_ms: 0,
            pause_max_ms: 0,
            regions_dir: None,
            phases: Vec::new(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSection {
    pub mode: ValidationMode,
    pub missing_tool: MissingToolPolicy,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    pub report_path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
    pub progress: bool,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            report_path: PathBuf::from(DEFAULT_REPORT_PATH),
            log_file: None,
            progress: true,
        }
    }
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the rehearse config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/rehearse` or `~/.config/rehearse`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("rehearse");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("rehearse")
}

/// Return the path to the rehearse config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file at `path`. A missing file is `Ok(None)`;
/// a malformed one is an error.
pub fn load_config_from(path: &Path) -> Result<Option<ConfigFile>> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e)
                .with_context(|| format!("failed to read config file at {}", path.display()));
        }
    };
    let config: ConfigFile = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))?;
    Ok(Some(config))
}

/// Serialize and write `config` to `path`, creating parent dirs as needed.
pub fn save_config_to(path: &Path, config: &ConfigFile) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create config directory {}", dir.display()))?;
    }
    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(path, contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;
    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Values given on the command line. `None`/empty means "not given".
#[derive(Debug, Default)]
pub struct Overrides {
    pub tool: Option<String>,
    pub tool_path: Option<PathBuf>,
    pub regions_dir: Option<PathBuf>,
    pub seed: Option<u64>,
    pub phases: Vec<String>,
    pub concurrency: Option<usize>,
    pub validation_mode: Option<ValidationMode>,
    pub missing_tool: Option<MissingToolPolicy>,
    pub report_path: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub no_progress: bool,
}

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct RehearseConfig {
    pub tool_name: String,
    pub tool_path: Option<PathBuf>,
    pub probe_timeout: Duration,
    pub seed: u64,
    /// Whether the seed was chosen at random for this run.
    pub seed_generated: bool,
    pub concurrency: usize,
    pub pause: PauseRange,
    pub regions_dir: PathBuf,
    pub phases: Vec<String>,
    pub validation_mode: ValidationMode,
    pub missing_tool: MissingToolPolicy,
    pub report_path: PathBuf,
    pub log_file: Option<PathBuf>,
    pub progress: bool,
}

impl RehearseConfig {
    /// Resolve using the default config file location.
    pub fn resolve(overrides: &Overrides) -> Result<Self> {
        let file = load_config_from(&config_path())?;
        Self::resolve_with(overrides, file.unwrap_or_default())
    }

    /// Resolve using the chain: CLI flag > env var > config file > default.
    ///
    /// - Tool: `--tool` > `REHEARSE_TOOL` > `tool.name` > `driftmgr`
    /// - Tool path: `--tool-path` > `REHEARSE_TOOL_PATH` > `tool.path` > PATH lookup
    /// - Regions dir: `--regions-dir` > `REHEARSE_REGIONS_DIR` > `session.regions_dir` > `.`
    /// - Report path: `--report` > `REHEARSE_REPORT_PATH` > `output.report_path`
    pub fn resolve_with(overrides: &Overrides, file: ConfigFile) -> Result<Self> {
        let tool_name = overrides
            .tool
            .clone()
            .or_else(|| env_nonempty(ENV_TOOL))
            .unwrap_or(file.tool.name);
        if tool_name.trim().is_empty() {
            bail!("tool name must not be empty");
        }

        let tool_path = overrides
            .tool_path
            .clone()
            .or_else(|| env_nonempty(ENV_TOOL_PATH).map(PathBuf::from))
            .or(file.tool.path);

        let regions_dir = overrides
            .regions_dir
            .clone()
            .or_else(|| env_nonempty(ENV_REGIONS_DIR).map(PathBuf::from))
            .or(file.session.regions_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        let report_path = overrides
            .report_path
            .clone()
            .or_else(|| env_nonempty(ENV_REPORT_PATH).map(PathBuf::from))
            .unwrap_or(file.output.report_path);

        let concurrency = overrides.concurrency.unwrap_or(file.session.concurrency);
        if concurrency == 0 {
            bail!("concurrency must be at least 1");
        }

        let (pause_min, pause_max) = (file.session.pause_min_ms, file.session.pause_max_ms);
        if pause_min > pause_max {
            bail!("session.pause_min_ms ({pause_min}) exceeds session.pause_max_ms ({pause_max})");
        }

        let (seed, seed_generated) = match overrides.seed.or(file.session.seed) {
            Some(seed) => (seed, false),
            None => {
                use rand::Rng;
                (rand::rng().random(), true)
            }
        };

        let phases = if overrides.phases.is_empty() {
            file.session.phases
        } else {
            overrides.phases.clone()
        };

        Ok(Self {
            tool_name,
            tool_path,
            probe_timeout: Duration::from_secs(file.tool.probe_timeout_secs),
            seed,
            seed_generated,
            concurrency,
            pause: PauseRange::new(
                Duration::from_millis(pause_min),
                Duration::from_millis(pause_max),
            ),
            regions_dir,
            phases,
            validation_mode: overrides.validation_mode.unwrap_or(file.validation.mode),
            missing_tool: overrides.missing_tool.unwrap_or(file.validation.missing_tool),
            report_path,
            log_file: overrides.log_file.clone().or(file.output.log_file),
            progress: file.output.progress && !overrides.no_progress,
        })
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
