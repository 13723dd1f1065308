//! Simulation phases: the ordered feature areas a session walks through.
//!
//! Most phases are fixed argument tables (see `tables`). Resource discovery
//! is planned per provider from the [`RegionCatalog`], sampling one to
//! three regions with the caller's RNG so a seeded run is reproducible.

mod tables;

use std::time::Duration;

use rand::Rng;
use rand::seq::IndexedRandom;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::command::{Category, CommandSpec};
use crate::regions::{Provider, RegionCatalog};

/// Most regions sampled per provider during discovery.
const MAX_SAMPLED_REGIONS: usize = 3;

/// Static description of one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseInfo {
    /// Stable identifier used in config, reports and `--phase` filters.
    pub key: &'static str,
    pub name: &'static str,
    pub category: Category,
    /// Timeout budget applied to every command of the phase.
    pub timeout: Duration,
    table: Option<&'static [&'static [&'static str]]>,
}

impl PhaseInfo {
    const fn fixed(
        key: &'static str,
        name: &'static str,
        category: Category,
        timeout_secs: u64,
        table: &'static [&'static [&'static str]],
    ) -> Self {
        Self {
            key,
            name,
            category,
            timeout: Duration::from_secs(timeout_secs),
            table: Some(table),
        }
    }

    /// Number of commands, or `None` when it depends on the region catalog.
    pub fn fixed_len(&self) -> Option<usize> {
        self.table.map(<[_]>::len)
    }
}

/// Every phase, in session order.
pub static PHASES: [PhaseInfo; 11] = [
    PhaseInfo::fixed(
        "credential_auto_detection",
        "Credential Auto-Detection",
        Category::Credentials,
        60,
        tables::CREDENTIALS,
    ),
    PhaseInfo::fixed(
        "state_file_detection",
        "State File Detection",
        Category::State,
        90,
        tables::STATE,
    ),
    PhaseInfo {
        key: "resource_discovery",
        name: "Resource Discovery",
        category: Category::Discovery,
        timeout: Duration::from_secs(120),
        table: None,
    },
    PhaseInfo::fixed(
        "drift_analysis",
        "Drift Analysis",
        Category::Analysis,
        90,
        tables::ANALYSIS,
    ),
    PhaseInfo::fixed(
        "monitoring",
        "Monitoring & Dashboard",
        Category::Monitoring,
        60,
        tables::MONITORING,
    ),
    PhaseInfo::fixed(
        "remediation",
        "Remediation",
        Category::Remediation,
        120,
        tables::REMEDIATION,
    ),
    PhaseInfo::fixed(
        "configuration",
        "Configuration",
        Category::Configuration,
        60,
        tables::CONFIGURATION,
    ),
    PhaseInfo::fixed(
        "reporting",
        "Reporting",
        Category::Reporting,
        60,
        tables::REPORTING,
    ),
    PhaseInfo::fixed(
        "advanced",
        "Advanced Features",
        Category::Advanced,
        60,
        tables::ADVANCED,
    ),
    PhaseInfo::fixed(
        "error_handling",
        "Error Handling",
        Category::ErrorHandling,
        60,
        tables::ERROR_HANDLING,
    ),
    PhaseInfo::fixed(
        "interactive_mode",
        "Interactive Mode",
        Category::Interactive,
        60,
        tables::INTERACTIVE,
    ),
];

/// Look up a phase by key.
pub fn phase_info(key: &str) -> Option<&'static PhaseInfo> {
    PHASES.iter().find(|p| p.key == key)
}

/// A planned phase: its identity plus the concrete commands to issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phase {
    pub key: String,
    pub name: String,
    pub category: Category,
    pub commands: Vec<CommandSpec>,
}

impl Phase {
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        category: Category,
        commands: Vec<CommandSpec>,
    ) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            category,
            commands,
        }
    }
}

/// Total command count across `phases`.
pub fn total_commands(phases: &[Phase]) -> usize {
    phases.iter().map(|p| p.commands.len()).sum()
}

/// Plan every phase for `tool`.
pub fn build_phases<R: Rng>(catalog: &RegionCatalog, tool: &str, rng: &mut R) -> Vec<Phase> {
    PHASES
        .iter()
        .map(|info| {
            let commands = match info.table {
                Some(table) => table
                    .iter()
                    .map(|args| {
                        CommandSpec::new(tool, args.iter().copied(), info.category, info.timeout)
                    })
                    .collect(),
                None => discovery_commands(catalog, tool, info, rng),
            };
            Phase::new(info.key, info.name, info.category, commands)
        })
        .collect()
}

fn discovery_commands<R: Rng>(
    catalog: &RegionCatalog,
    tool: &str,
    info: &PhaseInfo,
    rng: &mut R,
) -> Vec<CommandSpec> {
    let mut commands = Vec::new();
    for provider in Provider::ALL {
        let regions = catalog.regions(provider);
        if regions.is_empty() {
            continue;
        }
        let count = rng.random_range(1..=regions.len().min(MAX_SAMPLED_REGIONS));
        let selected: Vec<&str> = regions
            .choose_multiple(rng, count)
            .map(String::as_str)
            .collect();
        tracing::info!(provider = %provider, regions = ?selected, "sampled discovery regions");

        let p = provider.as_str();
        let first = selected[0];
        let patterns: [Vec<&str>; 4] = [
            vec!["discover", p, first],
            std::iter::once("discover").chain(selected.iter().copied()).collect(),
            vec!["discover", "--provider", p, "--region", first],
            vec!["discover", p, "--all-regions"],
        ];
        commands.extend(
            patterns
                .into_iter()
                .map(|args| CommandSpec::new(tool, args, info.category, info.timeout)),
        );
    }
    commands
}

/// A `--phase` filter named a phase that does not exist.
#[derive(Debug, Error)]
#[error("unknown phase {key:?} (expected one of: {})", known_keys())]
pub struct UnknownPhase {
    pub key: String,
}

fn known_keys() -> String {
    PHASES.iter().map(|p| p.key).collect::<Vec<_>>().join(", ")
}

/// Keep only the phases named in `keys`, preserving session order. An empty
/// filter keeps everything.
pub fn filter_phases(phases: Vec<Phase>, keys: &[String]) -> Result<Vec<Phase>, UnknownPhase> {
    if let Some(bad) = keys.iter().find(|k| phase_info(k).is_none()) {
        return Err(UnknownPhase { key: bad.clone() });
    }
    if keys.is_empty() {
        return Ok(phases);
    }
    Ok(phases
        .into_iter()
        .filter(|p| keys.iter().any(|k| *k == p.key))
        .collect())
}

/// SHA-256 (hex) over the ordered phase keys and argument vectors.
///
/// Two sessions with the same digest issued the same commands in the same
/// order, so their reports can be diffed record by record.
pub fn plan_digest(phases: &[Phase]) -> String {
    let mut hasher = Sha256::new();
    for phase in phases {
        hasher.update(phase.key.as_bytes());
        hasher.update(b"\n");
        for command in &phase.commands {
            for token in command.argv() {
                hasher.update(token.as_bytes());
                hasher.update(b"\0");
            }
            hasher.update(b"\n");
        }
    }
    hex::encode(hasher.finalize())
}
