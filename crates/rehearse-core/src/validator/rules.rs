//! Per-category expected-behavior rules.
//!
//! A [`RuleTable`] maps each [`Category`] to a [`Rule`]: a human-readable
//! statement of what the command should do, plus an [`Expectation`]
//! predicate over the captured [`ExecutionResult`]. Swapping the table
//! changes how outcomes are judged without touching the orchestrator.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::command::Category;
use crate::runner::ExecutionResult;

use super::VerdictBasis;

// ---------------------------------------------------------------------------
// Expectation
// ---------------------------------------------------------------------------

/// A predicate deciding whether an execution result is acceptable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expectation {
    /// Exit code must be 0.
    ExitZero,
    /// Exit code 0, or stdout mentions at least one keyword
    /// (case-insensitive). Covers commands that print help or usage
    /// instead of succeeding.
    ExitZeroOrKeyword(Vec<String>),
    /// The command must fail visibly: non-zero exit, and either something
    /// on stderr or "error" on stdout.
    ErrorSurfaced,
    /// Exit code 0 and stdout is a JSON object carrying the named key.
    JsonField(String),
}

/// The outcome of checking one [`Expectation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assessment {
    pub passed: bool,
    pub basis: VerdictBasis,
    pub evidence: Vec<String>,
}

impl Expectation {
    /// Keyword expectation from string literals; keywords are lowercased.
    pub fn keywords(words: &[&str]) -> Self {
        Self::ExitZeroOrKeyword(words.iter().map(|w| w.to_lowercase()).collect())
    }

    /// Check `result` against this expectation.
    pub fn assess(&self, result: &ExecutionResult) -> Assessment {
        let exit_evidence = format!("exit code {}", result.exit_code);

        match self {
            Self::ExitZero => {
                if result.exit_code == 0 {
                    pass(VerdictBasis::ExitCode, vec![exit_evidence])
                } else {
                    fail(vec![exit_evidence, "expected exit code 0".to_owned()])
                }
            }
            Self::ExitZeroOrKeyword(keywords) => {
                if result.exit_code == 0 {
                    return pass(VerdictBasis::ExitCode, vec![exit_evidence]);
                }
                let stdout = result.stdout.to_lowercase();
                match keywords.iter().find(|k| stdout.contains(k.as_str())) {
                    Some(keyword) => pass(
                        VerdictBasis::Keyword,
                        vec![exit_evidence, format!("stdout mentions {keyword:?}")],
                    ),
                    None => fail(vec![
                        exit_evidence,
                        format!(
                            "stdout has none of the expected keywords: {}",
                            keywords.join(", ")
                        ),
                    ]),
                }
            }
            Self::ErrorSurfaced => {
                if result.exit_code == 0 {
                    return fail(vec![
                        exit_evidence,
                        "expected a non-zero exit code".to_owned(),
                    ]);
                }
                if !result.stderr.is_empty() {
                    pass(
                        VerdictBasis::ErrorSurfaced,
                        vec![exit_evidence, "error reported on stderr".to_owned()],
                    )
                } else if result.stdout.to_lowercase().contains("error") {
                    pass(
                        VerdictBasis::ErrorSurfaced,
                        vec![exit_evidence, "error reported on stdout".to_owned()],
                    )
                } else {
                    fail(vec![
                        exit_evidence,
                        "command failed silently: empty stderr and no error on stdout".to_owned(),
                    ])
                }
            }
            Self::JsonField(key) => {
                if result.exit_code != 0 {
                    return fail(vec![exit_evidence, "expected exit code 0".to_owned()]);
                }
                match serde_json::from_str::<serde_json::Value>(&result.stdout) {
                    Ok(serde_json::Value::Object(map)) if map.contains_key(key) => pass(
                        VerdictBasis::ExitCode,
                        vec![exit_evidence, format!("stdout JSON has field {key:?}")],
                    ),
                    Ok(_) => fail(vec![
                        exit_evidence,
                        format!("stdout JSON lacks field {key:?}"),
                    ]),
                    Err(e) => fail(vec![exit_evidence, format!("stdout is not JSON: {e}")]),
                }
            }
        }
    }
}

fn pass(basis: VerdictBasis, evidence: Vec<String>) -> Assessment {
    Assessment {
        passed: true,
        basis,
        evidence,
    }
}

fn fail(evidence: Vec<String>) -> Assessment {
    Assessment {
        passed: false,
        basis: VerdictBasis::Unmet,
        evidence,
    }
}

// ---------------------------------------------------------------------------
// Rule / RuleTable
// ---------------------------------------------------------------------------

/// Expected behavior for one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Human-readable statement recorded with every verdict.
    pub expected_behavior: String,
    pub expectation: Expectation,
}

impl Rule {
    pub fn new(expected_behavior: impl Into<String>, expectation: Expectation) -> Self {
        Self {
            expected_behavior: expected_behavior.into(),
            expectation,
        }
    }
}

/// How strictly command outcomes are judged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    /// Exit code 0 or a category keyword in stdout.
    #[default]
    Heuristic,
    /// Exit code only.
    Strict,
}

impl fmt::Display for ValidationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Heuristic => "heuristic",
            Self::Strict => "strict",
        })
    }
}

impl FromStr for ValidationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "heuristic" => Ok(Self::Heuristic),
            "strict" => Ok(Self::Strict),
            other => Err(format!(
                "invalid validation mode {other:?} (expected heuristic or strict)"
            )),
        }
    }
}

/// Category-to-rule dispatch table.
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: BTreeMap<Category, Rule>,
    fallback: Rule,
}

impl RuleTable {
    /// The default table: exit code 0 or a category keyword in stdout.
    pub fn heuristic() -> Self {
        let mut rules: BTreeMap<Category, Rule> = BTreeMap::new();
        let mut add = |category: Category, expected: &str, keywords: &[&str]| {
            rules.insert(category, Rule::new(expected, Expectation::keywords(keywords)));
        };
        add(
            Category::Credentials,
            "Should detect or list credentials",
            &["credentials found", "help"],
        );
        add(
            Category::State,
            "Should handle state file operations",
            &["help", "usage"],
        );
        add(
            Category::Discovery,
            "Should attempt resource discovery",
            &["discovering", "found"],
        );
        add(
            Category::Analysis,
            "Should perform drift analysis",
            &["analyzing", "drift"],
        );
        add(
            Category::Monitoring,
            "Should handle monitoring operations",
            &["monitoring", "dashboard"],
        );
        add(
            Category::Remediation,
            "Should handle remediation operations",
            &["remediating", "dry-run"],
        );
        add(
            Category::Configuration,
            "Should handle configuration operations",
            &["config", "setup"],
        );
        add(
            Category::Reporting,
            "Should handle reporting operations",
            &["report", "export"],
        );
        add(
            Category::Advanced,
            "Should handle advanced features",
            &["plugin", "api"],
        );
        rules.insert(
            Category::ErrorHandling,
            Rule::new("Should handle errors gracefully", Expectation::ErrorSurfaced),
        );

        Self {
            rules,
            fallback: Rule::new("Should execute command successfully", Expectation::ExitZero),
        }
    }

    /// Exit code only; error-handling commands must still fail visibly.
    pub fn strict() -> Self {
        let heuristic = Self::heuristic();
        let rules = heuristic
            .rules
            .into_iter()
            .map(|(category, rule)| {
                let expectation = match rule.expectation {
                    Expectation::ErrorSurfaced => Expectation::ErrorSurfaced,
                    _ => Expectation::ExitZero,
                };
                (category, Rule::new(rule.expected_behavior, expectation))
            })
            .collect();
        Self {
            rules,
            fallback: heuristic.fallback,
        }
    }

    pub fn for_mode(mode: ValidationMode) -> Self {
        match mode {
            ValidationMode::Heuristic => Self::heuristic(),
            ValidationMode::Strict => Self::strict(),
        }
    }

    /// Replace the rule for `category`.
    pub fn with_rule(mut self, category: Category, rule: Rule) -> Self {
        self.rules.insert(category, rule);
        self
    }

    /// The rule applied to `category`; categories without an entry use the
    /// exit-code-only fallback.
    pub fn rule(&self, category: Category) -> &Rule {
        self.rules.get(&category).unwrap_or(&self.fallback)
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::heuristic()
    }
}
