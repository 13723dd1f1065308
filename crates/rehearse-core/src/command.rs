//! Planned invocations of the external tool.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// The feature area a command exercises. Drives which expected-behavior
/// rule the validator applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Credentials,
    State,
    Discovery,
    Analysis,
    Monitoring,
    Remediation,
    Configuration,
    Reporting,
    Advanced,
    ErrorHandling,
    Interactive,
    Unknown,
}

impl Category {
    /// Every category, in declaration order.
    pub const ALL: [Category; 12] = [
        Self::Credentials,
        Self::State,
        Self::Discovery,
        Self::Analysis,
        Self::Monitoring,
        Self::Remediation,
        Self::Configuration,
        Self::Reporting,
        Self::Advanced,
        Self::ErrorHandling,
        Self::Interactive,
        Self::Unknown,
    ];

    /// The stable name used as a statistics key and in reports.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Credentials => "credentials",
            Self::State => "state",
            Self::Discovery => "discovery",
            Self::Analysis => "analysis",
            Self::Monitoring => "monitoring",
            Self::Remediation => "remediation",
            Self::Configuration => "configuration",
            Self::Reporting => "reporting",
            Self::Advanced => "advanced",
            Self::ErrorHandling => "error-handling",
            Self::Interactive => "interactive",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = CategoryParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| CategoryParseError(s.to_owned()))
    }
}

/// Error returned when parsing an invalid [`Category`] string.
#[derive(Debug, Clone)]
pub struct CategoryParseError(pub String);

impl fmt::Display for CategoryParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid command category: {:?}", self.0)
    }
}

impl std::error::Error for CategoryParseError {}

// ---------------------------------------------------------------------------
// CommandSpec
// ---------------------------------------------------------------------------

/// One planned invocation of the external tool.
///
/// Immutable once built: fields are private and only exposed through
/// accessors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    argv: Vec<String>,
    category: Category,
    timeout: Duration,
}

impl CommandSpec {
    /// Build a spec from a program name, its arguments, a category and a
    /// timeout budget.
    pub fn new<I, S>(
        program: impl Into<String>,
        args: I,
        category: Category,
        timeout: Duration,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut argv = vec![program.into()];
        argv.extend(args.into_iter().map(Into::into));
        Self {
            argv,
            category,
            timeout,
        }
    }

    /// The program token (first element of the argument vector).
    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    /// Arguments after the program token.
    pub fn args(&self) -> &[String] {
        &self.argv[1..]
    }

    /// The full argument vector, program included.
    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Space-joined command line, for logs and reports.
    pub fn display(&self) -> String {
        self.argv.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_roundtrips_through_str() {
        for category in Category::ALL {
            let parsed: Category = category.as_str().parse().unwrap();
            assert_eq!(parsed, category);
        }
    }

    #[test]
    fn category_parse_rejects_unknown_name() {
        let err = "telemetry".parse::<Category>().unwrap_err();
        assert!(err.to_string().contains("telemetry"));
    }

    #[test]
    fn category_serializes_kebab_case() {
        let json = serde_json::to_string(&Category::ErrorHandling).unwrap();
        assert_eq!(json, "\"error-handling\"");
    }

    #[test]
    fn spec_splits_program_and_args() {
        let spec = CommandSpec::new(
            "driftmgr",
            ["discover", "aws", "us-east-1"],
            Category::Discovery,
            Duration::from_secs(120),
        );
        assert_eq!(spec.program(), "driftmgr");
        assert_eq!(spec.args(), ["discover", "aws", "us-east-1"]);
        assert_eq!(spec.argv().len(), 4);
        assert_eq!(spec.display(), "driftmgr discover aws us-east-1");
        assert_eq!(spec.timeout(), Duration::from_secs(120));
    }

    #[test]
    fn spec_without_args() {
        let spec = CommandSpec::new(
            "driftmgr",
            Vec::<String>::new(),
            Category::Unknown,
            Duration::from_secs(1),
        );
        assert!(spec.args().is_empty());
        assert_eq!(spec.display(), "driftmgr");
    }
}
