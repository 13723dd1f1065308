//! Fixed argument tables for the phases whose commands do not depend on
//! the region catalog. Each entry omits the program token.

pub(super) const CREDENTIALS: &[&[&str]] = &[
    &["credentials", "auto-detect"],
    &["credentials", "list"],
    &["credentials", "help"],
];

pub(super) const STATE: &[&[&str]] = &[
    &["state", "discover"],
    &["state", "discover", "--recursive"],
    &["state", "discover", "--pattern", "*.tfstate"],
    &["state", "discover", "--pattern", "*.tfstate.backup"],
    &["state", "discover", "--directory", "."],
    &["state", "discover", "--directory", "./terraform"],
    &["state", "discover", "--directory", "./states"],
    &["state", "analyze"],
    &["state", "analyze", "--format", "json"],
    &["state", "analyze", "--format", "table"],
    &["state", "analyze", "--output", "state_analysis.json"],
    &["state", "analyze", "--validate"],
    &["state", "analyze", "--check-consistency"],
    &["state", "validate"],
    &["state", "validate", "--strict"],
    &["state", "validate", "--check-resources"],
    &["state", "validate", "--check-modules"],
    &["state", "validate", "--check-outputs"],
    &["state", "compare"],
    &["state", "compare", "--live"],
    &["state", "compare", "--provider", "aws"],
    &["state", "compare", "--provider", "azure"],
    &["state", "compare", "--region", "us-east-1"],
    &["state", "compare", "--output", "state_comparison.json"],
    &["state", "list"],
    &["state", "info"],
    &["state", "backup"],
    &["state", "restore"],
    &["state", "cleanup"],
    &["state", "migrate"],
    &["state", "import"],
    &["state", "export"],
    &["state", "export", "--format", "json"],
    &["state", "export", "--format", "terraform"],
    &["state", "export", "--format", "cloudformation"],
    &["state", "drift"],
    &["state", "drift", "--detect"],
    &["state", "drift", "--analyze"],
    &["state", "drift", "--report"],
    &["state", "drift", "--severity", "high"],
    &["state", "drift", "--severity", "medium"],
    &["state", "drift", "--severity", "low"],
    &["state", "sync"],
    &["state", "sync", "--force"],
    &["state", "sync", "--dry-run"],
    &["state", "sync", "--provider", "aws"],
    &["state", "sync", "--provider", "azure"],
    &["state", "health"],
    &["state", "health", "--check"],
    &["state", "health", "--report"],
    &["state", "health", "--fix"],
    &["state", "monitor"],
    &["state", "monitor", "--start"],
    &["state", "monitor", "--stop"],
    &["state", "monitor", "--status"],
    &["state", "monitor", "--watch"],
    &["state", "report"],
    &["state", "report", "--format", "json"],
    &["state", "report", "--format", "html"],
    &["state", "report", "--format", "pdf"],
    &["state", "report", "--output", "state_report.json"],
    &["state", "report", "--include-resources"],
    &["state", "report", "--include-drift"],
    &["state", "report", "--include-health"],
    &["state", "history"],
    &["state", "history", "--days", "7"],
    &["state", "history", "--days", "30"],
    &["state", "audit"],
    &["state", "audit", "--compliance"],
    &["state", "audit", "--security"],
    &["state", "debug"],
    &["state", "debug", "--verbose"],
    &["state", "debug", "--show-details"],
    &["state", "troubleshoot"],
    &["state", "troubleshoot", "--fix"],
    &["state", "config"],
    &["state", "config", "--show"],
    &["state", "config", "--set"],
    &["state", "config", "--reset"],
    &["state", "help"],
    &["state", "help", "discover"],
    &["state", "help", "analyze"],
    &["state", "help", "validate"],
    &["state", "help", "compare"],
    &["state", "help", "drift"],
    &["state", "help", "sync"],
    &["state", "help", "health"],
    &["state", "help", "monitor"],
    &["state", "help", "report"],
    &["state", "help", "history"],
    &["state", "help", "audit"],
    &["state", "help", "debug"],
    &["state", "help", "troubleshoot"],
    &["state", "help", "config"],
];

pub(super) const ANALYSIS: &[&[&str]] = &[
    &["analyze", "--provider", "aws"],
    &["analyze", "--provider", "azure"],
    &["analyze", "--all-providers"],
    &["analyze", "--format", "json"],
    &["analyze", "--format", "table"],
    &["analyze", "--output", "drift_report.json"],
    &["analyze", "--severity", "high"],
    &["analyze", "--severity", "medium"],
    &["analyze", "--severity", "low"],
];

pub(super) const MONITORING: &[&[&str]] = &[
    &["monitor", "--start"],
    &["monitor", "--status"],
    &["monitor", "--stop"],
    &["dashboard", "--start"],
    &["dashboard", "--port", "8080"],
    &["dashboard", "--host", "localhost"],
    &["status"],
    &["health"],
];

pub(super) const REMEDIATION: &[&[&str]] = &[
    &["remediate", "--dry-run"],
    &["remediate", "--auto"],
    &["remediate", "--interactive"],
    &["remediate", "--provider", "aws"],
    &["remediate", "--provider", "azure"],
    &["generate", "--terraform"],
    &["generate", "--cloudformation"],
    &["apply", "--plan"],
];

pub(super) const CONFIGURATION: &[&[&str]] = &[
    &["config", "--show"],
    &["config", "--init"],
    &["config", "--validate"],
    &["config", "--backup"],
    &["config", "--restore"],
    &["setup", "--interactive"],
    &["setup", "--auto"],
    &["validate", "--config"],
];

pub(super) const REPORTING: &[&[&str]] = &[
    &["report", "--format", "json"],
    &["report", "--format", "csv"],
    &["report", "--format", "html"],
    &["report", "--format", "pdf"],
    &["export", "--type", "resources"],
    &["export", "--type", "drift"],
    &["export", "--type", "remediation"],
    &["history", "--days", "7"],
    &["history", "--days", "30"],
    &["audit", "--compliance"],
];

pub(super) const ADVANCED: &[&[&str]] = &[
    &["plugin", "--list"],
    &["plugin", "--install"],
    &["plugin", "--update"],
    &["api", "--start"],
    &["api", "--stop"],
    &["api", "--status"],
    &["webhook", "--test"],
    &["webhook", "--list"],
    &["schedule", "--list"],
    &["schedule", "--create"],
    &["backup", "--create"],
    &["backup", "--restore"],
    &["migrate", "--state"],
    &["sync", "--force"],
];

pub(super) const ERROR_HANDLING: &[&[&str]] = &[
    &["discover", "invalid-provider"],
    &["discover", "aws", "invalid-region"],
    &["analyze", "--invalid-flag"],
    &["remediate", "--invalid-option"],
    &["config", "--invalid-path"],
    &["invalid-command"],
    &["discover", "aws", "--invalid-flag"],
    &["analyze", "--provider", "invalid"],
    &["monitor", "--invalid-port"],
    &["dashboard", "--invalid-host"],
    &["state", "discover", "--invalid-pattern"],
    &["state", "analyze", "--invalid-format"],
    &["state", "validate", "--invalid-option"],
    &["state", "compare", "--invalid-provider"],
    &["state", "drift", "--invalid-severity"],
];

pub(super) const INTERACTIVE: &[&[&str]] = &[
    &["discover", "aws", "us-east-1"],
    &["discover", "azure", "eastus"],
    &["analyze", "--provider", "aws"],
    &["monitor", "--start"],
    &["dashboard", "--port", "8080"],
    &["remediate", "--dry-run"],
    &["report", "--format", "json"],
    &["config", "--show"],
    &["state", "discover"],
    &["state", "analyze"],
    &["state", "validate"],
    &["state", "compare", "--live"],
    &["state", "drift", "--detect"],
    &["state", "sync", "--dry-run"],
    &["state", "health", "--check"],
    &["state", "report", "--format", "json"],
];
