//! Hierarchical pass/fail counters.
//!
//! [`SessionStats`] keeps a session-level tally and one
//! [`FeatureStatistics`] entry per key under a single mutex, so
//! `total == passed + failed` holds at both levels for every observer and
//! the per-key totals always sum to the session total.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

/// Percentage of `passed` over `total`; 0 when `total` is 0.
pub fn success_rate(passed: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        passed as f64 / total as f64 * 100.0
    }
}

/// Counters for one category or feature.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureStatistics {
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
    /// `passed / total * 100`, refreshed on every update.
    pub success_rate: f64,
}

impl FeatureStatistics {
    fn record(&mut self, passed: bool) {
        self.total += 1;
        if passed {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
        self.success_rate = success_rate(self.passed, self.total);
    }
}

/// A consistent copy of the counters at one instant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
    pub features: BTreeMap<String, FeatureStatistics>,
}

impl StatsSnapshot {
    pub fn success_rate(&self) -> f64 {
        success_rate(self.passed, self.total)
    }

    /// Check the hierarchical invariants. Returns the first violation.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.total != self.passed + self.failed {
            return Err(format!(
                "session total {} != passed {} + failed {}",
                self.total, self.passed, self.failed
            ));
        }
        for (key, feature) in &self.features {
            if feature.total != feature.passed + feature.failed {
                return Err(format!(
                    "{key}: total {} != passed {} + failed {}",
                    feature.total, feature.passed, feature.failed
                ));
            }
        }
        let sum: u64 = self.features.values().map(|f| f.total).sum();
        if sum != self.total {
            return Err(format!(
                "per-feature totals sum to {sum}, session total is {}",
                self.total
            ));
        }
        Ok(())
    }
}

/// Thread-safe session statistics.
#[derive(Debug, Default)]
pub struct SessionStats {
    inner: Mutex<StatsSnapshot>,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one verdict for `key` and return that key's updated entry.
    pub fn record(&self, key: &str, passed: bool) -> FeatureStatistics {
        let mut inner = self.lock();
        inner.total += 1;
        if passed {
            inner.passed += 1;
        } else {
            inner.failed += 1;
        }
        let entry = inner.features.entry(key.to_owned()).or_default();
        entry.record(passed);
        entry.clone()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, StatsSnapshot> {
        // Counters are updated in one step under the lock, so they are
        // consistent even if a holder panicked.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
