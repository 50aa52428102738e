//! Configuration for the rule engine.

use serde::{Deserialize, Serialize};

/// Configuration for pending-rule execution.
///
/// Controls the drain ceilings and how rule failures affect a commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of batches one drain may process.
    pub max_drain_rounds: u32,

    /// Maximum number of pending entries one drain may process.
    pub max_executions: u32,

    /// Stop the drain at the first failed entry.
    pub fail_fast: bool,

    /// Commit the unit of work even if some pending entries failed.
    pub commit_on_rule_failure: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_drain_rounds: 64,
            max_executions: 10_000,
            fail_fast: false,
            commit_on_rule_failure: false,
        }
    }
}

impl EngineConfig {
    /// Creates a configuration that aborts on the first failure.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            fail_fast: true,
            ..Self::default()
        }
    }

    /// Creates a configuration that commits despite rule failures.
    #[must_use]
    pub fn lenient() -> Self {
        Self {
            commit_on_rule_failure: true,
            ..Self::default()
        }
    }

    /// Builder method to set the drain round ceiling.
    #[must_use]
    pub fn with_max_drain_rounds(mut self, rounds: u32) -> Self {
        self.max_drain_rounds = rounds;
        self
    }

    /// Builder method to set the execution ceiling.
    #[must_use]
    pub fn with_max_executions(mut self, executions: u32) -> Self {
        self.max_executions = executions;
        self
    }

    /// Builder method to enable/disable fail-fast draining.
    #[must_use]
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Builder method to enable/disable committing despite rule failures.
    #[must_use]
    pub fn with_commit_on_rule_failure(mut self, commit: bool) -> Self {
        self.commit_on_rule_failure = commit;
        self
    }
}
