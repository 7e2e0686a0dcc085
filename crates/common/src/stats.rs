//! Run statistics accumulator

use serde::{Deserialize, Serialize};

/// Aggregate outcome counters returned from a run.
///
/// `tests` counts resolved test nodes. A failure in a before-each hook
/// increments `failures` without incrementing `tests`, so the hook tally is
/// kept alongside to make the counters reconcilable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub tests: usize,
    pub passes: usize,
    pub failures: usize,
    pub pending: usize,
    #[serde(skip)]
    hook_failures: usize,
}

impl RunStats {
    pub fn record_pass(&mut self) {
        self.tests += 1;
        self.passes += 1;
    }

    pub fn record_failure(&mut self) {
        self.tests += 1;
        self.failures += 1;
    }

    pub fn record_pending(&mut self) {
        self.tests += 1;
        self.pending += 1;
    }

    /// A hook failed around a test: one more failure, no test resolved.
    pub fn record_hook_failure(&mut self) {
        self.failures += 1;
        self.hook_failures += 1;
    }

    pub fn hook_failures(&self) -> usize {
        self.hook_failures
    }

    /// Every failure must be accounted to either a resolved test or a hook.
    pub fn is_reconciled(&self) -> bool {
        self.failures >= self.hook_failures
            && self.tests == self.passes + (self.failures - self.hook_failures) + self.pending
    }
}
