//! Outcome aggregation and the run-level verdict.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::outcome::{Outcome, Status};

/// Warnings tolerated before a run with no failures stops being healthy.
const HEALTHY_MAX_WARNINGS: usize = 5;

/// Failures at which a run becomes critical.
const CRITICAL_MIN_FAILURES: usize = 3;

/// Running totals for one integrity run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunTally {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub warned: usize,
}

impl RunTally {
    /// Integer success percentage, or `None` when nothing was counted.
    #[must_use]
    pub fn success_rate(&self) -> Option<usize> {
        (self.total > 0).then(|| (self.passed * 100) / self.total)
    }
}

/// Final run-level severity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Healthy,
    Degraded,
    Critical,
}

impl Verdict {
    /// Derive the verdict from failure and warning counts.
    ///
    /// The thresholds are consumed by automation through the exit code and
    /// must not drift.
    #[must_use]
    pub fn from_counts(failed: usize, warned: usize) -> Self {
        if failed == 0 && warned < HEALTHY_MAX_WARNINGS {
            Self::Healthy
        } else if failed < CRITICAL_MIN_FAILURES {
            Self::Degraded
        } else {
            Self::Critical
        }
    }

    /// Process exit code for this verdict.
    #[must_use]
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Healthy => 0,
            Self::Degraded => 1,
            Self::Critical => 2,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "HEALTHY"),
            Self::Degraded => write!(f, "DEGRADED"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Accumulates outcomes into a [`RunTally`].
#[derive(Debug, Default)]
pub struct Aggregator {
    tally: RunTally,
}

impl Aggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one outcome. Info outcomes leave the tally untouched.
    pub fn record(&mut self, outcome: &Outcome) {
        let counter = match outcome.status {
            Status::Pass => &mut self.tally.passed,
            Status::Fail => &mut self.tally.failed,
            Status::Warn => &mut self.tally.warned,
            Status::Info => return,
        };
        *counter += 1;
        self.tally.total += 1;
    }

    #[must_use]
    pub fn tally(&self) -> RunTally {
        self.tally
    }

    /// Close the run and compute its verdict.
    #[must_use]
    pub fn finalize(self) -> (RunTally, Verdict) {
        let verdict = Verdict::from_counts(self.tally.failed, self.tally.warned);
        (self.tally, verdict)
    }
}
