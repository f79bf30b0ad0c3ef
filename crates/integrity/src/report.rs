//! Run report model and the reporter seam.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::outcome::{Outcome, Status};
use crate::tally::{RunTally, Verdict};

/// Outcomes of one section, in execution order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionReport {
    pub title: String,
    pub outcomes: Vec<Outcome>,
}

/// The complete result of one integrity run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub sections: Vec<SectionReport>,
    pub tally: RunTally,
    pub verdict: Verdict,
}

impl RunReport {
    /// All outcomes across sections with the given status.
    pub fn outcomes_with(&self, status: Status) -> impl Iterator<Item = &Outcome> {
        self.sections
            .iter()
            .flat_map(|s| s.outcomes.iter())
            .filter(move |o| o.status == status)
    }

    /// Render the report as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize run report")
    }
}

/// Receives progress as the orchestrator runs.
///
/// Calls arrive in section order even when sections execute concurrently.
pub trait Reporter {
    fn run_started(&mut self, _started_at: DateTime<Utc>) {}

    fn section(&mut self, title: &str);

    fn check(&mut self, name: &str);

    fn outcome(&mut self, outcome: &Outcome);

    fn summary(&mut self, report: &RunReport);
}

/// Reporter that discards everything, used with `--json`.
#[derive(Debug, Default)]
pub struct QuietReporter;

impl Reporter for QuietReporter {
    fn section(&mut self, _title: &str) {}

    fn check(&mut self, _name: &str) {}

    fn outcome(&mut self, _outcome: &Outcome) {}

    fn summary(&mut self, _report: &RunReport) {}
}
