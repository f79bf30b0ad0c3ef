//! Console output for the integrity checker.
//!
//! Provides consistent formatting for section headers, check outcomes and
//! the final summary.

use std::path::PathBuf;

use chrono::{DateTime, Local, Utc};
use colored::Colorize;

use crate::outcome::{Outcome, Status};
use crate::report::{Reporter, RunReport};
use crate::tally::Verdict;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Force colours off (e.g. `--no-color` or a non-terminal consumer).
pub fn disable_color() {
    colored::control::set_override(false);
}

/// Print the run banner.
pub fn print_banner() {
    println!();
    println!(
        "{}",
        "╔══════════════════════════════════════════════════════════╗".magenta()
    );
    println!(
        "{}",
        "║  PROXMOX INTEGRATION SYSTEM INTEGRITY CHECKER            ║".magenta()
    );
    println!(
        "{}",
        "╚══════════════════════════════════════════════════════════╝".magenta()
    );
    println!();
}

/// Print a section header.
pub fn print_section(title: &str) {
    println!();
    println!("{}", "═".repeat(60).blue());
    println!("{}", title.blue().bold());
    println!("{}", "═".repeat(60).blue());
    println!();
}

/// Print the check about to run.
pub fn print_check(name: &str) {
    println!("{} {}", "⏳ Checking:".yellow(), name.yellow());
}

/// Print a success message.
pub fn print_success(message: &str) {
    println!("{} {}", "✓ PASS:".green().bold(), message.green());
}

/// Print a failure message.
pub fn print_error(message: &str) {
    println!("{} {}", "✗ FAIL:".red().bold(), message.red());
}

/// Print a warning message.
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠ WARN:".yellow().bold(), message.yellow());
}

/// Print an info message.
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ INFO:".cyan().bold(), message.cyan());
}

/// Print a detail line under an outcome.
pub fn print_detail(line: &str) {
    println!("    {} {line}", "•".bright_black());
}

/// Print one outcome and its details.
pub fn print_outcome(outcome: &Outcome) {
    match outcome.status {
        Status::Pass => print_success(&outcome.message),
        Status::Fail => print_error(&outcome.message),
        Status::Warn => print_warning(&outcome.message),
        Status::Info => print_info(&outcome.message),
    }
    for line in &outcome.details {
        print_detail(line);
    }
}

/// Print the run summary and overall status.
pub fn print_summary(report: &RunReport) {
    print_section("INTEGRITY CHECK SUMMARY");

    let tally = report.tally;
    println!("{}", format!("Total Checks: {}", tally.total).blue());
    println!("{}", format!("Passed: {}", tally.passed).green());
    println!("{}", format!("Failed: {}", tally.failed).red());
    println!("{}", format!("Warnings: {}", tally.warned).yellow());
    println!();

    if let Some(rate) = tally.success_rate() {
        println!("{}", format!("Success Rate: {rate}%").blue());
        println!();
    }

    match report.verdict {
        Verdict::Healthy => {
            println!("{}", "✓ OVERALL STATUS: HEALTHY".green().bold());
            println!("{}", "Proxmox integration is fully operational!".green());
        }
        Verdict::Degraded => {
            println!("{}", "⚠ OVERALL STATUS: DEGRADED".yellow().bold());
            println!(
                "{}",
                "Proxmox integration has some issues but is functional".yellow()
            );
        }
        Verdict::Critical => {
            println!("{}", "✗ OVERALL STATUS: CRITICAL".red().bold());
            println!("{}", "Proxmox integration has critical issues!".red());
        }
    }

    println!();
    println!(
        "Completed: {}",
        report
            .completed_at
            .with_timezone(&Local)
            .format(TIMESTAMP_FORMAT)
    );
}

/// Coloured terminal reporter.
#[derive(Debug)]
pub struct ConsoleReporter {
    kubeconfig: PathBuf,
}

impl ConsoleReporter {
    #[must_use]
    pub fn new(kubeconfig: PathBuf) -> Self {
        Self { kubeconfig }
    }
}

impl Reporter for ConsoleReporter {
    fn run_started(&mut self, started_at: DateTime<Utc>) {
        print_banner();
        println!(
            "Started: {}",
            started_at.with_timezone(&Local).format(TIMESTAMP_FORMAT)
        );
        println!("Kubeconfig: {}", self.kubeconfig.display());
    }

    fn section(&mut self, title: &str) {
        print_section(title);
    }

    fn check(&mut self, name: &str) {
        print_check(name);
    }

    fn outcome(&mut self, outcome: &Outcome) {
        print_outcome(outcome);
    }

    fn summary(&mut self, report: &RunReport) {
        print_summary(report);
    }
}
