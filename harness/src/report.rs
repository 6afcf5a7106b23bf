//! Plain-text reporting and exit-code mapping.
//!
//! Formatting is pure; printing happens once per suite run. The process exit
//! code equals the failure count so the harness composes with automation
//! that only checks exit status.

use crate::exit_codes;
use crate::scenario::{ScenarioResult, ScenarioStatus, SuiteRun};

/// Passed/failed/skipped tallies for a result sequence.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Counts {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

pub fn counts(results: &[ScenarioResult]) -> Counts {
    let mut counts = Counts::default();
    for result in results {
        match result.status {
            ScenarioStatus::Passed => counts.passed += 1,
            ScenarioStatus::Failed => counts.failed += 1,
            ScenarioStatus::Skipped => counts.skipped += 1,
        }
    }
    counts
}

pub fn format_result(result: &ScenarioResult) -> String {
    match result.status {
        ScenarioStatus::Passed => format!("pass {}", result.name),
        ScenarioStatus::Failed => format!("fail {}: {}", result.name, result.message),
        ScenarioStatus::Skipped => format!("skip {}: {}", result.name, result.message),
    }
}

/// Print the itemized report and aggregate line for one suite.
///
/// Printed even on fatal paths, up to the point of failure; the fatal cause
/// goes to stderr.
pub fn print_report(run: &SuiteRun) {
    println!("suite: {}", run.suite);
    for result in &run.results {
        println!("{}", format_result(result));
    }
    let counts = counts(&run.results);
    println!(
        "suite: {} passed={} failed={} skipped={} total={}",
        run.suite,
        counts.passed,
        counts.failed,
        counts.skipped,
        run.results.len()
    );
    if let Some(fatal) = &run.fatal {
        eprintln!("fatal: {fatal:#}");
    }
}

/// Exit code across suite runs: the fatal code if any run was cut short,
/// otherwise the total failure count.
pub fn exit_code(runs: &[SuiteRun]) -> i32 {
    if runs.iter().any(|run| run.fatal.is_some()) {
        return exit_codes::FATAL;
    }
    let failed: usize = runs.iter().map(|run| counts(&run.results).failed).sum();
    i32::try_from(failed).unwrap_or(i32::MAX)
}
