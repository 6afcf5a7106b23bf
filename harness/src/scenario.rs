//! Scenario results, suite execution, and the fatal-error boundary.
//!
//! A scenario is one independently executable check producing a single
//! [`ScenarioResult`]. Scenarios are safe to run in any order and any number
//! of times; the runner executes them in registration order purely for
//! deterministic reporting.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Error, Result};
use reqwest::blocking::Client;
use tracing::{debug, instrument};

use crate::contract;
use crate::paths::ProjectPaths;
use crate::resolve::OutputResolver;

/// Verdict of one scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioStatus {
    Passed,
    Failed,
    /// The check did not apply (e.g. remote state not yet materialized).
    /// Counts against neither passes nor failures.
    Skipped,
}

/// Immutable record of one scenario execution.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    pub name: String,
    pub status: ScenarioStatus,
    pub message: String,
}

impl ScenarioResult {
    pub fn passed(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: ScenarioStatus::Passed,
            message: String::new(),
        }
    }

    pub fn failed(name: &str, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status: ScenarioStatus::Failed,
            message: message.into(),
        }
    }

    pub fn skipped(name: &str, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status: ScenarioStatus::Skipped,
            message: message.into(),
        }
    }

    /// Convert a transport or parse error into a failed result; these never
    /// abort the run.
    pub fn from_error(name: &str, err: &Error) -> Self {
        Self::failed(name, format!("{err:#}"))
    }
}

/// Error that aborts the whole run.
///
/// Only unresolved configuration outputs produce it: contract checks are
/// meaningless without a resolvable target, so there is no point continuing.
#[derive(Debug)]
pub struct FatalError(pub Error);

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            write!(f, "{:#}", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl From<Error> for FatalError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

/// Shared read-only context handed to every scenario.
///
/// Holds capability handles, not resolved values: outputs are looked up fresh
/// on every call so a stale value can never mask real misconfiguration.
pub struct SuiteCtx {
    pub resolver: OutputResolver,
    pub client: Client,
    pub paths: ProjectPaths,
    /// Grace period between registration and verification, for eventual
    /// consistency of the user store.
    pub grace: Duration,
}

impl SuiteCtx {
    pub fn new(repo_root: &Path) -> Result<Self> {
        let paths = ProjectPaths::new(repo_root);
        Ok(Self {
            resolver: OutputResolver::for_terraform_dir(&paths.terraform_dir),
            client: contract::client().context("build http client")?,
            paths,
            grace: contract::CONSISTENCY_GRACE,
        })
    }
}

pub type ScenarioFn = fn(&SuiteCtx) -> Result<ScenarioResult, FatalError>;

/// One registered scenario: a stable name plus its entry point.
pub struct Scenario {
    pub name: &'static str,
    pub run: ScenarioFn,
}

/// Ordered collection of scenarios executed as one CLI command.
pub struct Suite {
    pub name: &'static str,
    pub scenarios: Vec<Scenario>,
}

/// Outcome of executing a suite: the ordered results, plus the fatal error
/// that cut the run short, if any.
#[derive(Debug)]
pub struct SuiteRun {
    pub suite: &'static str,
    pub results: Vec<ScenarioResult>,
    pub fatal: Option<FatalError>,
}

/// Execute every scenario in registration order.
///
/// Scenario failures are recorded and execution continues; a [`FatalError`]
/// stops the suite immediately, preserving the results recorded so far so the
/// partial report can still be printed.
#[instrument(skip_all, fields(suite = suite.name))]
pub fn run_suite(suite: &Suite, ctx: &SuiteCtx) -> SuiteRun {
    let mut results = Vec::with_capacity(suite.scenarios.len());
    for scenario in &suite.scenarios {
        debug!(scenario = scenario.name, "running scenario");
        match (scenario.run)(ctx) {
            Ok(result) => results.push(result),
            Err(fatal) => {
                return SuiteRun {
                    suite: suite.name,
                    results,
                    fatal: Some(fatal),
                };
            }
        }
    }
    SuiteRun {
        suite: suite.name,
        results,
        fatal: None,
    }
}
