//! CLI entry point for the deployment validation harness.
//!
//! Each subcommand runs one scenario suite against the repository rooted at
//! the current directory and the deployed endpoint resolved from it. The
//! process exit code is the failure count; fatal resolution errors exit with
//! [`exit_codes::FATAL`].

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use harness::exit_codes;
use harness::logging;
use harness::report;
use harness::scenario::{SuiteCtx, SuiteRun, run_suite};
use harness::suites;

#[derive(Parser)]
#[command(
    name = "harness",
    version,
    about = "Validation harness for the user-registration deployment"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check that the deployed endpoint answers and core outputs exist.
    Smoke,
    /// Exercise the registration/verification HTTP contract.
    Contract,
    /// Statically validate the pipeline definition and repository layout.
    Checks,
    /// Run every suite in order.
    All,
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            exit_codes::FATAL
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let repo_root = std::env::current_dir().context("resolve current directory")?;
    let ctx = SuiteCtx::new(&repo_root)?;

    let suites = match cli.command {
        Command::Smoke => vec![suites::smoke_suite()],
        Command::Contract => vec![suites::contract_suite()],
        Command::Checks => vec![suites::checks_suite()],
        Command::All => suites::all_suites(),
    };

    let mut runs: Vec<SuiteRun> = Vec::with_capacity(suites.len());
    for suite in &suites {
        let suite_run = run_suite(suite, &ctx);
        report::print_report(&suite_run);
        let fatal = suite_run.fatal.is_some();
        runs.push(suite_run);
        // A fatal resolution error makes the remaining suites meaningless.
        if fatal {
            break;
        }
    }
    Ok(report::exit_code(&runs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_contract() {
        let cli = Cli::parse_from(["harness", "contract"]);
        assert!(matches!(cli.command, Command::Contract));
    }

    #[test]
    fn parse_all() {
        let cli = Cli::parse_from(["harness", "all"]);
        assert!(matches!(cli.command, Command::All));
    }

    #[test]
    fn rejects_unknown_subcommand() {
        assert!(Cli::try_parse_from(["harness", "deploy"]).is_err());
    }
}
