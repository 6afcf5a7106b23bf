//! Validation harness for a serverless user-registration deployment.
//!
//! The deployed system is a black box: an HTTP endpoint backed by a key-value
//! user store, deployed by a GitHub Actions pipeline from a Terraform
//! repository. This crate only observes and asserts; it never provisions,
//! destroys, or cleans up anything. The architecture keeps a strict
//! separation:
//!
//! - **Pure verdicts**: assertion helpers in [`contract`], [`workflow`], and
//!   [`layout`] decide pass/fail over already-captured data, with no I/O.
//! - **Capture**: HTTP calls, subprocess invocations, and file reads are
//!   bounded by explicit timeouts and performed fresh per scenario.
//!
//! [`scenario`] and [`report`] coordinate the two into CLI suites whose exit
//! code is the failure count.

pub mod contract;
pub mod exit_codes;
pub mod ident;
pub mod layout;
pub mod logging;
pub mod paths;
pub mod process;
pub mod report;
pub mod resolve;
pub mod scenario;
pub mod suites;
pub mod workflow;
