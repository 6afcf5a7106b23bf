//! Stable exit codes for harness CLI commands.
//!
//! A suite run exits with its failure count, so `0` means every scenario
//! passed. Fatal resolution errors abort before a count exists.

/// Every scenario in the requested suites passed.
pub const OK: i32 = 0;
/// A required output could not be resolved; the run was aborted.
pub const FATAL: i32 = 1;
