//! Bounded child-process execution.
//!
//! Every external command the harness runs goes through here so that a hung
//! tool surfaces as a timeout, never as an indefinite hang.

use std::io::Read;
use std::process::{Command, ExitStatus, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, warn};
use wait_timeout::ChildExt;

/// Captured child process output.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

/// Run a command with a timeout and capture stdout/stderr.
///
/// On timeout the child is killed and `timed_out` is set; the exit status then
/// reflects the kill, so callers must check `timed_out` before `status`.
pub fn run_command_with_timeout(mut cmd: Command, timeout: Duration) -> Result<CommandOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!(command = ?cmd, "spawning child process");
    let mut child = cmd.spawn().context("spawn command")?;

    let mut timed_out = false;
    let status = match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => status,
        None => {
            warn!(timeout_secs = timeout.as_secs(), "command timed out, killing");
            timed_out = true;
            child.kill().ok();
            child.wait().context("wait after kill")?
        }
    };

    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    if let Some(mut out) = child.stdout.take() {
        out.read_to_end(&mut stdout).context("read stdout")?;
    }
    if let Some(mut err) = child.stderr.take() {
        err.read_to_end(&mut stderr).context("read stderr")?;
    }

    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(CommandOutput {
        status,
        stdout: String::from_utf8_lossy(&stdout).to_string(),
        stderr: String::from_utf8_lossy(&stderr).to_string(),
        timed_out,
    })
}
