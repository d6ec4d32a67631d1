// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess execution helpers

use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

/// Default timeout for `hpss_avail` preflight checks.
pub const HPSS_AVAIL_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for `hsi` transfers; tape recalls can take hours.
pub const HSI_TIMEOUT: Duration = Duration::from_secs(6 * 60 * 60);

/// Default timeout for `globus-url-copy` transfers.
pub const GRIDFTP_TIMEOUT: Duration = Duration::from_secs(1200);

/// Run a subprocess command with a timeout.
///
/// Wraps `Command::output()` with `tokio::time::timeout`, converting
/// timeout expiration into a descriptive error message. The child process
/// is killed automatically if the timeout elapses (via the tokio `Child`
/// drop implementation).
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    description: &str,
) -> Result<Output, String> {
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(io_err)) => Err(format!("{} failed: {}", description, io_err)),
        Err(_elapsed) => Err(format!(
            "{} timed out after {}s",
            description,
            timeout.as_secs()
        )),
    }
}

/// Summarize a failed `Output` for quarantine reasons: exit code plus the
/// first stderr line.
pub fn failure_summary(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let first_line = stderr.lines().next().unwrap_or("").trim();
    match output.status.code() {
        Some(code) if first_line.is_empty() => format!("exit code {code}"),
        Some(code) => format!("exit code {code}: {first_line}"),
        None => format!("killed by signal: {first_line}"),
    }
}
