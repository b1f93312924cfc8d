//! Short-lived helper commands

use curfew_host_api::{HostError, HostResult};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Default upper bound for any helper command
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// Run `argv` to completion and return its trimmed stdout.
///
/// A non-zero exit becomes `CommandFailed` carrying stderr. The child is
/// killed if it outlives `timeout`.
pub async fn run_command(argv: &[String], timeout: Duration) -> HostResult<String> {
    let Some((program, args)) = argv.split_first() else {
        return Err(HostError::CommandFailed("Empty argv".into()));
    };

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = cmd
        .spawn()
        .map_err(|e| HostError::CommandFailed(format!("Failed to spawn {}: {}", program, e)))?;

    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| HostError::Timeout(timeout))??;

    debug!(program = %program, status = ?output.status, "Command finished");

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(HostError::CommandFailed(if stderr.is_empty() {
            format!("{} exited with {}", program, output.status)
        } else {
            format!("{} exited with {}: {}", program, output.status, stderr)
        }))
    }
}
