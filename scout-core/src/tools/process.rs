// scout-core/src/tools/process.rs

//! Launching one external process with a deadline.

use super::CommandOutput;
use crate::invocation::Invocation;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunFailure {
    #[error("{0}")]
    Launch(String),
    #[error("timed out")]
    Timeout,
}

/// Seam between the executor and the operating system; tests substitute a
/// scripted runner.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, invocation: &Invocation, timeout: Duration) -> Result<CommandOutput, RunFailure>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioProcessRunner;

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, invocation: &Invocation, timeout: Duration) -> Result<CommandOutput, RunFailure> {
        debug!(argv = ?invocation.argv(), cwd = ?invocation.cwd, "Launching process");

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the output future on timeout must not leave the child running.
            .kill_on_drop(true);

        let output = match tokio::time::timeout(timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                warn!(program = %invocation.program, error = %e, "Failed to spawn process");
                return Err(RunFailure::Launch(e.to_string()));
            }
            Err(_) => {
                warn!(program = %invocation.program, ?timeout, "Process timed out and was killed");
                return Err(RunFailure::Timeout);
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let status = output.status.code().unwrap_or(-1);

        debug!(
            "Process exit status: {}\nStdout preview (first 3 lines):\n{}\nStderr preview (first 3 lines):\n{}",
            status,
            crate::utils::preview(&stdout, 3),
            crate::utils::preview(&stderr, 3)
        );

        Ok(CommandOutput { status, stdout, stderr })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sh(script: &str, cwd: &std::path::Path) -> Invocation {
        Invocation {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            cwd: cwd.to_path_buf(),
            pattern: None,
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn captures_output_and_status() {
        let dir = tempdir().unwrap();
        let output = TokioProcessRunner
            .run(&sh("echo out; echo err >&2; exit 3", dir.path()), Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(output.status, 3);
        assert_eq!(output.stdout, "out\n");
        assert_eq!(output.stderr, "err\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_process_times_out() {
        let dir = tempdir().unwrap();
        let result = TokioProcessRunner
            .run(&sh("sleep 5", dir.path()), Duration::from_millis(100))
            .await;
        assert_eq!(result, Err(RunFailure::Timeout));
    }

    #[tokio::test]
    async fn missing_program_is_a_launch_failure() {
        let dir = tempdir().unwrap();
        let invocation = Invocation {
            program: "this_command_should_not_exist_qwertyuiop".to_string(),
            args: vec![],
            cwd: dir.path().to_path_buf(),
            pattern: None,
        };
        let result = TokioProcessRunner.run(&invocation, Duration::from_secs(5)).await;
        assert!(matches!(result, Err(RunFailure::Launch(_))));
    }
}
