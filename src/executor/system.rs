//! Executor that spawns real host processes

use crate::executor::{CommandExecutor, CommandResult, HostCommand};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, error};

/// Runs commands directly (no shell) with a per-command timeout
#[derive(Debug, Clone)]
pub struct SystemExecutor {
    timeout: Duration,
}

impl SystemExecutor {
    /// Create an executor bounding every command by `timeout`
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn execute(&self, command: &HostCommand) -> CommandResult {
        let mut child = match Command::new(&command.program)
            .args(&command.args)
            .stdin(if command.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                return CommandResult::failed(format!(
                    "Failed to execute {}: {}",
                    command.command_line(),
                    e
                ))
            }
        };

        // Fed from its own task so a child that stops reading cannot stall
        // the caller past the deadline below
        let writer = match (command.stdin.clone(), child.stdin.take()) {
            (Some(input), Some(mut stdin)) => Some(tokio::spawn(async move {
                stdin.write_all(input.as_bytes()).await
                // stdin is dropped here so the child sees EOF
            })),
            _ => None,
        };

        // Dropping the wait future on timeout drops the child, which kills it
        let waited = tokio::time::timeout(self.timeout, child.wait_with_output()).await;
        let write_error = match writer {
            Some(handle) if handle.is_finished() => match handle.await {
                Ok(Err(e)) if e.kind() != std::io::ErrorKind::BrokenPipe => Some(e),
                _ => None,
            },
            Some(handle) => {
                handle.abort();
                None
            }
            None => None,
        };

        if let (Some(e), Ok(Ok(_))) = (&write_error, &waited) {
            return CommandResult::failed(format!(
                "Failed to write stdin for {}: {}",
                command.command_line(),
                e
            ));
        }

        match waited {
            Ok(Ok(output)) => {
                let stdout = String::from_utf8_lossy(&output.stdout).to_string();
                let stderr = String::from_utf8_lossy(&output.stderr).to_string();
                match output.status.code() {
                    Some(code) => CommandResult::from_exit(code, stdout, stderr),
                    None => CommandResult {
                        succeeded: false,
                        stdout,
                        stderr,
                        exit_code: None,
                    },
                }
            }
            Ok(Err(e)) => CommandResult::failed(format!(
                "Failed to wait for {}: {}",
                command.command_line(),
                e
            )),
            Err(_) => CommandResult::failed(format!(
                "Command timed out after {:?}: {}",
                self.timeout,
                command.command_line()
            )),
        }
    }
}

impl CommandExecutor for SystemExecutor {
    async fn run(&self, command: &HostCommand) -> CommandResult {
        debug!("Executing command: {}", command);

        let result = self.execute(command).await;

        if !result.succeeded {
            error!(
                "Command failed with exit code {:?}: {}",
                result.exit_code, command
            );
            error!("STDOUT: {}", result.stdout.trim_end());
            error!("STDERR: {}", result.stderr.trim_end());
        }

        result
    }
}
