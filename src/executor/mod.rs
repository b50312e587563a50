//! Host command execution
//!
//! Everything the controller does to the host goes through the
//! [`CommandExecutor`] capability: run one program, get back exit code and
//! captured output. Implementations never fail; spawn errors and timeouts are
//! folded into an unsuccessful [`CommandResult`].

mod system;

pub use system::SystemExecutor;

#[cfg(test)]
pub(crate) mod scripted;

use std::fmt;
use std::future::Future;

/// A single host command: program, arguments and optional stdin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostCommand {
    /// Program to run (looked up on `PATH`)
    pub program: String,
    /// Arguments, passed without shell interpretation
    pub args: Vec<String>,
    /// Data written to the child's stdin
    pub stdin: Option<String>,
}

impl HostCommand {
    /// Create a command with the given program and arguments
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            stdin: None,
        }
    }

    /// Feed `input` to the command on stdin
    pub fn with_stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Command line as a single string, for logs and test assertions
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

impl fmt::Display for HostCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command_line())?;
        if self.stdin.is_some() {
            write!(f, " <stdin>")?;
        }
        Ok(())
    }
}

/// Outcome of one host command invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// Exit code was zero
    pub succeeded: bool,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
    /// Exit code; `None` when killed, timed out or never started
    pub exit_code: Option<i32>,
}

impl CommandResult {
    /// Result of a process that exited with `code`
    pub fn from_exit(code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            succeeded: code == 0,
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code: Some(code),
        }
    }

    /// Successful result with the given stdout
    pub fn success(stdout: impl Into<String>) -> Self {
        Self::from_exit(0, stdout, "")
    }

    /// Failure without an exit code (spawn error, timeout, signal)
    pub fn failed(diagnostic: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            stdout: String::new(),
            stderr: diagnostic.into(),
            exit_code: None,
        }
    }

    /// Best diagnostic text for a failure: stderr, else stdout, else exit code
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }

        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }

        match self.exit_code {
            Some(code) => format!("exited with code {}", code),
            None => "terminated without exit code".to_string(),
        }
    }
}

/// Capability to run a privileged host command.
///
/// The reconciler, probe and peer manager are generic over this trait so the
/// fallback ladder can be exercised against a fake host.
pub trait CommandExecutor: Send + Sync + 'static {
    /// Run `command` to completion and report what happened
    fn run(&self, command: &HostCommand) -> impl Future<Output = CommandResult> + Send;
}
