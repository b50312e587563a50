//! Closure-driven executor for unit tests

use crate::executor::{CommandExecutor, CommandResult, HostCommand};
use std::sync::Mutex;

type Responder = Box<dyn Fn(&HostCommand) -> CommandResult + Send + Sync>;

/// Answers every command with a closure and records the command lines
pub(crate) struct ScriptedExecutor {
    responder: Responder,
    log: Mutex<Vec<HostCommand>>,
}

impl ScriptedExecutor {
    pub(crate) fn new<F>(responder: F) -> Self
    where
        F: Fn(&HostCommand) -> CommandResult + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Every command succeeds with empty output
    pub(crate) fn succeeding() -> Self {
        Self::new(|_| CommandResult::success(""))
    }

    /// Command lines seen so far, in order
    pub(crate) fn command_lines(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .map(HostCommand::command_line)
            .collect()
    }

    /// Full commands seen so far, including stdin
    pub(crate) fn commands(&self) -> Vec<HostCommand> {
        self.log.lock().unwrap().clone()
    }
}

impl CommandExecutor for ScriptedExecutor {
    async fn run(&self, command: &HostCommand) -> CommandResult {
        self.log.lock().unwrap().push(command.clone());
        (self.responder)(command)
    }
}
