//! Name → handler registry and batch execution.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use super::{Command, ExecutionStatus};

/// Failure reported by a command handler.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    /// Create a handler error with a human-readable message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The message recorded on the failed command.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Result returned by a command handler.
pub type HandlerResult = std::result::Result<(), HandlerError>;

/// Executes one command.
///
/// Implemented for any `Fn(&mut Command) -> HandlerResult`, so plain closures
/// and functions can be registered directly.
pub trait Handler: Send + Sync {
    /// Run the command. Returning `Ok` marks it executed.
    fn call(&self, command: &mut Command) -> HandlerResult;
}

impl<F> Handler for F
where
    F: Fn(&mut Command) -> HandlerResult + Send + Sync,
{
    fn call(&self, command: &mut Command) -> HandlerResult {
        self(command)
    }
}

/// Registry of command handlers.
#[derive(Default)]
pub struct Dispatcher {
    handlers: HashMap<String, Box<dyn Handler>>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("Dispatcher")
            .field("handlers", &names)
            .finish()
    }
}

impl Dispatcher {
    /// Create an empty dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the handler for `name`, replacing any earlier one.
    pub fn register(&mut self, name: impl Into<String>, handler: impl Handler + 'static) {
        let name = name.into();
        if self.handlers.insert(name.clone(), Box::new(handler)).is_some() {
            tracing::debug!("replaced handler for {name}");
        }
    }

    /// Whether a handler is registered for `name`.
    pub fn is_registered(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Execute a single command, recording the outcome on it.
    ///
    /// Commands that were already executed are left untouched.
    pub fn execute(&self, command: &mut Command) {
        if command.is_terminal() {
            return;
        }

        let Some(handler) = self.handlers.get(&command.name) else {
            tracing::warn!("no handler registered for {}", command.name);
            command.status = ExecutionStatus::Error;
            command.error = Some(format!(
                "No callback registered for command: {}",
                command.name
            ));
            return;
        };

        match handler.call(command) {
            Ok(()) => {
                command.status = ExecutionStatus::Executed;
                command.error = None;
            }
            Err(e) => {
                tracing::warn!("command {} failed: {e}", command.name);
                command.status = ExecutionStatus::Error;
                command.error = Some(e.message);
            }
        }
    }

    /// Execute every command in order. One failure never stops the rest.
    pub fn execute_all(&self, commands: &mut [Command]) {
        for command in commands {
            self.execute(command);
        }
    }
}
