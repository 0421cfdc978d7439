//! Command batches.
//!
//! A completed transfer is interpreted as text, one command per line:
//!
//! ```text
//! A0 1.5 2.5
//! B2 10
//! ```
//!
//! [`parse_commands`] turns the payload into [`Command`] values and a
//! [`Dispatcher`] runs each one through the handler registered for its name.

mod dispatcher;
mod parser;
mod report;

pub use dispatcher::{Dispatcher, Handler, HandlerError, HandlerResult};
pub use parser::{parse_commands, parse_line};
pub use report::{BatchReport, BatchSummary};

use serde::Serialize;

/// Execution status of a command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Parsed, not yet seen by the dispatcher
    #[default]
    NotExecuted,
    /// Handler returned normally
    Executed,
    /// No handler registered, or the handler failed
    Error,
}

/// A single parsed command and, after dispatch, its outcome.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Command {
    /// Command name, the first token on the line
    pub name: String,
    /// Numeric parameters in source order
    pub parameters: Vec<f64>,
    /// Execution status
    pub status: ExecutionStatus,
    /// Failure message, set only when `status` is [`ExecutionStatus::Error`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Command {
    /// Create a command that has not been executed.
    pub fn new(name: impl Into<String>, parameters: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            parameters,
            status: ExecutionStatus::NotExecuted,
            error: None,
        }
    }

    /// Whether the dispatcher has already processed this command.
    pub fn is_terminal(&self) -> bool {
        self.status != ExecutionStatus::NotExecuted
    }
}
