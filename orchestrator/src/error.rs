//! Error taxonomy for the task and tool cores.
//!
//! State-machine and lookup errors are contract violations and are returned to
//! the caller of the mutating operation. Tool failures raised by tool functions
//! never escape `ToolRegistry::execute_tool`; they are folded into a
//! [`crate::tools::ToolOutcome`] instead.

use thiserror::Error;

use crate::core::types::TaskStatus;

/// Errors raised by [`crate::core::task::Task`] and [`crate::manager::TaskManager`].
#[derive(Debug, Error)]
pub enum TaskError {
    /// The operation is not allowed in the task's current status.
    #[error("cannot {action} task '{id}' while it is {status}")]
    InvalidState {
        id: String,
        status: TaskStatus,
        action: &'static str,
    },

    /// The requested status change is not an edge of the task state machine.
    #[error("invalid transition for task '{id}': {from} -> {to}")]
    InvalidTransition {
        id: String,
        from: TaskStatus,
        to: TaskStatus,
    },

    #[error("task '{0}' not found")]
    NotFound(String),

    #[error(transparent)]
    Decomposition(#[from] DecompositionError),
}

/// Failure of the decomposition collaborator to produce a usable subtask list.
#[derive(Debug, Error)]
pub enum DecompositionError {
    #[error("decomposition returned an empty response")]
    EmptyResponse,

    #[error("decomposition backend failed: {0}")]
    Backend(String),
}

/// Errors raised on the tool dispatch path.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("tool '{0}' not found")]
    NotFound(String),

    /// The context's operation budget is spent; the tool was not invoked.
    #[error("operation limit exceeded: {used} of {limit} operations used")]
    OperationLimitExceeded { used: u64, limit: u64 },

    /// The underlying tool function failed.
    #[error("tool '{tool}' failed: {message}")]
    Execution { tool: String, message: String },

    #[error("invalid arguments for tool '{tool}': {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("invalid parameter schema for tool '{tool}': {message}")]
    InvalidSchema { tool: String, message: String },

    #[error("invalid setting '{name}': {message}")]
    InvalidSetting { name: String, message: String },

    /// A path-scoped tool resolved a path outside the allowed root.
    #[error("access denied: {path} is outside the allowed directory {root}")]
    PathOutsideRoot { path: String, root: String },
}
