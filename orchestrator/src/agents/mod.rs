//! Agent abstractions for task decomposition and step execution.
//!
//! The [`Agent`] trait is the boundary between the task manager and whatever
//! produces plans and step results. [`chat::ChatAgent`] implements it on top of
//! a [`backend::ChatBackend`]; tests use scripted agents that return
//! predetermined outputs.

use serde_json::Value;

use crate::error::DecompositionError;

pub mod backend;
pub mod chat;
pub mod decomposer;
pub mod memory;
pub mod prompt;

/// Collaborator that plans and performs task steps.
pub trait Agent {
    /// Split `description` into ordered subtask descriptions.
    ///
    /// An empty list is a valid answer: the task is handled as a single step.
    fn decompose(&mut self, description: &str) -> Result<Vec<String>, DecompositionError>;

    /// Perform a step that has no custom execution function bound.
    fn execute_default(&mut self, description: &str) -> anyhow::Result<Value>;
}
