//! Task tree nodes.
//!
//! A [`Task`] owns its subtasks exclusively, so a tree can never contain
//! shared nodes or cycles. Subtask order is execution order and is fixed once
//! the subtask is appended.

use std::fmt;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::agents::Agent;
use crate::core::status_validator::{ensure_not_terminal, ensure_pending, validate_transition};
use crate::core::types::{TaskFailure, TaskResult, TaskStatus};
use crate::error::TaskError;

/// Signature of custom step logic bound to a task.
pub type TaskFn = dyn Fn(&mut dyn Agent, &Task) -> anyhow::Result<Value>;

/// How a task is executed when the manager reaches it.
#[derive(Clone, Default)]
pub enum Execution {
    /// Hand the description to the agent's default chat-based executor.
    #[default]
    Default,
    Custom(Rc<TaskFn>),
}

impl Execution {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&mut dyn Agent, &Task) -> anyhow::Result<Value> + 'static,
    {
        Execution::Custom(Rc::new(f))
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, Execution::Custom(_))
    }

    /// Run the step for `task`.
    pub fn run(&self, agent: &mut dyn Agent, task: &Task) -> anyhow::Result<Value> {
        match self {
            Execution::Default => agent.execute_default(task.description()),
            Execution::Custom(f) => f(agent, task),
        }
    }
}

impl fmt::Debug for Execution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Execution::Default => f.write_str("Default"),
            Execution::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// One unit of work and its ordered subdivision.
#[derive(Debug, Serialize)]
pub struct Task {
    id: String,
    description: String,
    status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<TaskResult>,
    created_at: DateTime<Utc>,
    #[serde(skip)]
    execution: Execution,
    subtasks: Vec<Task>,
}

impl Task {
    pub fn new(description: impl Into<String>) -> Self {
        Self::with_execution(description, Execution::Default)
    }

    pub fn with_execution(description: impl Into<String>, execution: Execution) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            description: description.into(),
            status: TaskStatus::Pending,
            result: None,
            created_at: Utc::now(),
            execution,
            subtasks: Vec::new(),
        }
    }

    /// A pending task with one pending default-executed subtask per entry.
    pub fn with_subtasks<I, S>(description: impl Into<String>, subtasks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut task = Self::new(description);
        task.subtasks = subtasks.into_iter().map(Task::new).collect();
        task
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn result(&self) -> Option<&TaskResult> {
        self.result.as_ref()
    }

    /// Successful output, if the recorded result is one.
    pub fn output(&self) -> Option<&Value> {
        self.result.as_ref().and_then(TaskResult::output)
    }

    pub fn failure(&self) -> Option<&TaskFailure> {
        self.result.as_ref().and_then(TaskResult::failure)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn subtasks(&self) -> &[Task] {
        &self.subtasks
    }

    pub fn subtasks_mut(&mut self) -> &mut [Task] {
        &mut self.subtasks
    }

    pub fn execution(&self) -> &Execution {
        &self.execution
    }

    /// True when the task has been subdivided.
    pub fn is_complex(&self) -> bool {
        !self.subtasks.is_empty()
    }

    /// All descendants, depth-first in execution order.
    pub fn all_subtasks(&self) -> Vec<&Task> {
        let mut out = Vec::new();
        collect_descendants(self, &mut out);
        out
    }

    /// Append a pending child that runs with the default executor.
    pub fn add_subtask(&mut self, description: impl Into<String>) -> Result<&mut Task, TaskError> {
        self.add_subtask_with(description, Execution::Default)
    }

    /// Append a pending child bound to `execution`.
    pub fn add_subtask_with(
        &mut self,
        description: impl Into<String>,
        execution: Execution,
    ) -> Result<&mut Task, TaskError> {
        ensure_not_terminal(&self.id, self.status, "add a subtask to")?;
        let index = self.subtasks.len();
        self.subtasks
            .push(Task::with_execution(description, execution));
        Ok(&mut self.subtasks[index])
    }

    /// Bind custom step logic. Only allowed before the task starts.
    pub fn set_execution_function(&mut self, execution: Execution) -> Result<(), TaskError> {
        ensure_pending(&self.id, self.status, "bind an execution function to")?;
        self.execution = execution;
        Ok(())
    }

    /// Apply a state-machine transition. Never touches `result`.
    pub fn set_status(&mut self, next: TaskStatus) -> Result<(), TaskError> {
        validate_transition(&self.id, self.status, next)?;
        self.status = next;
        Ok(())
    }

    /// Record the task outcome. A result is written at most once, while the
    /// task is `in_progress`, before its terminal transition.
    pub fn set_result(&mut self, result: TaskResult) -> Result<(), TaskError> {
        if self.status != TaskStatus::InProgress {
            return Err(TaskError::InvalidState {
                id: self.id.clone(),
                status: self.status,
                action: "record a result on",
            });
        }
        if self.result.is_some() {
            return Err(TaskError::InvalidState {
                id: self.id.clone(),
                status: self.status,
                action: "overwrite the result of",
            });
        }
        self.result = Some(result);
        Ok(())
    }
}

fn collect_descendants<'a>(task: &'a Task, out: &mut Vec<&'a Task>) {
    for child in &task.subtasks {
        out.push(child);
        collect_descendants(child, out);
    }
}
