//! Shared deterministic types for the task core.
//!
//! These types define stable contracts between the task tree, the manager and
//! the CLI. They carry no behavior beyond the status state machine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle status of a task.
///
/// Transitions: `pending -> in_progress -> {completed, failed}`. Terminal
/// states have no outgoing edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::Failed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// Statuses reachable from `self` in one step.
    pub fn valid_transitions(self) -> &'static [TaskStatus] {
        match self {
            TaskStatus::Pending => &[TaskStatus::InProgress],
            TaskStatus::InProgress => &[TaskStatus::Completed, TaskStatus::Failed],
            TaskStatus::Completed | TaskStatus::Failed => &[],
        }
    }

    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        self.valid_transitions().contains(&next)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "in_progress" | "in-progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed),
            other => Err(format!(
                "invalid status '{other}' (expected one of: pending, in_progress, completed, failed)"
            )),
        }
    }
}

/// Record of the error that ended a task or one of its descendants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskFailure {
    /// Id of the task whose execution raised the error.
    pub task_id: String,
    pub description: String,
    pub message: String,
}

/// Outcome recorded on a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TaskResult {
    /// Value produced by a successful step, or the ordered list of subtask
    /// outputs for a parent.
    Output(Value),
    Failure(TaskFailure),
}

impl TaskResult {
    pub fn output(&self) -> Option<&Value> {
        match self {
            TaskResult::Output(value) => Some(value),
            TaskResult::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&TaskFailure> {
        match self {
            TaskResult::Output(_) => None,
            TaskResult::Failure(failure) => Some(failure),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, TaskResult::Failure(_))
    }
}

/// Task descriptions grouped by status, in depth-first forest order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusSummary {
    pub pending: Vec<String>,
    pub in_progress: Vec<String>,
    pub completed: Vec<String>,
    pub failed: Vec<String>,
}
