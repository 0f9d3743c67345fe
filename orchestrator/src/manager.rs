//! Task forest ownership and sequential execution.
//!
//! The manager owns every root task. Execution walks a tree depth-first, one
//! step at a time, and stops at the first failure: the failing task and each
//! of its ancestors end `failed`, later siblings stay `pending`.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use crate::agents::Agent;
use crate::core::invariants::validate_invariants;
use crate::core::selector::{collect_by_status, find_task, find_task_mut};
use crate::core::status_validator::ensure_pending;
use crate::core::task::Task;
use crate::core::types::{StatusSummary, TaskFailure, TaskResult, TaskStatus};
use crate::error::TaskError;

/// Owner of the root tasks, iterated in insertion order.
#[derive(Debug, Default)]
pub struct TaskManager {
    tasks: Vec<Task>,
    roots: HashMap<String, usize>,
}

impl TaskManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new pending root task.
    pub fn add_task(&mut self, description: impl Into<String>) -> &mut Task {
        self.insert_root(Task::new(description))
    }

    /// Register a root task with one pending subtask per description, in order.
    pub fn add_complex_task<I, S>(&mut self, description: impl Into<String>, subtasks: I) -> &mut Task
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert_root(Task::with_subtasks(description, subtasks))
    }

    /// Ask `agent` for a plan and register the resulting tree.
    ///
    /// Nothing is registered when the agent fails.
    #[instrument(skip_all)]
    pub fn decompose_task(
        &mut self,
        description: &str,
        agent: &mut dyn Agent,
    ) -> Result<&mut Task, TaskError> {
        let subtasks = agent.decompose(description).inspect_err(|err| {
            warn!(err = %err, "decomposition failed");
        })?;
        info!(subtasks = subtasks.len(), "task decomposed");
        Ok(self.add_complex_task(description, subtasks))
    }

    /// Run the task `task_id` and its subtree to a terminal status.
    ///
    /// Returns the task's final result. A failing step is not an error here:
    /// it shows up as [`TaskResult::Failure`] and a `failed` tree. Errors are
    /// reserved for contract violations (unknown id, task already started,
    /// a subtask left `in_progress`).
    #[instrument(skip_all, fields(task_id = %task_id))]
    pub fn execute_task_sequentially(
        &mut self,
        task_id: &str,
        agent: &mut dyn Agent,
    ) -> Result<TaskResult, TaskError> {
        let task = find_task_mut(&mut self.tasks, task_id)
            .ok_or_else(|| TaskError::NotFound(task_id.to_string()))?;
        ensure_pending(task.id(), task.status(), "execute")?;
        ensure_nothing_running(task)?;

        let result = run_task(task, agent)?;
        match &result {
            TaskResult::Output(_) => info!("task tree completed"),
            TaskResult::Failure(failure) => warn!(
                failed_task = %failure.task_id,
                message = %failure.message,
                "task tree failed"
            ),
        }

        for violation in validate_invariants(&self.tasks) {
            error!(violation = %violation, "task forest invariant violated");
        }
        Ok(result)
    }

    /// Root tasks in insertion order.
    pub fn get_tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Look up a task anywhere in the forest.
    pub fn get_task(&self, task_id: &str) -> Option<&Task> {
        match self.roots.get(task_id) {
            Some(&index) => self.tasks.get(index),
            None => find_task(&self.tasks, task_id),
        }
    }

    pub fn get_task_mut(&mut self, task_id: &str) -> Option<&mut Task> {
        match self.roots.get(task_id) {
            Some(&index) => self.tasks.get_mut(index),
            None => find_task_mut(&mut self.tasks, task_id),
        }
    }

    /// Apply a status transition to any task in the forest.
    pub fn update_task(&mut self, task_id: &str, status: TaskStatus) -> Result<(), TaskError> {
        let task = self
            .get_task_mut(task_id)
            .ok_or_else(|| TaskError::NotFound(task_id.to_string()))?;
        task.set_status(status)?;
        debug!(task_id, status = %status, "task status updated");
        Ok(())
    }

    /// Every task with `status`, depth-first over the forest.
    pub fn tasks_with_status(&self, status: TaskStatus) -> Vec<&Task> {
        collect_by_status(&self.tasks, status)
    }

    /// Task descriptions grouped by status.
    pub fn status_summary(&self) -> StatusSummary {
        let describe = |status: TaskStatus| -> Vec<String> {
            self.tasks_with_status(status)
                .into_iter()
                .map(|task| task.description().to_string())
                .collect()
        };
        StatusSummary {
            pending: describe(TaskStatus::Pending),
            in_progress: describe(TaskStatus::InProgress),
            completed: describe(TaskStatus::Completed),
            failed: describe(TaskStatus::Failed),
        }
    }

    fn insert_root(&mut self, task: Task) -> &mut Task {
        let index = self.tasks.len();
        self.roots.insert(task.id().to_string(), index);
        self.tasks.push(task);
        debug!(task_id = %self.tasks[index].id(), "root task registered");
        &mut self.tasks[index]
    }
}

fn ensure_nothing_running(task: &Task) -> Result<(), TaskError> {
    match task
        .all_subtasks()
        .into_iter()
        .find(|sub| sub.status() == TaskStatus::InProgress)
    {
        Some(sub) => Err(TaskError::InvalidState {
            id: sub.id().to_string(),
            status: sub.status(),
            action: "resume",
        }),
        None => Ok(()),
    }
}

fn run_task(task: &mut Task, agent: &mut dyn Agent) -> Result<TaskResult, TaskError> {
    task.set_status(TaskStatus::InProgress)?;
    debug!(task_id = %task.id(), description = %task.description(), "task started");

    let result = if task.is_complex() {
        run_subtasks(task, agent)?
    } else {
        run_step(task, agent)
    };

    let terminal = if result.is_failure() {
        TaskStatus::Failed
    } else {
        TaskStatus::Completed
    };
    task.set_result(result.clone())?;
    task.set_status(terminal)?;
    debug!(task_id = %task.id(), status = %terminal, "task finished");
    Ok(result)
}

fn run_step(task: &Task, agent: &mut dyn Agent) -> TaskResult {
    match task.execution().run(agent, task) {
        Ok(value) => TaskResult::Output(value),
        Err(err) => {
            warn!(task_id = %task.id(), err = %format!("{err:#}"), "task step failed");
            TaskResult::Failure(TaskFailure {
                task_id: task.id().to_string(),
                description: task.description().to_string(),
                message: format!("{err:#}"),
            })
        }
    }
}

fn run_subtasks(task: &mut Task, agent: &mut dyn Agent) -> Result<TaskResult, TaskError> {
    let mut outputs = Vec::with_capacity(task.subtasks().len());
    for sub in task.subtasks_mut() {
        match sub.status() {
            TaskStatus::Completed => {
                debug!(task_id = %sub.id(), "reusing completed subtask");
                outputs.push(sub.output().cloned().unwrap_or(Value::Null));
                continue;
            }
            TaskStatus::Failed => {
                let failure = sub.failure().cloned().unwrap_or_else(|| TaskFailure {
                    task_id: sub.id().to_string(),
                    description: sub.description().to_string(),
                    message: "subtask was marked failed before execution".to_string(),
                });
                return Ok(TaskResult::Failure(failure));
            }
            TaskStatus::Pending | TaskStatus::InProgress => {}
        }

        match run_task(sub, agent)? {
            TaskResult::Output(value) => outputs.push(value),
            failure @ TaskResult::Failure(_) => return Ok(failure),
        }
    }
    Ok(TaskResult::Output(Value::Array(outputs)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedAgent;
    use serde_json::json;

    #[test]
    fn complex_task_keeps_subtask_order() {
        let mut manager = TaskManager::new();
        let task = manager.add_complex_task("Build X", ["design", "implement", "test"]);
        let names: Vec<&str> = task.subtasks().iter().map(Task::description).collect();
        assert_eq!(names, vec!["design", "implement", "test"]);
        assert_eq!(manager.get_tasks().len(), 1);
    }

    #[test]
    fn unknown_task_is_not_found() {
        let mut manager = TaskManager::new();
        let mut agent = ScriptedAgent::default();
        let err = manager
            .execute_task_sequentially("nope", &mut agent)
            .expect_err("unknown id");
        assert!(matches!(err, TaskError::NotFound(_)));
        assert!(matches!(
            manager.update_task("nope", TaskStatus::InProgress),
            Err(TaskError::NotFound(_))
        ));
    }

    #[test]
    fn started_task_cannot_be_executed_again() {
        let mut manager = TaskManager::new();
        let id = manager.add_task("once").id().to_string();
        let mut agent = ScriptedAgent::default();
        manager
            .execute_task_sequentially(&id, &mut agent)
            .expect("first run");

        let err = manager
            .execute_task_sequentially(&id, &mut agent)
            .expect_err("already completed");
        assert!(matches!(err, TaskError::InvalidState { .. }));
    }

    #[test]
    fn leaf_root_runs_as_single_step() {
        let mut manager = TaskManager::new();
        let id = manager.add_task("say hi").id().to_string();
        let mut agent = ScriptedAgent::default();

        let result = manager
            .execute_task_sequentially(&id, &mut agent)
            .expect("run");
        assert_eq!(result, TaskResult::Output(json!("done: say hi")));
        let task = manager.get_task(&id).expect("task");
        assert_eq!(task.status(), TaskStatus::Completed);
        assert_eq!(agent.executed, vec!["say hi"]);
    }

    #[test]
    fn nested_subtasks_run_depth_first() {
        let mut manager = TaskManager::new();
        let root = manager.add_task("root");
        let id = root.id().to_string();
        let a = root.add_subtask("a").expect("add");
        a.add_subtask("a1").expect("add");
        a.add_subtask("a2").expect("add");
        root.add_subtask("b").expect("add");

        let mut agent = ScriptedAgent::default();
        let result = manager
            .execute_task_sequentially(&id, &mut agent)
            .expect("run");

        assert_eq!(agent.executed, vec!["a1", "a2", "b"]);
        assert_eq!(
            result,
            TaskResult::Output(json!([["done: a1", "done: a2"], "done: b"]))
        );
    }

    #[test]
    fn completed_subtask_is_reused_not_rerun() {
        let mut manager = TaskManager::new();
        let root = manager.add_complex_task("root", ["a", "b"]);
        let id = root.id().to_string();
        let first = root.subtasks()[0].id().to_string();
        manager
            .update_task(&first, TaskStatus::InProgress)
            .expect("start");
        manager
            .update_task(&first, TaskStatus::Completed)
            .expect("complete");

        let mut agent = ScriptedAgent::default();
        let result = manager
            .execute_task_sequentially(&id, &mut agent)
            .expect("run");
        assert_eq!(agent.executed, vec!["b"]);
        assert_eq!(result, TaskResult::Output(json!([null, "done: b"])));
    }

    #[test]
    fn subtask_left_running_is_a_contract_violation() {
        let mut manager = TaskManager::new();
        let root = manager.add_complex_task("root", ["a"]);
        let id = root.id().to_string();
        let sub = root.subtasks()[0].id().to_string();
        manager
            .update_task(&sub, TaskStatus::InProgress)
            .expect("start");

        let mut agent = ScriptedAgent::default();
        let err = manager
            .execute_task_sequentially(&id, &mut agent)
            .expect_err("running subtask");
        assert!(matches!(err, TaskError::InvalidState { .. }));
        assert_eq!(
            manager.get_task(&id).expect("root").status(),
            TaskStatus::Pending
        );
    }

    #[test]
    fn status_summary_groups_descriptions() {
        let mut manager = TaskManager::new();
        manager.add_complex_task("root", ["a", "b"]);
        let other = manager.add_task("other").id().to_string();
        manager
            .update_task(&other, TaskStatus::InProgress)
            .expect("start");

        let summary = manager.status_summary();
        assert_eq!(summary.pending, vec!["root", "a", "b"]);
        assert_eq!(summary.in_progress, vec!["other"]);
        assert!(summary.completed.is_empty());
        assert!(summary.failed.is_empty());
    }

    #[test]
    fn failed_decomposition_registers_nothing() {
        let mut manager = TaskManager::new();
        let mut agent = ScriptedAgent::default();
        let err = manager
            .decompose_task("unplanned", &mut agent)
            .expect_err("empty plan");
        assert!(matches!(err, TaskError::Decomposition(_)));
        assert!(manager.get_tasks().is_empty());
    }
}
