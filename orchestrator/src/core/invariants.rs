//! Structural invariants of a task forest that the type system cannot express.

use std::collections::HashSet;

use crate::core::task::Task;
use crate::core::types::TaskStatus;

/// Check forest invariants:
/// - No duplicate ids
/// - Terminal tasks have no `in_progress` subtasks
/// - Completed parents have only completed subtasks
pub fn validate_invariants(roots: &[Task]) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();
    for root in roots {
        validate_task(root, &mut seen, &mut errors, root.id());
    }
    errors
}

fn validate_task<'a>(
    task: &'a Task,
    seen: &mut HashSet<&'a str>,
    errors: &mut Vec<String>,
    path: &str,
) {
    if !seen.insert(task.id()) {
        errors.push(format!("duplicate id '{}' at {}", task.id(), path));
    }

    if task.status().is_terminal()
        && task
            .subtasks()
            .iter()
            .any(|child| child.status() == TaskStatus::InProgress)
    {
        errors.push(format!(
            "{}: {} while a subtask is still in_progress",
            path,
            task.status()
        ));
    }

    if task.status() == TaskStatus::Completed
        && task
            .subtasks()
            .iter()
            .any(|child| child.status() != TaskStatus::Completed)
    {
        errors.push(format!("{}: completed with unfinished subtasks", path));
    }

    for child in task.subtasks() {
        let child_path = format!("{}/{}", path, child.id());
        validate_task(child, seen, errors, &child_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::TaskResult;
    use serde_json::json;

    #[test]
    fn fresh_tree_is_valid() {
        let mut root = Task::new("root");
        root.add_subtask("a").expect("add");
        root.add_subtask("b").expect("add");
        assert!(validate_invariants(&[root]).is_empty());
    }

    #[test]
    fn completed_parent_with_pending_child_is_reported() {
        let mut root = Task::new("root");
        root.add_subtask("a").expect("add");
        root.set_status(TaskStatus::InProgress).expect("start");
        root.set_result(TaskResult::Output(json!([]))).expect("result");
        root.set_status(TaskStatus::Completed).expect("complete");

        let errors = validate_invariants(&[root]);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].ends_with("completed with unfinished subtasks"));
    }

    /// A failed parent may leave later siblings pending (fail-fast), but never running.
    #[test]
    fn failed_parent_allows_pending_but_not_running_children() {
        let mut root = Task::new("root");
        root.add_subtask("a").expect("add");
        root.add_subtask("b").expect("add");
        root.set_status(TaskStatus::InProgress).expect("start");
        root.subtasks_mut()[0]
            .set_status(TaskStatus::InProgress)
            .expect("start child");
        root.set_status(TaskStatus::Failed).expect("fail");

        let errors = validate_invariants(&[root]);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("still in_progress"));
    }
}
