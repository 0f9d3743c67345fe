//! Depth-first lookup over a task forest.

use crate::core::task::Task;
use crate::core::types::TaskStatus;

/// Find a task by id anywhere in the forest, roots first, depth-first.
pub fn find_task<'a>(roots: &'a [Task], id: &str) -> Option<&'a Task> {
    for root in roots {
        if let Some(found) = find_in(root, id) {
            return Some(found);
        }
    }
    None
}

fn find_in<'a>(task: &'a Task, id: &str) -> Option<&'a Task> {
    if task.id() == id {
        return Some(task);
    }
    task.subtasks().iter().find_map(|child| find_in(child, id))
}

/// Mutable counterpart of [`find_task`].
pub fn find_task_mut<'a>(roots: &'a mut [Task], id: &str) -> Option<&'a mut Task> {
    roots.iter_mut().find_map(|root| find_in_mut(root, id))
}

fn find_in_mut<'a>(task: &'a mut Task, id: &str) -> Option<&'a mut Task> {
    if task.id() == id {
        return Some(task);
    }
    task.subtasks_mut()
        .iter_mut()
        .find_map(|child| find_in_mut(child, id))
}

/// Every task with `status`, in depth-first forest order.
pub fn collect_by_status(roots: &[Task], status: TaskStatus) -> Vec<&Task> {
    let mut out = Vec::new();
    for root in roots {
        if root.status() == status {
            out.push(root);
        }
        out.extend(
            root.all_subtasks()
                .into_iter()
                .filter(|task| task.status() == status),
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forest() -> Vec<Task> {
        let mut first = Task::new("first");
        let a = first.add_subtask("a").expect("add");
        a.add_subtask("a1").expect("add");
        first.add_subtask("b").expect("add");
        vec![first, Task::new("second")]
    }

    #[test]
    fn finds_nested_tasks() {
        let roots = forest();
        let nested_id = roots[0].subtasks()[0].subtasks()[0].id().to_string();
        let found = find_task(&roots, &nested_id).expect("nested task");
        assert_eq!(found.description(), "a1");
        assert!(find_task(&roots, "missing").is_none());
    }

    #[test]
    fn mutable_lookup_reaches_second_root() {
        let mut roots = forest();
        let id = roots[1].id().to_string();
        let task = find_task_mut(&mut roots, &id).expect("root");
        task.set_status(TaskStatus::InProgress).expect("start");
        assert_eq!(roots[1].status(), TaskStatus::InProgress);
    }

    #[test]
    fn collects_in_depth_first_order() {
        let roots = forest();
        let pending: Vec<&str> = collect_by_status(&roots, TaskStatus::Pending)
            .iter()
            .map(|task| task.description())
            .collect();
        assert_eq!(pending, vec!["first", "a", "a1", "b", "second"]);
    }
}
