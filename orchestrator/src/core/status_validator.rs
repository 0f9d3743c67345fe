//! Task status state machine checks.
//!
//! Validates a requested status change against
//! `pending -> in_progress -> {completed, failed}` and reports mutations that
//! are illegal for the task's current status.

use crate::core::types::TaskStatus;
use crate::error::TaskError;

/// Validate a single status transition for task `id`.
pub fn validate_transition(id: &str, from: TaskStatus, to: TaskStatus) -> Result<(), TaskError> {
    if from.can_transition_to(to) {
        return Ok(());
    }
    Err(TaskError::InvalidTransition {
        id: id.to_string(),
        from,
        to,
    })
}

/// Reject structural mutations (`action`) on a task that already finished.
pub fn ensure_not_terminal(
    id: &str,
    status: TaskStatus,
    action: &'static str,
) -> Result<(), TaskError> {
    if status.is_terminal() {
        return Err(TaskError::InvalidState {
            id: id.to_string(),
            status,
            action,
        });
    }
    Ok(())
}

/// Reject mutations (`action`) that are only allowed before a task starts.
pub fn ensure_pending(id: &str, status: TaskStatus, action: &'static str) -> Result<(), TaskError> {
    if status != TaskStatus::Pending {
        return Err(TaskError::InvalidState {
            id: id.to_string(),
            status,
            action,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_error_names_both_ends() {
        let err = validate_transition("t1", TaskStatus::Completed, TaskStatus::Pending)
            .expect_err("terminal state has no edges");
        assert_eq!(
            err.to_string(),
            "invalid transition for task 't1': completed -> pending"
        );
    }

    /// Skipping `in_progress` is rejected even though both ends look harmless.
    #[test]
    fn pending_cannot_complete_directly() {
        assert!(validate_transition("t1", TaskStatus::Pending, TaskStatus::Completed).is_err());
        assert!(validate_transition("t1", TaskStatus::Pending, TaskStatus::InProgress).is_ok());
    }

    #[test]
    fn terminal_tasks_reject_structural_changes() {
        let err = ensure_not_terminal("t1", TaskStatus::Failed, "add a subtask to")
            .expect_err("failed is terminal");
        assert_eq!(err.to_string(), "cannot add a subtask to task 't1' while it is failed");
        assert!(ensure_not_terminal("t1", TaskStatus::InProgress, "add a subtask to").is_ok());
    }

    #[test]
    fn pending_guard_rejects_started_tasks() {
        assert!(ensure_pending("t1", TaskStatus::Pending, "rebind").is_ok());
        assert!(ensure_pending("t1", TaskStatus::InProgress, "rebind").is_err());
    }
}
