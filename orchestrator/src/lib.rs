//! Hierarchical task orchestration for tool-using agents.
//!
//! A task is split into an ordered tree of subtasks, executed depth-first one
//! step at a time, and every side effect an agent performs goes through a
//! registry of tools that enforces per-invocation budgets and path scoping.
//!
//! - **[`core`]**: The task tree, its status state machine and structural
//!   invariants. No I/O.
//! - **[`manager`]**: Ownership of the task forest and sequential execution.
//! - **[`tools`]**: Tool catalog, execution context and the built-in
//!   filesystem and terminal tools.
//! - **[`agents`]**: The [`agents::Agent`] boundary and a chat agent backed by
//!   a local command.
//! - **[`io`]**: Config files and child-process execution.

pub mod agents;
pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod manager;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod tools;
