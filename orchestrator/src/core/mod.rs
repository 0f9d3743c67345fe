//! Deterministic, pure logic for the task tree.
//!
//! Core modules are free of I/O side effects. They operate on in-memory task
//! trees and return deterministic outputs suitable for tests.

pub mod invariants;
pub mod selector;
pub mod status_validator;
pub mod task;
pub mod types;
