//! Stable exit codes for orchestrator CLI commands.

/// Command succeeded; any executed task tree completed.
pub const OK: i32 = 0;
/// Invalid config, backend failure, contract violation or other error.
pub const ERROR: i32 = 1;
/// The executed task tree ended `failed`.
pub const TASK_FAILED: i32 = 2;
