//! Side-effecting helpers: configuration files and child processes.

pub mod config;
pub mod process;
