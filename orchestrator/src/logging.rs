//! Diagnostic tracing for the orchestrator.
//!
//! Diagnostics go to stderr and are filtered with `RUST_LOG`. Command results
//! are printed to stdout by the CLI and are never affected by the filter.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber.
///
/// Reads `RUST_LOG`, defaulting to `warn`. Output is compact and goes to
/// stderr.
///
/// ```bash
/// RUST_LOG=orchestrator=debug orchestrator run "summarize README.md"
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
