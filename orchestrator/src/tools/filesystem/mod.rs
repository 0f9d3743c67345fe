//! Filesystem tools scoped by the context's allowed root.

use crate::error::ToolError;
use crate::tools::ToolRegistry;

pub mod delete_file;
pub mod file_search;
pub mod grep_search;
pub mod path;
pub mod read_file;
pub mod replace_in_file;
pub mod write_file;

pub use path::resolve_scoped_path;

/// Register every filesystem tool, in a stable order.
pub fn register(registry: &mut ToolRegistry) -> Result<(), ToolError> {
    registry.register_tool(read_file::tool())?;
    registry.register_tool(write_file::tool())?;
    registry.register_tool(replace_in_file::tool())?;
    registry.register_tool(delete_file::tool())?;
    registry.register_tool(file_search::tool())?;
    registry.register_tool(grep_search::tool())?;
    Ok(())
}

/// Reject glob patterns that could leave the search root.
pub(crate) fn ensure_relative_pattern(pattern: &str, label: &str) -> anyhow::Result<()> {
    if pattern.contains("..") || pattern.starts_with('/') || pattern.starts_with('\\') {
        anyhow::bail!("{label} cannot contain '..' or be absolute when an allowed root is set");
    }
    Ok(())
}
