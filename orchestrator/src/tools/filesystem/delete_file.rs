use std::fs;

use anyhow::{Context, Result, bail};
use serde_json::Value;
use tracing::info;

use crate::tools::args::required_str;
use crate::tools::filesystem::path::resolve_scoped_path;
use crate::tools::{ParamType, ParameterSchema, ParameterSpec, Tool, ToolExecutionContext};

pub const NAME: &str = "filesys.delete_file";

pub fn tool() -> Tool {
    Tool::new(
        NAME,
        "Delete a file. Directories are refused. Paths are restricted to the allowed directory when one is set.",
        ParameterSchema::new().param(ParameterSpec::required(
            "file_path",
            ParamType::String,
            "Path to the file to delete",
        )),
        run,
    )
}

fn run(context: &ToolExecutionContext, args: &Value) -> Result<Value> {
    let file_path = required_str(args, "file_path")?;
    let path = resolve_scoped_path(context, file_path)?;
    if !path.exists() {
        bail!("file {file_path} does not exist");
    }
    if path.is_dir() {
        bail!("{file_path} is a directory, not a file");
    }

    info!(path = %path.display(), "deleting file");
    fs::remove_file(&path).with_context(|| format!("delete {}", path.display()))?;
    Ok(Value::String(format!("Successfully deleted {file_path}")))
}
