use std::fs;

use anyhow::{Context, Result, bail};
use serde_json::Value;
use tracing::info;

use crate::tools::args::{optional_str, required_str};
use crate::tools::filesystem::path::resolve_scoped_path;
use crate::tools::{ParamType, ParameterSchema, ParameterSpec, Tool, ToolExecutionContext};

pub const NAME: &str = "filesys.read_file";

pub fn tool() -> Tool {
    Tool::new(
        NAME,
        "Read the contents of a file. Paths are restricted to the allowed directory when one is set.",
        ParameterSchema::new()
            .param(ParameterSpec::required(
                "file_path",
                ParamType::String,
                "Path to the file to read",
            ))
            .param(
                ParameterSpec::optional("encoding", ParamType::String, "File encoding")
                    .default_value(Value::from("utf-8")),
            ),
        run,
    )
}

fn run(context: &ToolExecutionContext, args: &Value) -> Result<Value> {
    let file_path = required_str(args, "file_path")?;
    let encoding = optional_str(args, "encoding")?.unwrap_or("utf-8");
    if !matches!(encoding.to_ascii_lowercase().as_str(), "utf-8" | "utf8") {
        bail!("unsupported encoding '{encoding}' (only utf-8 is supported)");
    }

    let path = resolve_scoped_path(context, file_path)?;
    info!(path = %path.display(), "reading file");
    if !path.exists() {
        bail!("file {file_path} does not exist");
    }
    if !path.is_file() {
        bail!("{file_path} is not a file");
    }
    let content =
        fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    Ok(Value::String(content))
}
