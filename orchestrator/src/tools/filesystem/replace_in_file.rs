use std::fs;

use anyhow::{Context, Result, bail};
use serde_json::Value;
use tracing::info;

use crate::tools::args::{optional_i64, required_str};
use crate::tools::filesystem::path::resolve_scoped_path;
use crate::tools::{ParamType, ParameterSchema, ParameterSpec, Tool, ToolExecutionContext};

pub const NAME: &str = "filesys.replace_in_file";

pub fn tool() -> Tool {
    Tool::new(
        NAME,
        "Replace text in a file. Paths are restricted to the allowed directory when one is set.",
        ParameterSchema::new()
            .param(ParameterSpec::required(
                "file_path",
                ParamType::String,
                "Path to the file to modify",
            ))
            .param(ParameterSpec::required(
                "old_text",
                ParamType::String,
                "Text to search for",
            ))
            .param(ParameterSpec::required(
                "new_text",
                ParamType::String,
                "Replacement text",
            ))
            .param(
                ParameterSpec::optional(
                    "count",
                    ParamType::Integer,
                    "Maximum number of replacements, -1 for all",
                )
                .default_value(Value::from(-1)),
            ),
        run,
    )
}

fn run(context: &ToolExecutionContext, args: &Value) -> Result<Value> {
    let file_path = required_str(args, "file_path")?;
    let old_text = required_str(args, "old_text")?;
    let new_text = required_str(args, "new_text")?;
    let count = optional_i64(args, "count", -1)?;
    if old_text.is_empty() {
        bail!("old_text must be non-empty");
    }

    let path = resolve_scoped_path(context, file_path)?;
    if !path.is_file() {
        bail!("file {file_path} does not exist or is not a file");
    }
    let content =
        fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;

    let found = content.matches(old_text).count();
    let (updated, replaced) = if count < 0 {
        (content.replace(old_text, new_text), found)
    } else {
        let limit = count as usize;
        (content.replacen(old_text, new_text, limit), found.min(limit))
    };

    info!(path = %path.display(), replaced, "replacing text in file");
    fs::write(&path, updated).with_context(|| format!("write {}", path.display()))?;
    Ok(Value::String(format!(
        "Successfully replaced {replaced} occurrence(s) of '{old_text}' with '{new_text}' in {file_path}"
    )))
}
