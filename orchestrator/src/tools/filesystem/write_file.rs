use std::fs;

use anyhow::{Context, Result, bail};
use serde_json::Value;
use tracing::info;

use crate::tools::args::{optional_bool, required_str};
use crate::tools::filesystem::path::resolve_scoped_path;
use crate::tools::{ParamType, ParameterSchema, ParameterSpec, Tool, ToolExecutionContext};

pub const NAME: &str = "filesys.write_file";

pub fn tool() -> Tool {
    Tool::new(
        NAME,
        "Write content to a file, replacing it if it exists. Paths are restricted to the allowed directory when one is set.",
        ParameterSchema::new()
            .param(ParameterSpec::required(
                "file_path",
                ParamType::String,
                "Path to the file to write",
            ))
            .param(ParameterSpec::required(
                "content",
                ParamType::String,
                "Content to write",
            ))
            .param(
                ParameterSpec::optional(
                    "create_dirs",
                    ParamType::Boolean,
                    "Create missing parent directories",
                )
                .default_value(Value::Bool(true)),
            ),
        run,
    )
}

fn run(context: &ToolExecutionContext, args: &Value) -> Result<Value> {
    let file_path = required_str(args, "file_path")?;
    let content = required_str(args, "content")?;
    let create_dirs = optional_bool(args, "create_dirs", true)?;

    let path = resolve_scoped_path(context, file_path)?;
    if path.is_dir() {
        bail!("{file_path} is a directory");
    }
    if let Some(parent) = path.parent()
        && !parent.exists()
    {
        if !create_dirs {
            bail!("parent directory of {file_path} does not exist");
        }
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }

    info!(path = %path.display(), bytes = content.len(), "writing file");
    fs::write(&path, content).with_context(|| format!("write {}", path.display()))?;
    Ok(Value::String(format!(
        "Successfully wrote {} characters to {}",
        content.chars().count(),
        file_path
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::context::WORKINGDIR;
    use serde_json::json;

    #[test]
    fn creates_parent_directories_by_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let ctx = ToolExecutionContext::with_settings([(
            WORKINGDIR,
            temp.path().display().to_string(),
        )]);

        run(&ctx, &json!({"file_path": "a/b/c.txt", "content": "x"})).expect("write");
        let written = fs::read_to_string(temp.path().join("a/b/c.txt")).expect("read back");
        assert_eq!(written, "x");
    }

    #[test]
    fn missing_parent_without_create_dirs_fails() {
        let temp = tempfile::tempdir().expect("tempdir");
        let ctx = ToolExecutionContext::with_settings([(
            WORKINGDIR,
            temp.path().display().to_string(),
        )]);

        let err = run(
            &ctx,
            &json!({"file_path": "a/c.txt", "content": "x", "create_dirs": false}),
        )
        .expect_err("no parent");
        assert!(err.to_string().contains("does not exist"));
        assert!(!temp.path().join("a").exists());
    }
}
