//! `terminal.run_command`: shell commands confined to the working directory.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{Result, bail};
use serde_json::Value;
use tracing::info;

use crate::error::ToolError;
use crate::io::process::{ProcessLimits, run_command_with_timeout};
use crate::tools::args::{optional_str, required_str};
use crate::tools::context::SecurityLevel;
use crate::tools::filesystem::path::{base_dir, scope_root};
use crate::tools::{ParamType, ParameterSchema, ParameterSpec, Tool, ToolExecutionContext, ToolRegistry};

pub const NAME: &str = "terminal.run_command";

const LIMITS: ProcessLimits = ProcessLimits {
    timeout: Duration::from_secs(30),
    output_limit_bytes: 100_000,
};

#[cfg(windows)]
const DEFAULT_SHELL: &str = "pwsh.exe";
#[cfg(not(windows))]
const DEFAULT_SHELL: &str = "sh";

pub fn register(registry: &mut ToolRegistry) -> Result<(), ToolError> {
    registry.register_tool(tool())
}

pub fn tool() -> Tool {
    Tool::new(
        NAME,
        "Run a shell command with the context's workingdir as its working directory. \
         Commands time out after 30 seconds.",
        ParameterSchema::new()
            .param(ParameterSpec::required(
                "command",
                ParamType::String,
                "The command to execute",
            ))
            .param(
                ParameterSpec::optional("shell", ParamType::String, "Shell used to run the command")
                    .default_value(Value::from(DEFAULT_SHELL)),
            ),
        run,
    )
}

fn run(context: &ToolExecutionContext, args: &Value) -> Result<Value> {
    let command = required_str(args, "command")?;
    let shell = optional_str(args, "shell")?.unwrap_or(DEFAULT_SHELL);
    let workdir = command_dir(context)?;

    info!(workdir = %workdir.display(), command, "running command");
    let output = run_command_with_timeout(shell_command(shell, command, &workdir), None, LIMITS)?;
    if output.timed_out {
        bail!(
            "command timed out after {} seconds",
            LIMITS.timeout.as_secs()
        );
    }

    let mut text = output.stdout_text();
    let stderr = output.stderr_text();
    if !stderr.is_empty() {
        text.push_str("\nSTDERR:\n");
        text.push_str(&stderr);
    }
    if !output.status.success() {
        let code = output
            .status
            .code()
            .map_or_else(|| "signal".to_string(), |c| c.to_string());
        text = format!("Command failed with return code {code}\n{text}");
    }
    Ok(Value::String(text))
}

/// Directory the command runs in.
///
/// `workingdir` is required unless the context is permissive, and must lie
/// inside `allowed_base_path` when both are set.
fn command_dir(context: &ToolExecutionContext) -> Result<PathBuf> {
    let level = context.security_level()?;
    if context.working_dir().is_none() {
        if level == SecurityLevel::Permissive {
            return base_dir(context);
        }
        bail!("no workingdir set in context; terminal commands require a working directory");
    }

    let dir = base_dir(context)?;
    if !dir.is_dir() {
        bail!("working directory {} does not exist or is not a directory", dir.display());
    }
    if let Some(root) = scope_root(context)?
        && !dir.starts_with(&root)
    {
        return Err(ToolError::PathOutsideRoot {
            path: dir.display().to_string(),
            root: root.display().to_string(),
        }
        .into());
    }
    Ok(dir)
}

fn shell_command(shell: &str, command: &str, workdir: &Path) -> Command {
    let program = Path::new(shell)
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    let flag = match program.as_str() {
        "cmd" => "/C",
        "pwsh" | "powershell" => "-Command",
        _ => "-c",
    };
    let mut cmd = Command::new(shell);
    cmd.arg(flag).arg(command).current_dir(workdir);
    cmd
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::tools::context::{ALLOWED_BASE_PATH, SECURITY_LEVEL, WORKINGDIR};
    use serde_json::json;

    fn ctx_for(dir: &Path) -> ToolExecutionContext {
        ToolExecutionContext::with_settings([(WORKINGDIR, dir.display().to_string())])
    }

    #[test]
    fn runs_inside_the_workingdir() {
        let temp = tempfile::tempdir().expect("tempdir");
        std::fs::write(temp.path().join("marker.txt"), "").expect("seed");
        let out = run(&ctx_for(temp.path()), &json!({"command": "ls"})).expect("run");
        assert!(out.as_str().expect("text").contains("marker.txt"));
    }

    #[test]
    fn nonzero_exit_is_reported_not_raised() {
        let temp = tempfile::tempdir().expect("tempdir");
        let out = run(
            &ctx_for(temp.path()),
            &json!({"command": "echo oops >&2; exit 3"}),
        )
        .expect("run");
        let text = out.as_str().expect("text");
        assert!(text.starts_with("Command failed with return code 3"));
        assert!(text.contains("STDERR:\noops"));
    }

    #[test]
    fn workingdir_is_required_unless_permissive() {
        let err = run(&ToolExecutionContext::default(), &json!({"command": "true"}))
            .expect_err("no workingdir");
        assert!(err.to_string().contains("no workingdir"));

        let permissive = ToolExecutionContext::with_settings([(SECURITY_LEVEL, "permissive")]);
        assert!(run(&permissive, &json!({"command": "true"})).is_ok());
    }

    #[test]
    fn workingdir_outside_base_path_is_denied() {
        let temp = tempfile::tempdir().expect("tempdir");
        let other = tempfile::tempdir().expect("other");
        let ctx = ToolExecutionContext::with_settings([
            (WORKINGDIR, other.path().display().to_string()),
            (ALLOWED_BASE_PATH, temp.path().display().to_string()),
        ]);
        let err = run(&ctx, &json!({"command": "true"})).expect_err("outside");
        assert!(err.to_string().contains("outside the allowed directory"));
    }
}
