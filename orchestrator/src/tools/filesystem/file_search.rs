use std::path::PathBuf;

use anyhow::{Result, anyhow};
use glob::Pattern;
use serde_json::Value;
use tracing::info;

use crate::tools::args::{optional_limit, required_str};
use crate::tools::filesystem::ensure_relative_pattern;
use crate::tools::filesystem::path::{base_dir, scope_root};
use crate::tools::{ParamType, ParameterSchema, ParameterSpec, Tool, ToolExecutionContext};

pub const NAME: &str = "filesys.file_search";

const DEFAULT_MAX_RESULTS: usize = 20;

pub fn tool() -> Tool {
    Tool::new(
        NAME,
        "Search for files by glob pattern, matched from the root of the workspace. \
         Returns paths only. Examples: **/*.rs matches every Rust file, src/** matches \
         everything under src.",
        ParameterSchema::new()
            .param(ParameterSpec::required(
                "query",
                ParamType::String,
                "Glob pattern to match file paths against",
            ))
            .param(
                ParameterSpec::optional(
                    "max_results",
                    ParamType::Integer,
                    "Maximum number of results to return",
                )
                .default_value(Value::from(DEFAULT_MAX_RESULTS)),
            ),
        run,
    )
}

fn run(context: &ToolExecutionContext, args: &Value) -> Result<Value> {
    let query = required_str(args, "query")?;
    let max_results = optional_limit(args, "max_results", DEFAULT_MAX_RESULTS)?;

    let root = scope_root(context)?;
    if root.is_some() {
        ensure_relative_pattern(query, "search pattern")?;
    }
    let search_dir = match &root {
        Some(root) => root.clone(),
        None => base_dir(context)?,
    };
    info!(query, dir = %search_dir.display(), "searching files");

    let pattern = if PathBuf::from(query).is_absolute() {
        query.to_string()
    } else {
        format!(
            "{}/{}",
            Pattern::escape(&search_dir.display().to_string()),
            query
        )
    };
    let entries =
        glob::glob(&pattern).map_err(|err| anyhow!("invalid glob pattern '{query}': {err}"))?;

    let mut matches: Vec<String> = Vec::new();
    for path in entries.filter_map(Result::ok) {
        if !path.is_file() {
            continue;
        }
        match path.strip_prefix(&search_dir) {
            Ok(relative) => matches.push(relative.display().to_string()),
            Err(_) if root.is_some() => continue,
            Err(_) => matches.push(path.display().to_string()),
        }
    }

    if matches.is_empty() {
        return Ok(Value::String(format!(
            "No files found matching pattern: {query}"
        )));
    }

    matches.sort();
    let total = matches.len();
    let notice = if total > max_results {
        matches.truncate(max_results);
        format!(" (showing first {max_results} of {total} matches)")
    } else {
        String::new()
    };
    let listing: Vec<String> = matches.iter().map(|path| format!("  - {path}")).collect();
    Ok(Value::String(format!(
        "Found {} file(s) matching '{}':{}\n{}",
        matches.len(),
        query,
        notice,
        listing.join("\n")
    )))
}
