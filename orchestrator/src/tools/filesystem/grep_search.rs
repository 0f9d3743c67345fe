use std::fs;

use anyhow::{Result, anyhow};
use glob::{MatchOptions, Pattern};
use regex::RegexBuilder;
use serde_json::Value;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::tools::args::{optional_bool, optional_limit, optional_str, required_str};
use crate::tools::filesystem::ensure_relative_pattern;
use crate::tools::filesystem::path::{base_dir, scope_root};
use crate::tools::{ParamType, ParameterSchema, ParameterSpec, Tool, ToolExecutionContext};

pub const NAME: &str = "filesys.grep_search";

const DEFAULT_INCLUDE: &str = "**/*";
const DEFAULT_MAX_RESULTS: usize = 20;
const MAX_MATCHES_PER_FILE: usize = 10;
const MAX_LINE_CHARS: usize = 100;

pub fn tool() -> Tool {
    Tool::new(
        NAME,
        "Search file contents for text or a regular expression, case-insensitively. \
         Results list file paths, line numbers and matching lines.",
        ParameterSchema::new()
            .param(ParameterSpec::required(
                "query",
                ParamType::String,
                "Text or regular expression to search for",
            ))
            .param(
                ParameterSpec::optional(
                    "include_pattern",
                    ParamType::String,
                    "Glob pattern selecting the files to search",
                )
                .default_value(Value::from(DEFAULT_INCLUDE)),
            )
            .param(
                ParameterSpec::optional(
                    "is_regexp",
                    ParamType::Boolean,
                    "Treat the query as a regular expression",
                )
                .default_value(Value::Bool(false)),
            )
            .param(
                ParameterSpec::optional(
                    "max_results",
                    ParamType::Integer,
                    "Maximum number of result lines to return",
                )
                .default_value(Value::from(DEFAULT_MAX_RESULTS)),
            ),
        run,
    )
}

fn run(context: &ToolExecutionContext, args: &Value) -> Result<Value> {
    let query = required_str(args, "query")?;
    let include = optional_str(args, "include_pattern")?.unwrap_or(DEFAULT_INCLUDE);
    let is_regexp = optional_bool(args, "is_regexp", false)?;
    let max_results = optional_limit(args, "max_results", DEFAULT_MAX_RESULTS)?;

    let root = scope_root(context)?;
    if root.is_some() {
        ensure_relative_pattern(include, "include pattern")?;
    }
    let search_dir = match root {
        Some(root) => root,
        None => base_dir(context)?,
    };

    let include_pattern =
        Pattern::new(include).map_err(|err| anyhow!("invalid include pattern '{include}': {err}"))?;
    let source = if is_regexp {
        query.to_string()
    } else {
        regex::escape(query)
    };
    let regex = RegexBuilder::new(&source)
        .case_insensitive(true)
        .build()
        .map_err(|err| anyhow!("invalid regular expression '{query}': {err}"))?;
    let options = MatchOptions {
        require_literal_separator: true,
        ..MatchOptions::default()
    };

    info!(query, include, dir = %search_dir.display(), "searching file contents");

    let mut files_seen = 0usize;
    let mut lines: Vec<String> = Vec::new();
    let mut total_matches = 0usize;
    for entry in WalkDir::new(&search_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
    {
        let Ok(relative) = entry.path().strip_prefix(&search_dir) else {
            continue;
        };
        if !include_pattern.matches_path_with(relative, options) {
            continue;
        }
        files_seen += 1;

        let bytes = match fs::read(entry.path()) {
            Ok(bytes) => bytes,
            Err(err) => {
                debug!(path = %entry.path().display(), err = %err, "skipping unreadable file");
                continue;
            }
        };
        let content = String::from_utf8_lossy(&bytes);

        let mut hits = Vec::new();
        for (index, line) in content.lines().enumerate() {
            if regex.is_match(line) {
                hits.push((index + 1, truncate_line(line.trim())));
                total_matches += 1;
                if hits.len() >= MAX_MATCHES_PER_FILE {
                    break;
                }
            }
        }
        if hits.is_empty() {
            continue;
        }

        lines.push(format!("File: {}", relative.display()));
        lines.extend(hits.into_iter().map(|(n, text)| format!("  {n}: {text}")));
        lines.push(String::new());
        if lines.len() >= max_results * 2 {
            break;
        }
    }

    if files_seen == 0 {
        return Ok(Value::String(format!(
            "No files found matching pattern: {include}"
        )));
    }
    if lines.is_empty() {
        return Ok(Value::String(format!(
            "No matches found for '{query}' in files matching '{include}'"
        )));
    }

    let header = if total_matches > max_results {
        lines.truncate(max_results);
        format!("Found {total_matches} matches (showing first {max_results}):")
    } else {
        format!("Found {total_matches} matches:")
    };
    let body = lines.join("\n");
    Ok(Value::String(format!("{header}\n{}", body.trim_end())))
}

fn truncate_line(line: &str) -> String {
    if line.chars().count() <= MAX_LINE_CHARS {
        return line.to_string();
    }
    let kept: String = line.chars().take(MAX_LINE_CHARS - 3).collect();
    format!("{kept}...")
}
