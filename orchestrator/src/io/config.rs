//! Agent configuration stored as TOML (default `orchestrator.toml`).

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::agents::memory::DEFAULT_MAX_MESSAGES;
use crate::io::process::ProcessLimits;
use crate::tools::ToolExecutionContext;
use crate::tools::provider::Provider;

/// Agent configuration (TOML).
///
/// Edited by humans. Missing fields fall back to defaults. Only tool names
/// cross this boundary; the tools themselves come from the registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgentConfig {
    pub name: String,
    pub description: String,
    pub system_prompt: String,

    /// Names of the registry tools this agent may call.
    pub tools: Vec<String>,

    /// Conversation memory bound.
    pub max_messages: usize,

    /// Settings copied into every tool execution context
    /// (`allowed_base_path`, `workingdir`, `max_operations`, `security_level`).
    pub context: BTreeMap<String, String>,

    pub backend: BackendConfig,
}

/// How the command backend exchanges messages with its child process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    /// Plain transcript on stdin, reply text on stdout. No tool calls.
    #[default]
    Text,
    /// `{"messages", "tools"}` JSON on stdin, a `ChatResponse` JSON object on stdout.
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BackendConfig {
    /// Program and arguments to run for each chat turn (e.g. `["ollama", "run", "llama3.2"]`).
    pub command: Vec<String>,
    pub mode: BackendMode,
    /// Tool-definition format sent in `json` mode.
    pub provider: Provider,
    pub timeout_secs: u64,
    /// Truncate backend stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            command: vec![
                "ollama".to_string(),
                "run".to_string(),
                "llama3.2".to_string(),
            ],
            mode: BackendMode::Text,
            provider: Provider::OpenAi,
            timeout_secs: 5 * 60,
            output_limit_bytes: 1_000_000,
        }
    }
}

impl BackendConfig {
    pub fn limits(&self) -> ProcessLimits {
        ProcessLimits {
            timeout: Duration::from_secs(self.timeout_secs),
            output_limit_bytes: self.output_limit_bytes,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.command.is_empty() || self.command[0].trim().is_empty() {
            return Err(anyhow!("backend.command must be a non-empty array"));
        }
        if self.timeout_secs == 0 {
            return Err(anyhow!("backend.timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("backend.output_limit_bytes must be > 0"));
        }
        Ok(())
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "assistant".to_string(),
            description: String::new(),
            system_prompt: "You are a helpful assistant.".to_string(),
            tools: Vec::new(),
            max_messages: DEFAULT_MAX_MESSAGES,
            context: BTreeMap::new(),
            backend: BackendConfig::default(),
        }
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_messages == 0 {
            return Err(anyhow!("max_messages must be > 0"));
        }
        if self.max_messages < 2 && !self.system_prompt.trim().is_empty() {
            return Err(anyhow!(
                "max_messages must be >= 2 when system_prompt is set (it takes one slot)"
            ));
        }
        if let Some(name) = self.tools.iter().find(|name| name.trim().is_empty()) {
            return Err(anyhow!("tools must not contain blank names (got {name:?})"));
        }
        let probe = ToolExecutionContext::new(self.context.clone(), "", "");
        probe.max_operations().context("context.max_operations")?;
        probe.security_level().context("context.security_level")?;
        self.backend.validate()
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `AgentConfig::default()`.
pub fn load_config(path: &Path) -> Result<AgentConfig> {
    if !path.exists() {
        let cfg = AgentConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: AgentConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &AgentConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, AgentConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("orchestrator.toml");
        let mut cfg = AgentConfig::default();
        cfg.tools = vec!["filesys.read_file".to_string()];
        cfg.context
            .insert("workingdir".to_string(), "/tmp/work".to_string());
        cfg.backend.mode = BackendMode::Json;
        cfg.backend.provider = Provider::Anthropic;

        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("orchestrator.toml");
        fs::write(
            &path,
            "name = \"coder\"\n[backend]\ncommand = [\"my-llm\"]\nmode = \"json\"\n",
        )
        .expect("seed");

        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.name, "coder");
        assert_eq!(cfg.backend.command, vec!["my-llm"]);
        assert_eq!(cfg.backend.mode, BackendMode::Json);
        assert_eq!(cfg.backend.timeout_secs, 300);
        assert_eq!(cfg.max_messages, DEFAULT_MAX_MESSAGES);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut cfg = AgentConfig::default();
        cfg.backend.command = Vec::new();
        assert!(cfg.validate().is_err());

        let mut cfg = AgentConfig::default();
        cfg.context
            .insert("max_operations".to_string(), "many".to_string());
        let err = cfg.validate().expect_err("bad max_operations");
        assert!(format!("{err:#}").contains("max_operations"));
    }

    #[test]
    fn single_message_memory_needs_an_empty_system_prompt() {
        let mut cfg = AgentConfig {
            max_messages: 1,
            ..AgentConfig::default()
        };
        let err = cfg.validate().expect_err("system prompt takes the only slot");
        assert!(err.to_string().contains("max_messages must be >= 2"));

        cfg.system_prompt = String::new();
        cfg.validate().expect("no system prompt");
    }
}
