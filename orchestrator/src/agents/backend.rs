//! Chat backends: the request/response boundary to a language model.
//!
//! The [`ChatBackend`] trait decouples agents from the model that answers
//! them. [`CommandBackend`] runs a configured local command per turn; tests use
//! scripted backends that return predetermined replies.

use std::process::Command;

use anyhow::{Context, Result, anyhow, bail};
use jsonschema::validator_for;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::agents::memory::Message;
use crate::io::config::{BackendConfig, BackendMode};
use crate::io::process::run_command_with_timeout;
use crate::tools::ToolCall;
use crate::tools::provider::Provider;

const CHAT_RESPONSE_SCHEMA: &str = include_str!("schemas/chat_response.schema.json");

/// One model reply: text plus any tool calls it requested.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

impl ChatResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }
}

/// Abstraction over chat model backends.
pub trait ChatBackend {
    /// Answer the transcript `messages`. `tools` holds tool definitions in
    /// [`ChatBackend::provider`]'s format and is empty when tools are not offered.
    fn chat(&mut self, messages: &[Message], tools: &[Value]) -> Result<ChatResponse>;

    fn supports_tools(&self) -> bool;

    /// Format expected for tool definitions.
    fn provider(&self) -> Provider {
        Provider::OpenAi
    }
}

/// Backend that runs a local command for every turn.
///
/// In `text` mode the rendered transcript goes to stdin and stdout is the
/// reply. In `json` mode stdin carries `{"messages": [...], "tools": [...]}`
/// and stdout must be a JSON chat response, which may request tool calls.
#[derive(Debug, Clone)]
pub struct CommandBackend {
    config: BackendConfig,
}

impl CommandBackend {
    pub fn new(config: BackendConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }
}

impl ChatBackend for CommandBackend {
    #[instrument(skip_all, fields(mode = ?self.config.mode, messages = messages.len(), tools = tools.len()))]
    fn chat(&mut self, messages: &[Message], tools: &[Value]) -> Result<ChatResponse> {
        let (program, args) = self
            .config
            .command
            .split_first()
            .ok_or_else(|| anyhow!("backend.command is empty"))?;
        let mut cmd = Command::new(program);
        cmd.args(args);

        let input = match self.config.mode {
            BackendMode::Text => render_transcript(messages).into_bytes(),
            BackendMode::Json => serde_json::to_vec(&json!({
                "messages": messages,
                "tools": tools,
            }))
            .context("serialize chat request")?,
        };

        info!(program = %program, "running chat command");
        let output = run_command_with_timeout(cmd, Some(&input), self.config.limits())
            .with_context(|| format!("run chat command {program}"))?;
        if output.timed_out {
            bail!(
                "chat command {program} timed out after {}s",
                self.config.timeout_secs
            );
        }
        if !output.status.success() {
            warn!(exit_code = ?output.status.code(), "chat command failed");
            bail!(
                "chat command {program} failed with status {:?}: {}",
                output.status.code(),
                output.stderr_text().trim()
            );
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        match self.config.mode {
            BackendMode::Text => Ok(ChatResponse::text(stdout.trim())),
            BackendMode::Json => parse_json_reply(&stdout),
        }
    }

    fn supports_tools(&self) -> bool {
        self.config.mode == BackendMode::Json && self.config.provider.supports_tools()
    }

    fn provider(&self) -> Provider {
        self.config.provider
    }
}

/// `role: content` blocks separated by blank lines.
pub fn render_transcript(messages: &[Message]) -> String {
    let mut out = String::new();
    for message in messages {
        out.push_str(message.role.as_str());
        out.push_str(": ");
        out.push_str(message.content.trim());
        out.push_str("\n\n");
    }
    out.push_str("assistant:");
    out
}

#[derive(Debug, Deserialize)]
struct RawReply {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Vec<RawToolCall>,
}

#[derive(Debug, Deserialize)]
struct RawToolCall {
    id: Option<String>,
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// Parse and schema-check a JSON reply from a `json`-mode command.
pub fn parse_json_reply(stdout: &str) -> Result<ChatResponse> {
    let value: Value = serde_json::from_str(stdout.trim()).context("parse chat reply json")?;
    let schema: Value =
        serde_json::from_str(CHAT_RESPONSE_SCHEMA).context("parse chat response schema")?;
    let compiled = validator_for(&schema).map_err(|err| anyhow!("invalid schema: {}", err))?;
    if !compiled.is_valid(&value) {
        let messages = compiled
            .iter_errors(&value)
            .map(|err| err.to_string())
            .collect::<Vec<_>>();
        return Err(anyhow!(
            "chat reply schema validation failed: {}",
            messages.join("; ")
        ));
    }

    let raw: RawReply = serde_json::from_value(value).context("deserialize chat reply")?;
    let mut tool_calls = Vec::with_capacity(raw.tool_calls.len());
    for call in raw.tool_calls {
        let id = call
            .id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let parsed = match call.arguments {
            Value::String(encoded) => ToolCall::from_json_arguments(id, call.name, &encoded)?,
            Value::Null => ToolCall {
                id,
                name: call.name,
                arguments: json!({}),
            },
            arguments => ToolCall {
                id,
                name: call.name,
                arguments,
            },
        };
        tool_calls.push(parsed);
    }

    debug!(tool_calls = tool_calls.len(), "parsed chat reply");
    Ok(ChatResponse {
        content: raw.content,
        tool_calls,
    })
}
