//! Vendor tool-definition shapes.
//!
//! Adapters read only a tool's name, description and parameter schema.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::tools::Tool;

/// Chat vendor whose tool-definition format a backend expects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    OpenAi,
    Anthropic,
    /// Accepts no tool definitions.
    XAi,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
            Provider::XAi => "xai",
        }
    }

    pub fn supports_tools(self) -> bool {
        !matches!(self, Provider::XAi)
    }

    /// Definition of `tool` for this provider, `None` if tools are unsupported.
    pub fn definition(self, tool: &Tool) -> Option<Value> {
        match self {
            Provider::OpenAi => Some(to_openai_format(tool)),
            Provider::Anthropic => Some(to_anthropic_format(tool)),
            Provider::XAi => None,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "anthropic" => Ok(Provider::Anthropic),
            "xai" => Ok(Provider::XAi),
            other => Err(format!(
                "unknown provider '{other}' (expected openai, anthropic or xai)"
            )),
        }
    }
}

/// `{"type": "function", "function": {name, description, parameters}}`
pub fn to_openai_format(tool: &Tool) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name(),
            "description": tool.description(),
            "parameters": tool.parameter_schema(),
        }
    })
}

/// `{name, description, input_schema}`
pub fn to_anthropic_format(tool: &Tool) -> Value {
    json!({
        "name": tool.name(),
        "description": tool.description(),
        "input_schema": tool.parameter_schema(),
    })
}
