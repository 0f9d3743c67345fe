//! Tool catalog and dispatch.
//!
//! Every side effect an agent performs goes through
//! [`ToolRegistry::execute_tool`], which enforces the context's operation
//! budget and turns tool failures into structured [`ToolOutcome`] values.
//!
//! A registry is an explicit value: build one at startup with
//! [`builtin_registry`] (or [`ToolRegistry::new`] plus
//! [`ToolRegistry::register_tool`]) and pass it by reference. Agents receive a
//! [`ToolRegistry::subset`] holding only the tools they were granted.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::error::ToolError;

pub mod args;
pub mod context;
pub mod filesystem;
pub mod provider;
pub mod schema;
pub mod terminal;

pub use context::{SecurityLevel, ToolExecutionContext};
pub use provider::Provider;
pub use schema::{ParamType, ParameterSchema, ParameterSpec};

/// Signature of a tool implementation: settings in, JSON arguments in, value out.
pub type ToolFunction = dyn Fn(&ToolExecutionContext, &Value) -> anyhow::Result<Value> + Send + Sync;

/// A named, described capability with declared parameters.
#[derive(Clone)]
pub struct Tool {
    name: String,
    description: String,
    parameters: ParameterSchema,
    function: Arc<ToolFunction>,
}

impl Tool {
    pub fn new<F>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ParameterSchema,
        function: F,
    ) -> Self
    where
        F: Fn(&ToolExecutionContext, &Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            function: Arc::new(function),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn parameters(&self) -> &ParameterSchema {
        &self.parameters
    }

    /// The declared parameters rendered as a JSON Schema object.
    pub fn parameter_schema(&self) -> Value {
        self.parameters.to_json_schema()
    }
}

impl fmt::Debug for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

/// A request to invoke one tool, as produced by a chat backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            arguments,
        }
    }

    /// Build a call from a JSON-encoded argument string.
    ///
    /// A blank string means "no arguments".
    pub fn from_json_arguments(
        id: impl Into<String>,
        name: impl Into<String>,
        raw: &str,
    ) -> Result<Self, ToolError> {
        let name = name.into();
        let arguments = if raw.trim().is_empty() {
            Value::Object(serde_json::Map::new())
        } else {
            serde_json::from_str(raw).map_err(|err| ToolError::InvalidArguments {
                tool: name.clone(),
                message: err.to_string(),
            })?
        };
        Ok(Self {
            id: id.into(),
            name,
            arguments,
        })
    }
}

/// Normalized result of a dispatched tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutcome {
    Success {
        tool: String,
        arguments: Value,
        output: Value,
    },
    Error {
        tool: String,
        arguments: Value,
        message: String,
    },
}

impl ToolOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutcome::Success { .. })
    }

    pub fn tool(&self) -> &str {
        match self {
            ToolOutcome::Success { tool, .. } | ToolOutcome::Error { tool, .. } => tool,
        }
    }

    pub fn output(&self) -> Option<&Value> {
        match self {
            ToolOutcome::Success { output, .. } => Some(output),
            ToolOutcome::Error { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            ToolOutcome::Success { .. } => None,
            ToolOutcome::Error { message, .. } => Some(message),
        }
    }

    /// The tool output, or the captured failure as [`ToolError::Execution`].
    pub fn into_result(self) -> Result<Value, ToolError> {
        match self {
            ToolOutcome::Success { output, .. } => Ok(output),
            ToolOutcome::Error { tool, message, .. } => Err(ToolError::Execution { tool, message }),
        }
    }
}

/// Catalog of tools keyed by name, iterated in registration order.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Tool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `tool`, replacing any tool of the same name in its original slot.
    pub fn register_tool(&mut self, tool: Tool) -> Result<(), ToolError> {
        tool.parameters
            .validate()
            .map_err(|message| ToolError::InvalidSchema {
                tool: tool.name.clone(),
                message,
            })?;

        match self.index.get(&tool.name) {
            Some(&slot) => {
                debug!(tool = %tool.name, "replacing registered tool");
                self.tools[slot] = tool;
            }
            None => {
                debug!(tool = %tool.name, "registering tool");
                self.index.insert(tool.name.clone(), self.tools.len());
                self.tools.push(tool);
            }
        }
        Ok(())
    }

    pub fn get_tool(&self, name: &str) -> Option<&Tool> {
        self.index.get(name).map(|&slot| &self.tools[slot])
    }

    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(Tool::name).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Tools whose names appear in `names`, in registration order.
    ///
    /// Unknown names are skipped.
    pub fn get_tools_for_names<S: AsRef<str>>(&self, names: &[S]) -> Vec<&Tool> {
        self.tools
            .iter()
            .filter(|tool| names.iter().any(|name| name.as_ref() == tool.name))
            .collect()
    }

    /// A new registry holding only the tools named in `names`.
    pub fn subset<S: AsRef<str>>(&self, names: &[S]) -> ToolRegistry {
        let mut subset = ToolRegistry::new();
        for tool in self.get_tools_for_names(names) {
            subset.index.insert(tool.name.clone(), subset.tools.len());
            subset.tools.push(tool.clone());
        }
        subset
    }

    /// Tool definitions in `provider`'s wire shape, in registration order.
    pub fn definitions_for(&self, provider: Provider) -> Vec<Value> {
        self.tools
            .iter()
            .filter_map(|tool| provider.definition(tool))
            .collect()
    }

    /// Dispatch `call` within `context`.
    ///
    /// Fails only when the tool is unknown, the context's budget is spent or
    /// its settings are malformed; the tool function is not invoked in those
    /// cases. Anything the tool function itself raises comes back as
    /// [`ToolOutcome::Error`]. Every invocation, failed or not, consumes one
    /// operation.
    #[instrument(skip_all, fields(tool = %call.name, call_id = %call.id))]
    pub fn execute_tool(
        &self,
        call: &ToolCall,
        context: &mut ToolExecutionContext,
    ) -> Result<ToolOutcome, ToolError> {
        let tool = self
            .get_tool(&call.name)
            .ok_or_else(|| ToolError::NotFound(call.name.clone()))?;

        if let Some(limit) = context.budget_exhausted()? {
            warn!(used = context.operation_count(), limit, "operation budget spent");
            return Err(ToolError::OperationLimitExceeded {
                used: context.operation_count(),
                limit,
            });
        }

        let result = (tool.function)(context, &call.arguments);
        context.record_operation();

        match result {
            Ok(output) => {
                debug!(operations = context.operation_count(), "tool call succeeded");
                Ok(ToolOutcome::Success {
                    tool: tool.name.clone(),
                    arguments: call.arguments.clone(),
                    output,
                })
            }
            Err(err) => {
                let message = format!("{err:#}");
                warn!(err = %message, operations = context.operation_count(), "tool call failed");
                Ok(ToolOutcome::Error {
                    tool: tool.name.clone(),
                    arguments: call.arguments.clone(),
                    message,
                })
            }
        }
    }
}

/// A registry holding every built-in tool.
pub fn builtin_registry() -> Result<ToolRegistry, ToolError> {
    let mut registry = ToolRegistry::new();
    filesystem::register(&mut registry)?;
    terminal::register(&mut registry)?;
    Ok(registry)
}
