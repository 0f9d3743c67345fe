//! Chat-driven agent: conversation memory, tool dispatch and task planning.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::agents::Agent;
use crate::agents::backend::{ChatBackend, ChatResponse};
use crate::agents::decomposer::parse_subtask_list;
use crate::agents::memory::{Memory, Message};
use crate::agents::prompt::PromptEngine;
use crate::core::types::TaskResult;
use crate::error::DecompositionError;
use crate::io::config::AgentConfig;
use crate::manager::TaskManager;
use crate::tools::{ToolExecutionContext, ToolOutcome, ToolRegistry};

static YES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\W*yes\b").expect("yes regex is valid"));

/// An [`Agent`] that answers through a [`ChatBackend`].
pub struct ChatAgent {
    name: String,
    agent_id: String,
    session_id: String,
    backend: Box<dyn ChatBackend>,
    memory: Memory,
    tools: ToolRegistry,
    context_settings: BTreeMap<String, String>,
    prompts: PromptEngine,
}

impl ChatAgent {
    pub fn new(
        backend: Box<dyn ChatBackend>,
        system_prompt: &str,
        tools: ToolRegistry,
        context_settings: BTreeMap<String, String>,
    ) -> Result<Self> {
        let mut memory = Memory::default();
        if !system_prompt.trim().is_empty() {
            memory.set_system_prompt(system_prompt);
        }
        Ok(Self {
            name: "assistant".to_string(),
            agent_id: Uuid::new_v4().to_string(),
            session_id: String::new(),
            backend,
            memory,
            tools,
            context_settings,
            prompts: PromptEngine::new().context("load prompt templates")?,
        })
    }

    /// Build an agent from `config`, granted the tools it names from `registry`.
    pub fn from_config(
        config: &AgentConfig,
        registry: &ToolRegistry,
        backend: Box<dyn ChatBackend>,
    ) -> Result<Self> {
        config.validate()?;
        for name in &config.tools {
            if registry.get_tool(name).is_none() {
                warn!(tool = %name, "configured tool is not registered, skipping");
            }
        }
        let mut agent = Self::new(
            backend,
            &config.system_prompt,
            registry.subset(&config.tools),
            config.context.clone(),
        )?;
        agent.name = config.name.clone();
        agent.memory = Memory::new(config.max_messages);
        if !config.system_prompt.trim().is_empty() {
            agent.memory.set_system_prompt(&config.system_prompt);
        }
        Ok(agent)
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Fresh context for one invocation scope.
    pub fn new_context(&self) -> ToolExecutionContext {
        ToolExecutionContext::new(
            self.context_settings.clone(),
            self.agent_id.clone(),
            self.session_id.clone(),
        )
    }

    /// One conversational turn.
    ///
    /// When tools are granted and the backend accepts them, every requested
    /// tool call is dispatched within a single fresh context, recorded, and a
    /// final answer is requested.
    #[instrument(skip_all, fields(agent = %self.name))]
    pub fn chat(&mut self, message: &str) -> Result<String> {
        self.memory.push(Message::user(message));

        if self.tools.is_empty() || !self.backend.supports_tools() {
            let reply = self.ask(&[])?;
            return Ok(self.record_reply(reply));
        }

        let definitions = self.tools.definitions_for(self.backend.provider());
        let reply = self.ask(&definitions)?;
        if reply.tool_calls.is_empty() {
            return Ok(self.record_reply(reply));
        }

        let mut context = self.new_context();
        for call in &reply.tool_calls {
            let outcome = match self.tools.execute_tool(call, &mut context) {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!(tool = %call.name, err = %err, "tool call rejected");
                    ToolOutcome::Error {
                        tool: call.name.clone(),
                        arguments: call.arguments.clone(),
                        message: err.to_string(),
                    }
                }
            };
            let call_json = serde_json::to_string(call).context("serialize tool call")?;
            let outcome_json = serde_json::to_string(&outcome).context("serialize tool outcome")?;
            self.memory
                .push(Message::assistant(format!("Tool call: {call_json}")));
            self.memory.push(Message::tool(outcome_json));
        }
        debug!(
            calls = reply.tool_calls.len(),
            operations = context.operation_count(),
            "tool calls dispatched"
        );

        let final_reply = self.ask(&[])?;
        Ok(self.record_reply(final_reply))
    }

    /// Answer `query`, decomposing and executing it as a task tree when the
    /// backend judges it to need several steps.
    #[instrument(skip_all, fields(agent = %self.name))]
    pub fn handle_complex_query(&mut self, manager: &mut TaskManager, query: &str) -> Result<String> {
        let prompt = self.prompts.render_complexity(query)?;
        self.memory.push(Message::user(prompt));
        let verdict = self.ask(&[])?;
        let verdict = self.record_reply(verdict);

        if !YES_RE.is_match(&verdict) {
            info!("query handled as a single turn");
            return self.chat(query);
        }

        info!("query handled as a task tree");
        let task_id = manager.decompose_task(query, self)?.id().to_string();
        let reply = match manager.execute_task_sequentially(&task_id, self)? {
            TaskResult::Output(value) => format!("Complex task completed. Results: {value}"),
            TaskResult::Failure(failure) => format!(
                "Complex task failed at '{}': {}",
                failure.description, failure.message
            ),
        };
        self.memory.push(Message::assistant(reply.clone()));
        Ok(reply)
    }

    fn ask(&mut self, tools: &[Value]) -> Result<ChatResponse> {
        self.backend.chat(self.memory.messages(), tools)
    }

    fn record_reply(&mut self, reply: ChatResponse) -> String {
        self.memory.push(Message::assistant(reply.content.clone()));
        reply.content
    }
}

impl Agent for ChatAgent {
    #[instrument(skip_all, fields(agent = %self.name))]
    fn decompose(&mut self, description: &str) -> Result<Vec<String>, DecompositionError> {
        let prompt = self
            .prompts
            .render_decompose(description)
            .map_err(|err| DecompositionError::Backend(format!("{err:#}")))?;
        self.memory.push(Message::user(prompt));
        let reply = self
            .ask(&[])
            .map_err(|err| DecompositionError::Backend(format!("{err:#}")))?;
        let content = self.record_reply(reply);
        let subtasks = parse_subtask_list(&content)?;
        debug!(subtasks = subtasks.len(), "parsed decomposition");
        Ok(subtasks)
    }

    fn execute_default(&mut self, description: &str) -> Result<Value> {
        let prompt = self.prompts.render_step(description)?;
        Ok(Value::String(self.chat(&prompt)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::memory::Role;
    use crate::test_support::{ScriptedBackend, echo_tool};
    use serde_json::json;

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register_tool(echo_tool()).expect("register");
        registry
    }

    #[test]
    fn plain_chat_records_both_sides() {
        let backend = ScriptedBackend::new(vec![ChatResponse::text("hello!")]);
        let mut agent =
            ChatAgent::new(Box::new(backend), "be nice", ToolRegistry::new(), BTreeMap::new())
                .expect("agent");

        let reply = agent.chat("hi").expect("chat");
        assert_eq!(reply, "hello!");
        let roles: Vec<Role> = agent.memory().messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);
    }

    #[test]
    fn tool_calls_are_dispatched_then_answered() {
        let call = crate::tools::ToolCall::new("test.echo", json!({"text": "pong"}));
        let backend = ScriptedBackend::new(vec![
            ChatResponse {
                content: String::new(),
                tool_calls: vec![call],
            },
            ChatResponse::text("the tool said pong"),
        ]);
        let log = backend.log();
        let mut agent =
            ChatAgent::new(Box::new(backend), "", registry(), BTreeMap::new()).expect("agent");

        let reply = agent.chat("echo pong").expect("chat");
        assert_eq!(reply, "the tool said pong");

        let messages = agent.memory().messages();
        assert!(messages[1].content.starts_with("Tool call: "));
        assert_eq!(messages[2].role, Role::Tool);
        assert!(messages[2].content.contains("\"status\":\"success\""));

        let requests = log.borrow();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].tools, 1);
        assert_eq!(requests[1].tools, 0);
    }

    #[test]
    fn budget_is_per_turn() {
        let calls = vec![
            crate::tools::ToolCall::new("test.echo", json!({"text": "1"})),
            crate::tools::ToolCall::new("test.echo", json!({"text": "2"})),
        ];
        let backend = ScriptedBackend::new(vec![
            ChatResponse {
                content: String::new(),
                tool_calls: calls.clone(),
            },
            ChatResponse::text("first turn"),
            ChatResponse {
                content: String::new(),
                tool_calls: calls,
            },
            ChatResponse::text("second turn"),
        ]);
        let settings = BTreeMap::from([("max_operations".to_string(), "1".to_string())]);
        let mut agent =
            ChatAgent::new(Box::new(backend), "", registry(), settings).expect("agent");

        for _ in 0..2 {
            agent.chat("go").expect("chat");
            let outcomes: Vec<&str> = agent
                .memory()
                .messages()
                .iter()
                .rev()
                .filter(|m| m.role == Role::Tool)
                .take(2)
                .map(|m| m.content.as_str())
                .collect();
            assert!(outcomes[0].contains("operation limit exceeded"));
            assert!(outcomes[1].contains("\"status\":\"success\""));
        }
    }

    #[test]
    fn decompose_parses_numbered_reply() {
        let backend = ScriptedBackend::new(vec![ChatResponse::text(
            "1. design\n2. implement\n3. test",
        )]);
        let mut agent =
            ChatAgent::new(Box::new(backend), "", ToolRegistry::new(), BTreeMap::new())
                .expect("agent");
        let subtasks = agent.decompose("Build X").expect("decompose");
        assert_eq!(subtasks, vec!["design", "implement", "test"]);
    }

    #[test]
    fn backend_failure_surfaces_as_decomposition_error() {
        let backend = ScriptedBackend::new(Vec::new());
        let mut agent =
            ChatAgent::new(Box::new(backend), "", ToolRegistry::new(), BTreeMap::new())
                .expect("agent");
        let err = agent.decompose("Build X").expect_err("no replies left");
        assert!(matches!(err, DecompositionError::Backend(_)));
    }

    #[test]
    fn complex_query_runs_a_task_tree() {
        let backend = ScriptedBackend::new(vec![
            ChatResponse::text("YES, it has several parts."),
            ChatResponse::text("1. design\n2. implement"),
            ChatResponse::text("designed"),
            ChatResponse::text("implemented"),
        ]);
        let log = backend.log();
        let mut agent =
            ChatAgent::new(Box::new(backend), "", ToolRegistry::new(), BTreeMap::new())
                .expect("agent");
        let mut manager = TaskManager::new();

        let reply = agent
            .handle_complex_query(&mut manager, "Build X")
            .expect("query");
        assert_eq!(
            reply,
            r#"Complex task completed. Results: ["designed","implemented"]"#
        );
        assert_eq!(manager.status_summary().completed, vec!["Build X", "design", "implement"]);
        assert!(log.borrow()[2].last_user.contains("Current task to complete: design"));
    }

    #[test]
    fn simple_query_is_a_single_turn() {
        let backend = ScriptedBackend::new(vec![
            ChatResponse::text("NO, this is one step."),
            ChatResponse::text("42"),
        ]);
        let mut agent =
            ChatAgent::new(Box::new(backend), "", ToolRegistry::new(), BTreeMap::new())
                .expect("agent");
        let mut manager = TaskManager::new();

        let reply = agent
            .handle_complex_query(&mut manager, "what is 6*7?")
            .expect("query");
        assert_eq!(reply, "42");
        assert!(manager.get_tasks().is_empty());
    }
}
