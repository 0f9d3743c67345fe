//! Test-only agents, backends and tools with predetermined behavior.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::rc::Rc;

use anyhow::{Result, anyhow, bail};
use serde_json::{Value, json};
use tempfile::TempDir;

use crate::agents::Agent;
use crate::agents::backend::{ChatBackend, ChatResponse};
use crate::agents::memory::{Message, Role};
use crate::error::DecompositionError;
use crate::tools::context::{ALLOWED_BASE_PATH, SECURITY_LEVEL};
use crate::tools::{ParamType, ParameterSchema, ParameterSpec, Provider, Tool};

/// Agent that answers from fixed plans and records every step it runs.
///
/// Decomposing a description without a plan fails with
/// [`DecompositionError::EmptyResponse`]. Default steps return
/// `"done: <description>"` unless the description was marked failing.
#[derive(Debug, Default)]
pub struct ScriptedAgent {
    pub plans: HashMap<String, Vec<String>>,
    pub failing: HashSet<String>,
    pub executed: Vec<String>,
}

impl ScriptedAgent {
    pub fn with_plan<I, S>(mut self, description: &str, subtasks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.plans.insert(
            description.to_string(),
            subtasks.into_iter().map(Into::into).collect(),
        );
        self
    }

    pub fn failing_on(mut self, description: &str) -> Self {
        self.failing.insert(description.to_string());
        self
    }
}

impl Agent for ScriptedAgent {
    fn decompose(&mut self, description: &str) -> Result<Vec<String>, DecompositionError> {
        self.plans
            .get(description)
            .cloned()
            .ok_or(DecompositionError::EmptyResponse)
    }

    fn execute_default(&mut self, description: &str) -> Result<Value> {
        self.executed.push(description.to_string());
        if self.failing.contains(description) {
            bail!("step '{description}' failed");
        }
        Ok(json!(format!("done: {description}")))
    }
}

/// What a [`ScriptedBackend`] was asked.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: usize,
    pub tools: usize,
    pub last_user: String,
}

/// Backend that replays queued replies in order.
#[derive(Debug)]
pub struct ScriptedBackend {
    replies: VecDeque<ChatResponse>,
    supports_tools: bool,
    log: Rc<RefCell<Vec<RecordedRequest>>>,
}

impl ScriptedBackend {
    pub fn new(replies: Vec<ChatResponse>) -> Self {
        Self {
            replies: replies.into(),
            supports_tools: true,
            log: Rc::default(),
        }
    }

    pub fn without_tools(mut self) -> Self {
        self.supports_tools = false;
        self
    }

    /// Shared handle to the request log, usable after the backend is boxed.
    pub fn log(&self) -> Rc<RefCell<Vec<RecordedRequest>>> {
        Rc::clone(&self.log)
    }
}

impl ChatBackend for ScriptedBackend {
    fn chat(&mut self, messages: &[Message], tools: &[Value]) -> Result<ChatResponse> {
        let last_user = messages
            .iter()
            .rev()
            .find(|message| message.role == Role::User)
            .map(|message| message.content.clone())
            .unwrap_or_default();
        self.log.borrow_mut().push(RecordedRequest {
            messages: messages.len(),
            tools: tools.len(),
            last_user,
        });
        self.replies
            .pop_front()
            .ok_or_else(|| anyhow!("no scripted replies left"))
    }

    fn supports_tools(&self) -> bool {
        self.supports_tools
    }

    fn provider(&self) -> Provider {
        Provider::OpenAi
    }
}

/// `test.echo`: returns its `text` argument.
pub fn echo_tool() -> Tool {
    Tool::new(
        "test.echo",
        "Echo the given text",
        ParameterSchema::new().param(ParameterSpec::required(
            "text",
            ParamType::String,
            "Text to echo",
        )),
        |_, args| {
            args.get("text")
                .cloned()
                .ok_or_else(|| anyhow!("missing text"))
        },
    )
}

/// A temporary directory plus strict settings scoped to it.
pub fn sandbox() -> (TempDir, BTreeMap<String, String>) {
    let dir = tempfile::tempdir().expect("create sandbox dir");
    let settings = BTreeMap::from([
        (
            ALLOWED_BASE_PATH.to_string(),
            dir.path().display().to_string(),
        ),
        (SECURITY_LEVEL.to_string(), "strict".to_string()),
    ]);
    (dir, settings)
}
