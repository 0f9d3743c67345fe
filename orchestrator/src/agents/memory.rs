//! Bounded conversation memory.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_MESSAGES: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Self::new(Role::Tool, content)
    }
}

/// Ordered transcript holding at most `max_messages` entries.
///
/// When full, the oldest message after the system prompt is dropped and the
/// system prompt stays first. The newest message is never dropped, so a
/// memory bounded to one message keeps only the latest one.
#[derive(Debug, Clone)]
pub struct Memory {
    messages: Vec<Message>,
    max_messages: usize,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MESSAGES)
    }
}

impl Memory {
    pub fn new(max_messages: usize) -> Self {
        Self {
            messages: Vec::new(),
            max_messages: max_messages.max(1),
        }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
        while self.messages.len() > self.max_messages {
            let newest = self.messages.len() - 1;
            let oldest = usize::from(self.has_system_prompt()).min(newest.saturating_sub(1));
            self.messages.remove(oldest);
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn max_messages(&self) -> usize {
        self.max_messages
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Replace every system message with a single one at the front.
    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        self.messages.retain(|message| message.role != Role::System);
        self.messages.insert(0, Message::system(prompt));
        while self.messages.len() > self.max_messages {
            self.messages.remove(usize::from(self.messages.len() > 1));
        }
    }

    pub fn system_prompt(&self) -> Option<&str> {
        self.messages
            .first()
            .filter(|message| message.role == Role::System)
            .map(|message| message.content.as_str())
    }

    fn has_system_prompt(&self) -> bool {
        self.system_prompt().is_some()
    }
}
