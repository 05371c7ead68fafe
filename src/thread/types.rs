//! Thread types for Savora
//!
//! Defines the conversation thread and its append-only message history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A conversation thread: a caller-supplied stable identity scoping an
/// append-only, causally ordered message history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    /// Caller-supplied opaque identifier, stable across a conversation
    pub id: String,
    /// Ordered message history (append-only)
    pub history: Vec<Message>,
    /// When this thread was first seen
    pub created_at: DateTime<Utc>,
    /// When this thread was last appended to
    pub updated_at: DateTime<Utc>,
}

impl Thread {
    /// Create a new empty thread with the given id.
    ///
    /// # Example
    /// ```
    /// use savora::thread::Thread;
    ///
    /// let thread = Thread::new("web:visitor-42");
    /// assert!(thread.history.is_empty());
    /// ```
    pub fn new(id: &str) -> Self {
        let now = Utc::now();
        Self {
            id: id.to_string(),
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a message. The only mutation a thread supports.
    pub fn append(&mut self, message: Message) {
        self.history.push(message);
        self.updated_at = Utc::now();
    }

    /// Number of messages in this thread.
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Whether the thread has no messages.
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// The most recent message, if any.
    pub fn last(&self) -> Option<&Message> {
        self.history.last()
    }
}

/// A single message in a thread.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// The role of the message author
    pub role: Role,
    /// The text content of the message
    pub content: String,
    /// Tool calls requested by the agent (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolInvocation>>,
}

impl Message {
    /// Create a user message.
    pub fn user(content: &str) -> Self {
        Self {
            role: Role::User,
            content: content.to_string(),
            tool_calls: None,
        }
    }

    /// Create an agent message.
    pub fn agent(content: &str) -> Self {
        Self {
            role: Role::Agent,
            content: content.to_string(),
            tool_calls: None,
        }
    }

    /// Create an agent message that carries tool calls.
    ///
    /// # Example
    /// ```
    /// use savora::thread::{Message, ToolInvocation, Role};
    /// use serde_json::json;
    ///
    /// let call = ToolInvocation::new("search_listings", json!({"query": "sourdough"}));
    /// let msg = Message::agent_with_tools("Let me look.", vec![call]);
    /// assert_eq!(msg.role, Role::Agent);
    /// assert!(msg.has_tool_calls());
    /// ```
    pub fn agent_with_tools(content: &str, tool_calls: Vec<ToolInvocation>) -> Self {
        Self {
            role: Role::Agent,
            content: content.to_string(),
            tool_calls: Some(tool_calls),
        }
    }

    /// Create a tool-result message.
    ///
    /// A tool result's content may contain at most one embedded payload block
    /// per kind; extraction happens in the streaming layer, the thread stores
    /// the raw text.
    pub fn tool_result(content: &str) -> Self {
        Self {
            role: Role::ToolResult,
            content: content.to_string(),
            tool_calls: None,
        }
    }

    /// Check if this message carries tool calls.
    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls
            .as_ref()
            .map(|tc| !tc.is_empty())
            .unwrap_or(false)
    }
}

/// The role of a message author.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Messages from the end user
    User,
    /// Messages produced by the agent
    Agent,
    /// Output of a completed tool invocation
    ToolResult,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Agent => write!(f, "agent"),
            Role::ToolResult => write!(f, "tool_result"),
        }
    }
}

/// A tool invocation recorded on an agent message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolInvocation {
    /// Name of the invoked tool
    pub tool_name: String,
    /// Structured input the tool was invoked with
    pub input: serde_json::Value,
}

impl ToolInvocation {
    /// Create a new tool invocation record.
    pub fn new(tool_name: &str, input: serde_json::Value) -> Self {
        Self {
            tool_name: tool_name.to_string(),
            input,
        }
    }
}
