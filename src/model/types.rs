//! Model client types
//!
//! Defines the `ModelClient` trait the reasoning loop drives, plus the
//! conversation and tool-schema types exchanged with it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::Result;

/// Schema of a tool as advertised to the reasoning model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    /// The tool name (unique within the advertised set)
    pub name: String,
    /// Human-readable description of what the tool does
    pub description: String,
    /// JSON Schema describing the tool's input
    pub input_schema: Value,
}

/// Role of a chat message sent to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One content block within a chat message.
///
/// Mirrors the messages-API wire shape: plain text, a tool-use request from
/// the assistant, or a tool result supplied back by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    #[serde(rename = "tool_result")]
    ToolResult { tool_use_id: String, content: String },
}

/// A message in the model conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// "user" or "assistant"
    pub role: ChatRole,
    /// Ordered content blocks
    pub content: Vec<ContentBlock>,
}

impl ChatMessage {
    /// A plain-text user message.
    pub fn user_text(text: &str) -> Self {
        Self {
            role: ChatRole::User,
            content: vec![ContentBlock::Text {
                text: text.to_string(),
            }],
        }
    }

    /// A plain-text assistant message.
    pub fn assistant_text(text: &str) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: vec![ContentBlock::Text {
                text: text.to_string(),
            }],
        }
    }

    /// An assistant message carrying tool-use blocks (and optional text).
    pub fn assistant_tool_use(text: &str, calls: &[ModelToolCall]) -> Self {
        let mut content = Vec::new();
        if !text.is_empty() {
            content.push(ContentBlock::Text {
                text: text.to_string(),
            });
        }
        for call in calls {
            content.push(ContentBlock::ToolUse {
                id: call.id.clone(),
                name: call.name.clone(),
                input: call.input.clone(),
            });
        }
        Self {
            role: ChatRole::Assistant,
            content,
        }
    }

    /// A user message carrying tool results.
    pub fn tool_results(results: Vec<(String, String)>) -> Self {
        Self {
            role: ChatRole::User,
            content: results
                .into_iter()
                .map(|(tool_use_id, content)| ContentBlock::ToolResult {
                    tool_use_id,
                    content,
                })
                .collect(),
        }
    }
}

/// Options for a chat request.
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    /// Standing instruction (system prompt)
    pub system: Option<String>,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Sampling temperature
    pub temperature: Option<f32>,
}

impl ChatOptions {
    /// Create new default chat options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the standing instruction.
    pub fn with_system(mut self, system: &str) -> Self {
        self.system = Some(system.to_string());
        self
    }

    /// Set the maximum number of tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// A tool call requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelToolCall {
    /// Provider-assigned id pairing the call with its result
    pub id: String,
    /// Name of the requested tool
    pub name: String,
    /// Structured input for the tool
    pub input: Value,
}

impl ModelToolCall {
    /// Create a new tool call.
    pub fn new(id: &str, name: &str, input: Value) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            input,
        }
    }
}

/// A complete (non-streaming) model response.
#[derive(Debug, Clone)]
pub struct ModelResponse {
    /// Assistant text content
    pub content: String,
    /// Tool calls the model wants executed (empty = final answer)
    pub tool_calls: Vec<ModelToolCall>,
}

impl ModelResponse {
    /// Whether the response requests tool invocations.
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// One event of a streaming model response.
#[derive(Debug)]
pub enum ModelEvent {
    /// Incremental text fragment
    Delta(String),
    /// The model requested tool invocations
    ToolCalls(Vec<ModelToolCall>),
    /// Generation finished; `content` is the assembled full text
    Done { content: String },
    /// The stream failed
    Error(String),
}

/// Trait for reasoning-model clients.
///
/// One implementation speaks one provider's HTTP API; the reasoning loop
/// only sees this interface.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send a chat request and wait for the complete response.
    async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        tools: Vec<ToolSchema>,
        options: ChatOptions,
    ) -> Result<ModelResponse>;

    /// Send a chat request and stream the response.
    ///
    /// Text deltas arrive in generation order; tool calls (if any) arrive
    /// once assembled, before `Done`.
    async fn chat_stream(
        &self,
        messages: Vec<ChatMessage>,
        tools: Vec<ToolSchema>,
        options: ChatOptions,
    ) -> Result<mpsc::Receiver<ModelEvent>>;

    /// The model identifier requests are issued against.
    fn model(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chat_message_user_text() {
        let msg = ChatMessage::user_text("Hello");
        assert_eq!(msg.role, ChatRole::User);
        assert!(matches!(&msg.content[0], ContentBlock::Text { text } if text == "Hello"));
    }

    #[test]
    fn test_chat_message_assistant_tool_use() {
        let calls = vec![ModelToolCall::new(
            "tu_1",
            "search_listings",
            json!({"query": "rye"}),
        )];
        let msg = ChatMessage::assistant_tool_use("Checking the market.", &calls);

        assert_eq!(msg.role, ChatRole::Assistant);
        assert_eq!(msg.content.len(), 2);
        assert!(matches!(&msg.content[1], ContentBlock::ToolUse { name, .. } if name == "search_listings"));
    }

    #[test]
    fn test_chat_message_assistant_tool_use_no_text() {
        let calls = vec![ModelToolCall::new("tu_1", "ping", json!({}))];
        let msg = ChatMessage::assistant_tool_use("", &calls);
        // Empty text does not produce an empty text block
        assert_eq!(msg.content.len(), 1);
    }

    #[test]
    fn test_chat_message_tool_results() {
        let msg = ChatMessage::tool_results(vec![("tu_1".to_string(), "Found 3".to_string())]);
        assert_eq!(msg.role, ChatRole::User);
        assert!(
            matches!(&msg.content[0], ContentBlock::ToolResult { tool_use_id, content }
                if tool_use_id == "tu_1" && content == "Found 3")
        );
    }

    #[test]
    fn test_content_block_serialization() {
        let block = ContentBlock::ToolUse {
            id: "tu_1".to_string(),
            name: "generate_image".to_string(),
            input: json!({"prompt": "bread"}),
        };
        let json = serde_json::to_string(&block).unwrap();
        assert!(json.contains(r#""type":"tool_use""#));
        assert!(json.contains(r#""name":"generate_image""#));
    }

    #[test]
    fn test_chat_options_builder() {
        let options = ChatOptions::new()
            .with_system("You are a chef.")
            .with_max_tokens(512)
            .with_temperature(0.2);
        assert_eq!(options.system.as_deref(), Some("You are a chef."));
        assert_eq!(options.max_tokens, Some(512));
        assert_eq!(options.temperature, Some(0.2));
    }

    #[test]
    fn test_model_response_has_tool_calls() {
        let without = ModelResponse {
            content: "done".to_string(),
            tool_calls: vec![],
        };
        assert!(!without.has_tool_calls());

        let with = ModelResponse {
            content: String::new(),
            tool_calls: vec![ModelToolCall::new("tu_1", "x", json!({}))],
        };
        assert!(with.has_tool_calls());
    }
}
