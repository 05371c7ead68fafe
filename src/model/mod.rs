//! Reasoning-model clients
//!
//! The `ModelClient` trait abstracts the conversational model behind the
//! agent loop. `AnthropicClient` is the production implementation against
//! the Anthropic messages API, in both buffered and streaming modes.

mod anthropic;
mod types;

pub use anthropic::AnthropicClient;
pub use types::{
    ChatMessage, ChatOptions, ChatRole, ContentBlock, ModelClient, ModelEvent, ModelResponse,
    ModelToolCall, ToolSchema,
};
