//! Anthropic messages-API client
//!
//! Implements `ModelClient` against the Anthropic messages endpoint,
//! including SSE streaming for incremental text deltas and tool-use
//! assembly.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::{Result, SavoraError, UpstreamError};

use super::{ChatMessage, ChatOptions, ContentBlock, ModelClient, ModelEvent, ModelResponse, ModelToolCall, ToolSchema};

const DEFAULT_API_BASE: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Anthropic messages-API client.
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    api_base: String,
    model: String,
}

impl AnthropicClient {
    /// Create a client for the given API key and model.
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            model: model.to_string(),
        }
    }

    /// Override the API base URL (proxies, test servers).
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.api_base)
    }

    fn build_request(
        &self,
        messages: Vec<ChatMessage>,
        tools: Vec<ToolSchema>,
        options: &ChatOptions,
        stream: bool,
    ) -> ApiRequest {
        ApiRequest {
            model: self.model.clone(),
            max_tokens: options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            messages,
            system: options.system.clone(),
            tools: if tools.is_empty() { None } else { Some(tools) },
            temperature: options.temperature,
            stream: if stream { Some(true) } else { None },
        }
    }

    async fn send(&self, request: &ApiRequest) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            let body = match serde_json::from_str::<ApiErrorResponse>(&error_text) {
                Ok(parsed) => format!("{}: {}", parsed.error.r#type, parsed.error.message),
                Err(_) => error_text,
            };
            return Err(SavoraError::from(UpstreamError::from_status(status, &body)));
        }

        Ok(response)
    }
}

#[async_trait]
impl ModelClient for AnthropicClient {
    async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        tools: Vec<ToolSchema>,
        options: ChatOptions,
    ) -> Result<ModelResponse> {
        let request = self.build_request(messages, tools, &options, false);
        let response = self.send(&request).await?;
        let api_response: ApiResponse = response.json().await?;
        Ok(collect_response(api_response))
    }

    async fn chat_stream(
        &self,
        messages: Vec<ChatMessage>,
        tools: Vec<ToolSchema>,
        options: ChatOptions,
    ) -> Result<mpsc::Receiver<ModelEvent>> {
        use futures::StreamExt;

        let request = self.build_request(messages, tools, &options, true);
        let response = self.send(&request).await?;

        let (tx, rx) = mpsc::channel::<ModelEvent>(32);
        let byte_stream = response.bytes_stream();

        tokio::spawn(async move {
            let mut assembled = String::new();
            let mut tool_calls: Vec<ModelToolCall> = Vec::new();
            let mut pending_tool: Option<(String, String)> = None;
            let mut pending_json = String::new();
            let mut line_buffer = String::new();

            tokio::pin!(byte_stream);

            while let Some(chunk_result) = byte_stream.next().await {
                let chunk = match chunk_result {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        let _ = tx
                            .send(ModelEvent::Error(format!("stream read error: {}", e)))
                            .await;
                        return;
                    }
                };

                line_buffer.push_str(&String::from_utf8_lossy(&chunk));

                while let Some(newline_pos) = line_buffer.find('\n') {
                    let line = line_buffer[..newline_pos].trim().to_string();
                    line_buffer = line_buffer[newline_pos + 1..].to_string();

                    if line.is_empty() || line.starts_with("event:") {
                        continue;
                    }
                    let data = match line.strip_prefix("data:") {
                        Some(stripped) => stripped.trim_start(),
                        None => continue,
                    };
                    if data == "[DONE]" {
                        break;
                    }

                    let sse: SseEvent = match serde_json::from_str(data) {
                        Ok(v) => v,
                        Err(_) => continue,
                    };

                    match sse.event_type.as_str() {
                        "content_block_start" => {
                            if let Some(block) = &sse.content_block {
                                if block.block_type == "tool_use" {
                                    pending_tool = block
                                        .id
                                        .clone()
                                        .zip(block.name.clone());
                                    pending_json.clear();
                                }
                            }
                        }
                        "content_block_delta" => {
                            if let Some(delta) = &sse.delta {
                                match delta.delta_type.as_deref() {
                                    Some("text_delta") => {
                                        if let Some(text) = &delta.text {
                                            assembled.push_str(text);
                                            if tx.send(ModelEvent::Delta(text.clone())).await.is_err()
                                            {
                                                // Receiver dropped: stop reading upstream.
                                                return;
                                            }
                                        }
                                    }
                                    Some("input_json_delta") => {
                                        if let Some(fragment) = &delta.partial_json {
                                            pending_json.push_str(fragment);
                                        }
                                    }
                                    _ => {}
                                }
                            }
                        }
                        "content_block_stop" => {
                            if let Some((id, name)) = pending_tool.take() {
                                let input: serde_json::Value = if pending_json.is_empty() {
                                    serde_json::json!({})
                                } else {
                                    serde_json::from_str(&pending_json)
                                        .unwrap_or_else(|_| serde_json::json!({}))
                                };
                                pending_json.clear();
                                tool_calls.push(ModelToolCall::new(&id, &name, input));
                            }
                        }
                        "message_stop" => {
                            if !tool_calls.is_empty() {
                                let _ = tx
                                    .send(ModelEvent::ToolCalls(std::mem::take(&mut tool_calls)))
                                    .await;
                            }
                            let _ = tx
                                .send(ModelEvent::Done {
                                    content: assembled.clone(),
                                })
                                .await;
                            return;
                        }
                        _ => {}
                    }
                }
            }

            // Stream ended without an explicit message_stop
            if !tool_calls.is_empty() {
                let _ = tx
                    .send(ModelEvent::ToolCalls(std::mem::take(&mut tool_calls)))
                    .await;
            }
            let _ = tx.send(ModelEvent::Done { content: assembled }).await;
        });

        Ok(rx)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Wire types
// ============================================================================

/// Messages-API request body.
#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolSchema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

/// Messages-API response body.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    content: Vec<ContentBlock>,
    #[allow(dead_code)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    r#type: String,
    message: String,
}

// ============================================================================
// SSE types
// ============================================================================

#[derive(Debug, Deserialize)]
struct SseEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    delta: Option<SseDelta>,
    #[serde(default)]
    content_block: Option<SseContentBlock>,
}

#[derive(Debug, Deserialize)]
struct SseDelta {
    #[serde(rename = "type", default)]
    delta_type: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    partial_json: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SseContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

/// Flatten a response's content blocks into text + tool calls.
fn collect_response(response: ApiResponse) -> ModelResponse {
    let mut content = String::new();
    let mut tool_calls = Vec::new();

    for block in response.content {
        match block {
            ContentBlock::Text { text } => {
                if !content.is_empty() {
                    content.push('\n');
                }
                content.push_str(&text);
            }
            ContentBlock::ToolUse { id, name, input } => {
                tool_calls.push(ModelToolCall::new(&id, &name, input));
            }
            // Tool results never appear in responses; ignore if they do.
            ContentBlock::ToolResult { .. } => {}
        }
    }

    ModelResponse {
        content,
        tool_calls,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_creation() {
        let client = AnthropicClient::new("test-key", "claude-sonnet-4-20250514");
        assert_eq!(client.model(), "claude-sonnet-4-20250514");
        assert!(client.endpoint().starts_with("https://api.anthropic.com"));
    }

    #[test]
    fn test_with_api_base_trims_slash() {
        let client =
            AnthropicClient::new("k", "m").with_api_base("http://localhost:8080/");
        assert_eq!(client.endpoint(), "http://localhost:8080/v1/messages");
    }

    #[test]
    fn test_build_request_defaults() {
        let client = AnthropicClient::new("k", "m");
        let request = client.build_request(
            vec![ChatMessage::user_text("Hello")],
            vec![],
            &ChatOptions::new(),
            false,
        );
        assert_eq!(request.max_tokens, DEFAULT_MAX_TOKENS);
        assert!(request.tools.is_none());
        assert!(request.stream.is_none());
    }

    #[test]
    fn test_build_request_stream_flag() {
        let client = AnthropicClient::new("k", "m");
        let request =
            client.build_request(vec![ChatMessage::user_text("Hi")], vec![], &ChatOptions::new(), true);
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains(r#""stream":true"#));
    }

    #[test]
    fn test_request_serialization_with_tools() {
        let client = AnthropicClient::new("k", "m");
        let tools = vec![ToolSchema {
            name: "search_listings".to_string(),
            description: "Search marketplace listings".to_string(),
            input_schema: json!({"type": "object", "properties": {}, "required": []}),
        }];
        let request = client.build_request(
            vec![ChatMessage::user_text("Hi")],
            tools,
            &ChatOptions::new().with_system("Be brief.").with_temperature(0.1),
            false,
        );
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains(r#""system":"Be brief.""#));
        assert!(json.contains(r#""name":"search_listings""#));
        assert!(json.contains(r#""input_schema""#));
        assert!(json.contains(r#""temperature":0.1"#));
    }

    #[test]
    fn test_collect_response_text_only() {
        let response = ApiResponse {
            content: vec![ContentBlock::Text {
                text: "Hello!".to_string(),
            }],
            stop_reason: Some("end_turn".to_string()),
        };
        let collected = collect_response(response);
        assert_eq!(collected.content, "Hello!");
        assert!(!collected.has_tool_calls());
    }

    #[test]
    fn test_collect_response_with_tool_use() {
        let response = ApiResponse {
            content: vec![
                ContentBlock::Text {
                    text: "Let me check.".to_string(),
                },
                ContentBlock::ToolUse {
                    id: "tu_1".to_string(),
                    name: "search_listings".to_string(),
                    input: json!({"query": "rye"}),
                },
            ],
            stop_reason: Some("tool_use".to_string()),
        };
        let collected = collect_response(response);
        assert_eq!(collected.content, "Let me check.");
        assert_eq!(collected.tool_calls.len(), 1);
        assert_eq!(collected.tool_calls[0].name, "search_listings");
        assert_eq!(collected.tool_calls[0].input["query"], "rye");
    }

    #[test]
    fn test_collect_response_multiple_text_blocks() {
        let response = ApiResponse {
            content: vec![
                ContentBlock::Text {
                    text: "first".to_string(),
                },
                ContentBlock::Text {
                    text: "second".to_string(),
                },
            ],
            stop_reason: None,
        };
        assert_eq!(collect_response(response).content, "first\nsecond");
    }

    #[test]
    fn test_sse_event_deserialization() {
        let data = r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hi"}}"#;
        let event: SseEvent = serde_json::from_str(data).unwrap();
        assert_eq!(event.event_type, "content_block_delta");
        assert_eq!(event.delta.unwrap().text.as_deref(), Some("Hi"));
    }

    #[test]
    fn test_sse_tool_use_block_start() {
        let data = r#"{"type":"content_block_start","index":1,"content_block":{"type":"tool_use","id":"tu_9","name":"generate_image"}}"#;
        let event: SseEvent = serde_json::from_str(data).unwrap();
        let block = event.content_block.unwrap();
        assert_eq!(block.block_type, "tool_use");
        assert_eq!(block.id.as_deref(), Some("tu_9"));
        assert_eq!(block.name.as_deref(), Some("generate_image"));
    }
}
