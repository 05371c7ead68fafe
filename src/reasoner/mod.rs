//! Reasoning and tool-invocation loop
//!
//! Drives the model over a thread's history, invoking tools until the
//! model answers without requesting any. In streaming mode the loop is
//! the upstream event producer: it writes newline-delimited raw-event
//! records (token fragments and tool completions) into a byte stream the
//! transformation layer consumes. Tool-input validation happens before
//! every invocation; a validation failure is reported back to the model
//! and produces no event.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::channel::mpsc as futures_mpsc;
use futures::{SinkExt, StreamExt};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ReasoningConfig;
use crate::error::{Result, SavoraError};
use crate::model::{ChatMessage, ChatOptions, ModelClient, ModelEvent, ModelToolCall};
use crate::stream::{RawByteStream, RawEvent};
use crate::thread::{Message, Role};
use crate::tools::{ToolContext, ToolSet};

/// Event channel depth between the loop and the transformation layer.
const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Everything one reasoning run needs, owned so the run can be spawned.
pub struct ReasonRequest {
    pub agent_id: String,
    pub thread_id: String,
    pub instruction: String,
    pub tools: ToolSet,
    pub history: Vec<Message>,
    pub message: String,
}

/// The upstream event producer behind the streaming pipeline.
#[async_trait]
pub trait Reasoner: Send + Sync {
    /// Run the loop, producing the newline-delimited raw-event byte stream.
    ///
    /// The second half of the pair resolves to the final message text once
    /// the run completes, so callers can persist it; it is never resolved
    /// for a failed or abandoned run.
    async fn events(&self, request: ReasonRequest)
        -> Result<(RawByteStream, oneshot::Receiver<String>)>;

    /// Run the loop without streaming; returns the final message text.
    async fn complete(&self, request: ReasonRequest) -> Result<String>;
}

/// Production reasoner: a model client plus the agent's tool set.
#[derive(Clone)]
pub struct LoopReasoner {
    model: Arc<dyn ModelClient>,
    max_tokens: u32,
    temperature: f32,
    max_tool_iterations: usize,
}

type EventSender = futures_mpsc::Sender<std::io::Result<Bytes>>;

impl LoopReasoner {
    pub fn new(model: Arc<dyn ModelClient>, reasoning: &ReasoningConfig) -> Self {
        Self {
            model,
            max_tokens: reasoning.max_tokens,
            temperature: reasoning.temperature,
            max_tool_iterations: reasoning.max_tool_iterations,
        }
    }

    /// Serialize one raw event onto the byte stream.
    ///
    /// Returns false when the consumer is gone and the run should stop.
    async fn emit(sink: &mut EventSender, event: &RawEvent) -> bool {
        let mut line = match serde_json::to_vec(event) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "failed to encode raw event");
                return true;
            }
        };
        line.push(b'\n');
        sink.send(Ok(Bytes::from(line))).await.is_ok()
    }

    /// One model turn: returns the turn's text and any requested tool calls.
    async fn turn(
        &self,
        messages: Vec<ChatMessage>,
        request: &ReasonRequest,
        options: &ChatOptions,
        sink: &mut Option<EventSender>,
    ) -> Result<(String, Vec<ModelToolCall>)> {
        let schemas = request.tools.schemas();

        let Some(sink) = sink.as_mut() else {
            let response = self.model.chat(messages, schemas, options.clone()).await?;
            return Ok((response.content, response.tool_calls));
        };

        let mut rx = self
            .model
            .chat_stream(messages, schemas, options.clone())
            .await?;
        let mut content = String::new();
        let mut tool_calls = Vec::new();
        while let Some(event) = rx.recv().await {
            match event {
                ModelEvent::Delta(text) => {
                    content.push_str(&text);
                    if !Self::emit(sink, &RawEvent::token(&text)).await {
                        return Err(SavoraError::Stream("event consumer dropped".to_string()));
                    }
                }
                ModelEvent::ToolCalls(calls) => tool_calls = calls,
                ModelEvent::Done { content: full } => {
                    content = full;
                    break;
                }
                ModelEvent::Error(e) => return Err(SavoraError::Reasoner(e)),
            }
        }
        Ok((content, tool_calls))
    }

    /// The shared loop body. With a sink the run streams; without one it
    /// only returns the accumulated text.
    async fn run(&self, request: ReasonRequest, mut sink: Option<EventSender>) -> Result<String> {
        let mut messages = conversation_from(&request.history);
        messages.push(ChatMessage::user_text(&request.message));

        let options = ChatOptions::new()
            .with_system(&request.instruction)
            .with_max_tokens(self.max_tokens)
            .with_temperature(self.temperature);
        let ctx = ToolContext::new().with_request(&request.agent_id, &request.thread_id);

        let mut final_text = String::new();

        for iteration in 0..self.max_tool_iterations {
            let (content, tool_calls) = self
                .turn(messages.clone(), &request, &options, &mut sink)
                .await?;
            final_text.push_str(&content);

            if tool_calls.is_empty() {
                debug!(iterations = iteration + 1, "reasoning run finished");
                return Ok(final_text);
            }

            messages.push(ChatMessage::assistant_tool_use(&content, &tool_calls));

            let mut results = Vec::with_capacity(tool_calls.len());
            for call in &tool_calls {
                if let Err(violations) = request.tools.validate(&call.name, &call.input) {
                    let detail = violations
                        .iter()
                        .map(|v| v.to_string())
                        .collect::<Vec<_>>()
                        .join("; ");
                    warn!(tool = %call.name, detail = %detail, "tool input rejected");
                    results.push((call.id.clone(), format!("Input error: {}", detail)));
                    continue;
                }

                let output = request
                    .tools
                    .invoke(&call.name, call.input.clone(), &ctx)
                    .await?;
                if let Some(sink) = sink.as_mut() {
                    let event = RawEvent::tool_complete(&call.name, &output.text);
                    if !Self::emit(sink, &event).await {
                        return Err(SavoraError::Stream("event consumer dropped".to_string()));
                    }
                }
                results.push((call.id.clone(), output.text));
            }
            messages.push(ChatMessage::tool_results(results));
        }

        warn!(
            max_tool_iterations = self.max_tool_iterations,
            "tool iteration cap reached; answering with accumulated text"
        );
        Ok(final_text)
    }
}

#[async_trait]
impl Reasoner for LoopReasoner {
    async fn events(
        &self,
        request: ReasonRequest,
    ) -> Result<(RawByteStream, oneshot::Receiver<String>)> {
        let (tx, rx) = futures_mpsc::channel::<std::io::Result<Bytes>>(EVENT_CHANNEL_CAPACITY);
        let (done_tx, done_rx) = oneshot::channel();
        let reasoner = self.clone();

        tokio::spawn(async move {
            let mut error_sink = tx.clone();
            match reasoner.run(request, Some(tx)).await {
                Ok(final_text) => {
                    let _ = done_tx.send(final_text);
                }
                Err(SavoraError::Stream(reason)) => {
                    // The consumer went away; nothing left to tell it.
                    info!(reason = %reason, "streaming run abandoned");
                }
                Err(e) => {
                    let _ = error_sink
                        .send(Err(std::io::Error::other(e.to_string())))
                        .await;
                }
            }
        });

        Ok((rx.boxed(), done_rx))
    }

    async fn complete(&self, request: ReasonRequest) -> Result<String> {
        self.run(request, None).await
    }
}

/// Replay thread history as a model conversation.
///
/// Thread messages carry no tool-use ids, so ids are synthesized while
/// replaying: each agent tool call gets a fresh id and the following
/// tool-result messages consume them in order. A tool result with no
/// pending call is dropped with a warning.
fn conversation_from(history: &[Message]) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len());
    let mut pending_ids: VecDeque<String> = VecDeque::new();
    let mut pending_results: Vec<(String, String)> = Vec::new();

    let flush = |messages: &mut Vec<ChatMessage>, pending_results: &mut Vec<(String, String)>| {
        if !pending_results.is_empty() {
            messages.push(ChatMessage::tool_results(std::mem::take(pending_results)));
        }
    };

    for message in history {
        match message.role {
            Role::User => {
                flush(&mut messages, &mut pending_results);
                pending_ids.clear();
                messages.push(ChatMessage::user_text(&message.content));
            }
            Role::Agent => {
                flush(&mut messages, &mut pending_results);
                pending_ids.clear();
                match &message.tool_calls {
                    Some(calls) if !calls.is_empty() => {
                        let model_calls: Vec<ModelToolCall> = calls
                            .iter()
                            .map(|call| {
                                ModelToolCall::new(
                                    &format!("tu_{}", Uuid::new_v4().simple()),
                                    &call.tool_name,
                                    call.input.clone(),
                                )
                            })
                            .collect();
                        pending_ids = model_calls.iter().map(|c| c.id.clone()).collect();
                        messages.push(ChatMessage::assistant_tool_use(
                            &message.content,
                            &model_calls,
                        ));
                    }
                    _ => messages.push(ChatMessage::assistant_text(&message.content)),
                }
            }
            Role::ToolResult => match pending_ids.pop_front() {
                Some(id) => pending_results.push((id, message.content.clone())),
                None => {
                    warn!("tool result with no pending tool call; dropping from replay");
                }
            },
        }
    }
    flush(&mut messages, &mut pending_results);

    messages
}
