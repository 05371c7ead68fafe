//! Chat runtime
//!
//! Ties the pieces together per request: resolve the agent, replay the
//! thread, run the reasoner and deliver the response. In streaming mode
//! the raw-event stream goes through the transformation layer and out
//! the frame sink; in buffered mode the final message comes back as one
//! frame. The thread is extended only after a successful run.

use std::sync::Arc;

use tokio::io::AsyncWrite;
use tracing::{info_span, Instrument};
use uuid::Uuid;

use crate::agents::{AgentDefinition, AgentRegistry, Collaborators};
use crate::clients::{GenerationClient, MarketplaceClient, SitesClient};
use crate::config::Config;
use crate::error::{Result, SavoraError};
use crate::model::AnthropicClient;
use crate::reasoner::{LoopReasoner, ReasonRequest, Reasoner};
use crate::stream::{ClientFrame, FrameSink, StreamTransformer};
use crate::thread::{Message, ThreadStore};

pub struct ChatRuntime {
    registry: AgentRegistry,
    threads: ThreadStore,
    reasoner: Arc<dyn Reasoner>,
}

impl ChatRuntime {
    pub fn new(registry: AgentRegistry, threads: ThreadStore, reasoner: Arc<dyn Reasoner>) -> Self {
        Self {
            registry,
            threads,
            reasoner,
        }
    }

    /// Wire up the production runtime from configuration.
    ///
    /// Collaborator clients are created once here and shared by every
    /// request. Tiers whose collaborators lack credentials are excluded by
    /// the registry; a tool-name collision aborts startup.
    pub fn from_config(config: &Config) -> Result<Self> {
        let model_key = config.model.api_key.clone().unwrap_or_default();
        let generation_key = config.generation.api_key.clone().unwrap_or_default();

        let mut model = AnthropicClient::new(&model_key, &config.reasoning.model);
        if let Some(api_base) = &config.model.api_base {
            model = model.with_api_base(api_base);
        }
        let model = Arc::new(model);

        let generation = Arc::new(GenerationClient::new(
            &generation_key,
            &config.generation.api_base,
        ));
        let collaborators = Collaborators {
            text: generation.clone(),
            media: generation,
            sites: Arc::new(SitesClient::new(&generation_key, &config.sites.public_base)),
            search: Arc::new(MarketplaceClient::new(&config.marketplace.api_base)),
        };

        let registry = AgentRegistry::build(config, &collaborators)?;
        let threads = if config.threads.persist {
            ThreadStore::with_path(config.thread_storage_dir())?
        } else {
            ThreadStore::new_memory()
        };
        let reasoner = Arc::new(LoopReasoner::new(model, &config.reasoning));

        Ok(Self::new(registry, threads, reasoner))
    }

    pub fn agents(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn threads(&self) -> &ThreadStore {
        &self.threads
    }

    fn reason_request(
        &self,
        agent: &AgentDefinition,
        thread_id: &str,
        history: Vec<Message>,
        message: &str,
    ) -> ReasonRequest {
        ReasonRequest {
            agent_id: agent.id.clone(),
            thread_id: thread_id.to_string(),
            instruction: agent.instruction.clone(),
            tools: agent.tools.clone(),
            history,
            message: message.to_string(),
        }
    }

    async fn record_exchange(&self, thread_id: &str, message: &str, reply: &str) -> Result<()> {
        self.threads
            .append(thread_id, Message::user(message))
            .await?;
        self.threads.append(thread_id, Message::agent(reply)).await
    }

    /// Handle one request in streaming mode, writing NDJSON frames to
    /// `writer` as they become available.
    pub async fn chat_stream<W: AsyncWrite + Unpin>(
        &self,
        agent_id: &str,
        thread_id: &str,
        message: &str,
        writer: W,
    ) -> Result<()> {
        let request_id = Uuid::new_v4();
        let span = info_span!(
            "chat",
            %request_id,
            agent = agent_id,
            thread = thread_id,
            streaming = true
        );

        async {
            let agent = self.registry.resolve(agent_id)?;
            let history = self.threads.read(thread_id).await?;
            let request = self.reason_request(agent, thread_id, history, message);

            let (upstream, outcome) = self.reasoner.events(request).await?;
            let frames = StreamTransformer::spawn(upstream);
            let mut sink = FrameSink::new(writer);
            sink.drain(frames).await?;

            let reply = outcome
                .await
                .map_err(|_| SavoraError::Reasoner("run ended without an outcome".to_string()))?;
            self.record_exchange(thread_id, message, &reply).await
        }
        .instrument(span)
        .await
    }

    /// Handle one request in buffered mode; the final message comes back
    /// as a single frame.
    pub async fn chat(&self, agent_id: &str, thread_id: &str, message: &str) -> Result<ClientFrame> {
        let request_id = Uuid::new_v4();
        let span = info_span!(
            "chat",
            %request_id,
            agent = agent_id,
            thread = thread_id,
            streaming = false
        );

        async {
            let agent = self.registry.resolve(agent_id)?;
            let history = self.threads.read(thread_id).await?;
            let request = self.reason_request(agent, thread_id, history, message);

            let reply = self.reasoner.complete(request).await?;
            self.record_exchange(thread_id, message, &reply).await?;
            Ok(ClientFrame::text(&reply))
        }
        .instrument(span)
        .await
    }
}
