//! Savora - Tiered culinary marketplace assistant runtime

pub mod agents;
pub mod clients;
pub mod config;
pub mod error;
pub mod model;
pub mod reasoner;
pub mod runtime;
pub mod stream;
pub mod thread;
pub mod tools;

pub use agents::{AgentDefinition, AgentRegistry, Collaborators};
pub use config::Config;
pub use error::{Result, SavoraError, UpstreamError};
pub use runtime::ChatRuntime;
pub use stream::{ClientFrame, FrameSink, RawEvent, StreamTransformer};
pub use thread::{Message, Role, Thread, ThreadStore, ToolInvocation};
