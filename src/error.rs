//! Error types for Savora
//!
//! This module defines all error types used throughout the runtime.
//! Uses `thiserror` for ergonomic error handling with automatic `Display` and
//! `Error` trait implementations.

use std::fmt;
use thiserror::Error;

// ============================================================================
// Upstream (collaborator) Error Classification
// ============================================================================

/// Structured classification of collaborator HTTP failures.
///
/// The model client, generation service, and listing search all speak HTTP;
/// this type categorizes their failures so retry decisions never depend on
/// string matching.
#[derive(Debug)]
pub enum UpstreamError {
    /// 401 — Invalid API key or authentication failure
    Auth(String),
    /// 429 — Rate limit or quota exceeded
    RateLimit(String),
    /// 500/502/503/504 — Server-side errors
    ServerError(String),
    /// 400 — Bad request, invalid JSON, malformed parameters
    InvalidRequest(String),
    /// 404 — Model or resource not found
    NotFound(String),
    /// Connection or read timeout
    Timeout(String),
    /// Catch-all for unrecognized errors
    Unknown(String),
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamError::Auth(msg) => write!(f, "Authentication error: {}", msg),
            UpstreamError::RateLimit(msg) => write!(f, "Rate limit error: {}", msg),
            UpstreamError::ServerError(msg) => write!(f, "Server error: {}", msg),
            UpstreamError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            UpstreamError::NotFound(msg) => write!(f, "Not found: {}", msg),
            UpstreamError::Timeout(msg) => write!(f, "Timeout: {}", msg),
            UpstreamError::Unknown(msg) => write!(f, "Unknown upstream error: {}", msg),
        }
    }
}

impl UpstreamError {
    /// Build from an HTTP status code and response body.
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            401 => UpstreamError::Auth(body.to_string()),
            404 => UpstreamError::NotFound(body.to_string()),
            429 => UpstreamError::RateLimit(body.to_string()),
            400 => UpstreamError::InvalidRequest(body.to_string()),
            500..=599 => UpstreamError::ServerError(body.to_string()),
            _ => UpstreamError::Unknown(format!("HTTP {}: {}", status, body)),
        }
    }

    /// Returns `true` if this error is transient and the request may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            UpstreamError::RateLimit(_) | UpstreamError::ServerError(_) | UpstreamError::Timeout(_)
        )
    }

    /// Returns the HTTP status code associated with this error, if applicable.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            UpstreamError::Auth(_) => Some(401),
            UpstreamError::RateLimit(_) => Some(429),
            UpstreamError::ServerError(_) => Some(500),
            UpstreamError::InvalidRequest(_) => Some(400),
            UpstreamError::NotFound(_) => Some(404),
            UpstreamError::Timeout(_) => None,
            UpstreamError::Unknown(_) => None,
        }
    }
}

impl From<UpstreamError> for SavoraError {
    fn from(err: UpstreamError) -> Self {
        SavoraError::Upstream(err)
    }
}

// ============================================================================
// Primary Error Type
// ============================================================================

/// The primary error type for Savora operations.
#[derive(Error, Debug)]
pub enum SavoraError {
    /// Configuration-related errors (invalid config, missing required fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Agent registry errors (unknown agent id, unserviceable agent)
    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    /// Tool-set composition errors (duplicate tool name in a tier union)
    #[error("Tool composition error: {0}")]
    Composition(String),

    /// Tool input validation errors (missing/ill-typed fields)
    #[error("Tool input error: {0}")]
    ToolInput(String),

    /// Tool execution errors that escaped the tool's own fallback boundary
    #[error("Tool error: {0}")]
    Tool(String),

    /// Thread store errors (persistence failures, corrupt history files)
    #[error("Thread error: {0}")]
    Thread(String),

    /// Structured collaborator error with classification for retry decisions
    #[error("Upstream error: {0}")]
    Upstream(UpstreamError),

    /// Reasoning loop errors (missing model client, malformed loop state)
    #[error("Reasoner error: {0}")]
    Reasoner(String),

    /// Streaming pipeline errors (upstream read failure, sink write failure)
    #[error("Stream error: {0}")]
    Stream(String),

    /// Standard I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// A specialized `Result` type for Savora operations.
pub type Result<T> = std::result::Result<T, SavoraError>;
