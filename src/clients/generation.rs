//! Generation-service client
//!
//! Text and media generation behind trait seams so tools can be tested
//! against mocks. The HTTP implementation talks to the generation service
//! configured in `GenerationConfig`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SavoraError, UpstreamError};

/// Kind of media the generation service can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Document,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
            MediaKind::Document => write!(f, "document"),
        }
    }
}

/// A media-generation request.
#[derive(Debug, Clone, Serialize)]
pub struct MediaRequest {
    pub kind: MediaKind,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl MediaRequest {
    pub fn new(kind: MediaKind, prompt: &str) -> Self {
        Self {
            kind,
            prompt: prompt.to_string(),
            format: None,
        }
    }

    pub fn with_format(mut self, format: &str) -> Self {
        self.format = Some(format.to_string());
        self
    }
}

/// A generated asset hosted by the generation service.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedAsset {
    pub url: String,
    #[serde(default)]
    pub content_type: Option<String>,
}

/// Prompt-in, text-out generation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate_text(&self, prompt: &str) -> Result<String>;
}

/// Structured-request-in, hosted-asset-out generation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaGenerator: Send + Sync {
    async fn generate_media(&self, request: &MediaRequest) -> Result<GeneratedAsset>;
}

/// HTTP client for the generation service.
pub struct GenerationClient {
    client: Client,
    api_key: String,
    api_base: String,
}

impl GenerationClient {
    pub fn new(api_key: &str, api_base: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path)
    }

    async fn post_json<B: Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self
            .client
            .post(self.endpoint(path))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SavoraError::from(UpstreamError::from_status(status, &body)));
        }

        Ok(response.json().await?)
    }
}

#[derive(Serialize)]
struct TextRequest<'a> {
    prompt: &'a str,
}

#[derive(Deserialize)]
struct TextResponse {
    text: String,
}

#[async_trait]
impl TextGenerator for GenerationClient {
    async fn generate_text(&self, prompt: &str) -> Result<String> {
        let response: TextResponse = self.post_json("text", &TextRequest { prompt }).await?;
        Ok(response.text)
    }
}

#[async_trait]
impl MediaGenerator for GenerationClient {
    async fn generate_media(&self, request: &MediaRequest) -> Result<GeneratedAsset> {
        self.post_json("media", request).await
    }
}
