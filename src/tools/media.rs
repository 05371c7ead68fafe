//! Media generation tools
//!
//! The creative tier: image, video and document generation. Each tool
//! renders a short narrative line and appends the hosted asset as a
//! marker block, which the streaming layer later strips into the frame's
//! structured arrays.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use crate::clients::{MediaGenerator, MediaKind, MediaRequest};
use crate::error::Result;
use crate::stream::payload::PayloadKind;
use crate::stream::{DocumentPayload, ImagePayload, VideoPayload};

use super::types::{FieldKind, FieldSpec, InputConstraints, Tool, ToolContext, ToolOutput};

fn prompt_field(input: &Value) -> &str {
    input.get("prompt").and_then(Value::as_str).unwrap_or_default()
}

fn marker_line(kind: PayloadKind, payload_json: String) -> String {
    format!("{} {}", kind.marker(), payload_json)
}

/// Generates an image from a text prompt.
pub struct GenerateImageTool {
    generator: Arc<dyn MediaGenerator>,
}

impl GenerateImageTool {
    pub fn new(generator: Arc<dyn MediaGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl Tool for GenerateImageTool {
    fn name(&self) -> &str {
        "generate_image"
    }

    fn description(&self) -> &str {
        "Generate an image from a text prompt and return its hosted URL"
    }

    fn constraints(&self) -> InputConstraints {
        InputConstraints::new(vec![FieldSpec {
            name: "prompt",
            kind: FieldKind::String,
            required: true,
            description: "What the image should depict",
        }])
    }

    async fn invoke(&self, input: Value, _ctx: &ToolContext) -> Result<ToolOutput> {
        let prompt = prompt_field(&input);
        let request = MediaRequest::new(MediaKind::Image, prompt);
        match self.generator.generate_media(&request).await {
            Ok(asset) => {
                let payload = ImagePayload {
                    url: asset.url,
                    alt: Some(prompt.to_string()),
                };
                Ok(ToolOutput::text(format!(
                    "Here is the generated image.\n{}",
                    marker_line(PayloadKind::Image, serde_json::to_string(&payload)?)
                )))
            }
            Err(e) => {
                warn!(tool = self.name(), error = %e, "media generation failed");
                Ok(ToolOutput::fallback(
                    "Image generation is unavailable right now. Please try again shortly.",
                ))
            }
        }
    }
}

/// Generates a short video from a text prompt.
pub struct GenerateVideoTool {
    generator: Arc<dyn MediaGenerator>,
}

impl GenerateVideoTool {
    pub fn new(generator: Arc<dyn MediaGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl Tool for GenerateVideoTool {
    fn name(&self) -> &str {
        "generate_video"
    }

    fn description(&self) -> &str {
        "Generate a short video clip from a text prompt and return its hosted URL"
    }

    fn constraints(&self) -> InputConstraints {
        InputConstraints::new(vec![FieldSpec {
            name: "prompt",
            kind: FieldKind::String,
            required: true,
            description: "What the clip should show",
        }])
    }

    async fn invoke(&self, input: Value, _ctx: &ToolContext) -> Result<ToolOutput> {
        let prompt = prompt_field(&input);
        let request = MediaRequest::new(MediaKind::Video, prompt);
        match self.generator.generate_media(&request).await {
            Ok(asset) => {
                let payload = VideoPayload {
                    url: asset.url,
                    caption: Some(prompt.to_string()),
                };
                Ok(ToolOutput::text(format!(
                    "Here is the generated clip.\n{}",
                    marker_line(PayloadKind::Video, serde_json::to_string(&payload)?)
                )))
            }
            Err(e) => {
                warn!(tool = self.name(), error = %e, "media generation failed");
                Ok(ToolOutput::fallback(
                    "Video generation is unavailable right now. Please try again shortly.",
                ))
            }
        }
    }
}

/// Generates a document (menu card, order sheet, price list).
pub struct GenerateDocumentTool {
    generator: Arc<dyn MediaGenerator>,
}

impl GenerateDocumentTool {
    pub fn new(generator: Arc<dyn MediaGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl Tool for GenerateDocumentTool {
    fn name(&self) -> &str {
        "generate_document"
    }

    fn description(&self) -> &str {
        "Generate a document such as a menu card or price list and return its hosted URL"
    }

    fn constraints(&self) -> InputConstraints {
        InputConstraints::new(vec![
            FieldSpec {
                name: "prompt",
                kind: FieldKind::String,
                required: true,
                description: "What the document should contain",
            },
            FieldSpec {
                name: "title",
                kind: FieldKind::String,
                required: false,
                description: "Document title",
            },
            FieldSpec {
                name: "format",
                kind: FieldKind::String,
                required: false,
                description: "Output format, e.g. 'pdf' (default)",
            },
        ])
    }

    async fn invoke(&self, input: Value, _ctx: &ToolContext) -> Result<ToolOutput> {
        let prompt = prompt_field(&input);
        let title = input.get("title").and_then(Value::as_str);
        let format = input
            .get("format")
            .and_then(Value::as_str)
            .unwrap_or("pdf");
        let request = MediaRequest::new(MediaKind::Document, prompt).with_format(format);
        match self.generator.generate_media(&request).await {
            Ok(asset) => {
                let payload = DocumentPayload {
                    url: asset.url,
                    title: title.map(str::to_string),
                    format: Some(format.to_string()),
                };
                Ok(ToolOutput::text(format!(
                    "The document is ready.\n{}",
                    marker_line(PayloadKind::Document, serde_json::to_string(&payload)?)
                )))
            }
            Err(e) => {
                warn!(tool = self.name(), error = %e, "media generation failed");
                Ok(ToolOutput::fallback(
                    "Document generation is unavailable right now. Please try again shortly.",
                ))
            }
        }
    }
}
