//! Wire records for the streaming pipeline
//!
//! Upstream, the reasoning loop produces newline-delimited `RawEvent`
//! records. Downstream, the transformation layer emits `ClientFrame`
//! records, one line each, with structured payload arrays split out of
//! the visible text.

use serde::{Deserialize, Serialize};

use super::payload::{
    DocumentPayload, ImagePayload, ListingPayload, OrganizationPayload, PayloadSet,
    ProviderPayload, SitePayload, VideoPayload,
};

/// One upstream record produced while the agent reasons.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawEvent {
    /// An incremental fragment of the agent's final message.
    Token { text: String },
    /// A tool finished; `output` is its raw rendered text, which may
    /// contain embedded marker blocks.
    ToolComplete { tool: String, output: String },
}

impl RawEvent {
    pub fn token(text: &str) -> Self {
        Self::Token {
            text: text.to_string(),
        }
    }

    pub fn tool_complete(tool: &str, output: &str) -> Self {
        Self::ToolComplete {
            tool: tool.to_string(),
            output: output.to_string(),
        }
    }
}

/// One downstream record emitted to the client.
///
/// `content` is a visible text increment. The payload arrays carry
/// structured data extracted from tool output; empty arrays are omitted
/// from the serialized form.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ClientFrame {
    pub content: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub images: Vec<ImagePayload>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub videos: Vec<VideoPayload>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub documents: Vec<DocumentPayload>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub sites: Vec<SitePayload>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub listings: Vec<ListingPayload>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub organizations: Vec<OrganizationPayload>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub providers: Vec<ProviderPayload>,
}

impl ClientFrame {
    /// Frame carrying only a text increment.
    pub fn text(content: &str) -> Self {
        Self {
            content: content.to_string(),
            ..Default::default()
        }
    }

    /// Frame carrying stripped tool-output text plus its extracted payloads.
    pub fn with_payloads(content: String, payloads: PayloadSet) -> Self {
        Self {
            content,
            images: payloads.images,
            videos: payloads.videos,
            documents: payloads.documents,
            sites: payloads.sites,
            listings: payloads.listings,
            organizations: payloads.organizations,
            providers: payloads.providers,
        }
    }

    /// True when the frame carries no payload arrays.
    pub fn is_text_only(&self) -> bool {
        self.images.is_empty()
            && self.videos.is_empty()
            && self.documents.is_empty()
            && self.sites.is_empty()
            && self.listings.is_empty()
            && self.organizations.is_empty()
            && self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_event_token_roundtrip() {
        let json = r#"{"type":"token","text":"Hello"}"#;
        let event: RawEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event, RawEvent::token("Hello"));
        assert_eq!(serde_json::to_string(&event).unwrap(), json);
    }

    #[test]
    fn test_raw_event_tool_complete() {
        let json = r#"{"type":"tool_complete","tool":"format_recipe","output":"Done."}"#;
        let event: RawEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event, RawEvent::tool_complete("format_recipe", "Done."));
    }

    #[test]
    fn test_raw_event_unknown_type_fails() {
        let result = serde_json::from_str::<RawEvent>(r#"{"type":"telemetry","ms":12}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_text_frame_omits_empty_arrays() {
        let frame = ClientFrame::text("Hello");
        let json = serde_json::to_string(&frame).unwrap();
        assert_eq!(json, r#"{"content":"Hello"}"#);
    }

    #[test]
    fn test_frame_with_image_payload() {
        let mut payloads = PayloadSet::default();
        payloads.images.push(ImagePayload {
            url: "http://x/a.png".to_string(),
            alt: None,
        });
        let frame = ClientFrame::with_payloads("Recipe found.".to_string(), payloads);
        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.contains(r#""images":[{"url":"http://x/a.png"}]"#));
        assert!(!json.contains("videos"));
        assert!(!frame.is_text_only());
    }

    #[test]
    fn test_frame_deserializes_missing_arrays_as_empty() {
        let frame: ClientFrame = serde_json::from_str(r#"{"content":"hi"}"#).unwrap();
        assert!(frame.is_text_only());
        assert_eq!(frame.content, "hi");
    }
}
