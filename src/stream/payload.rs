//! Embedded payload blocks
//!
//! Tool output is human-readable text that may embed structured payloads,
//! one per line, introduced by a closed vocabulary of marker tokens:
//!
//! ```text
//! Recipe found.
//! ---
//! **META_IMAGE:** {"url":"http://x/a.png"}
//! ```
//!
//! `extract` strips every recognized marker line out of the text and
//! decodes its payload. The first successfully decoded block of each kind
//! wins; later lines of the same kind, and lines whose data does not
//! decode, are left in the text untouched.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// The closed set of payload kinds recognized in tool output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Image,
    Video,
    Document,
    Site,
    Listings,
    Organizations,
    Providers,
}

impl PayloadKind {
    pub const ALL: [PayloadKind; 7] = [
        PayloadKind::Image,
        PayloadKind::Video,
        PayloadKind::Document,
        PayloadKind::Site,
        PayloadKind::Listings,
        PayloadKind::Organizations,
        PayloadKind::Providers,
    ];

    /// The marker token that introduces a block of this kind.
    pub fn marker(&self) -> &'static str {
        match self {
            PayloadKind::Image => "**META_IMAGE:**",
            PayloadKind::Video => "**META_VIDEO:**",
            PayloadKind::Document => "**META_DOCUMENT:**",
            PayloadKind::Site => "**META_SITE:**",
            PayloadKind::Listings => "**META_LISTINGS:**",
            PayloadKind::Organizations => "**META_ORGANIZATIONS:**",
            PayloadKind::Providers => "**META_PROVIDERS:**",
        }
    }
}

impl std::fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PayloadKind::Image => "image",
            PayloadKind::Video => "video",
            PayloadKind::Document => "document",
            PayloadKind::Site => "site",
            PayloadKind::Listings => "listings",
            PayloadKind::Organizations => "organizations",
            PayloadKind::Providers => "providers",
        };
        write!(f, "{}", name)
    }
}

/// A generated or referenced image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImagePayload {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub alt: Option<String>,
}

/// A generated video.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoPayload {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub caption: Option<String>,
}

/// A generated document (menu card, order sheet, price list).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentPayload {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub format: Option<String>,
}

/// A generated site published under the public base URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SitePayload {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub title: Option<String>,
}

/// One marketplace listing record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListingPayload {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub vendor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub url: Option<String>,
}

/// One marketplace organization record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrganizationPayload {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub url: Option<String>,
}

/// One marketplace service-provider record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderPayload {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub specialty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub rating: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub url: Option<String>,
}

/// Decoded payloads extracted from one tool output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PayloadSet {
    pub images: Vec<ImagePayload>,
    pub videos: Vec<VideoPayload>,
    pub documents: Vec<DocumentPayload>,
    pub sites: Vec<SitePayload>,
    pub listings: Vec<ListingPayload>,
    pub organizations: Vec<OrganizationPayload>,
    pub providers: Vec<ProviderPayload>,
}

impl PayloadSet {
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
            && self.videos.is_empty()
            && self.documents.is_empty()
            && self.sites.is_empty()
            && self.listings.is_empty()
            && self.organizations.is_empty()
            && self.providers.is_empty()
    }

    fn has(&self, kind: PayloadKind) -> bool {
        match kind {
            PayloadKind::Image => !self.images.is_empty(),
            PayloadKind::Video => !self.videos.is_empty(),
            PayloadKind::Document => !self.documents.is_empty(),
            PayloadKind::Site => !self.sites.is_empty(),
            PayloadKind::Listings => !self.listings.is_empty(),
            PayloadKind::Organizations => !self.organizations.is_empty(),
            PayloadKind::Providers => !self.providers.is_empty(),
        }
    }

    /// Decode `data` as a payload of `kind` and capture it.
    fn capture(&mut self, kind: PayloadKind, data: &str) -> std::result::Result<(), serde_json::Error> {
        match kind {
            PayloadKind::Image => self.images.push(serde_json::from_str(data)?),
            PayloadKind::Video => self.videos.push(serde_json::from_str(data)?),
            PayloadKind::Document => self.documents.push(serde_json::from_str(data)?),
            PayloadKind::Site => self.sites.push(serde_json::from_str(data)?),
            PayloadKind::Listings => self.listings = serde_json::from_str(data)?,
            PayloadKind::Organizations => self.organizations = serde_json::from_str(data)?,
            PayloadKind::Providers => self.providers = serde_json::from_str(data)?,
        }
        Ok(())
    }
}

/// Match a line against the marker vocabulary.
///
/// A marker is only recognized at the start of a line (leading whitespace
/// allowed); the rest of the line is the structured data.
fn match_marker(line: &str) -> Option<(PayloadKind, &str)> {
    let trimmed = line.trim_start();
    for kind in PayloadKind::ALL {
        if let Some(rest) = trimmed.strip_prefix(kind.marker()) {
            return Some((kind, rest.trim()));
        }
    }
    None
}

/// Strip every recognized payload block out of `raw`.
///
/// Returns the remaining visible text and the decoded payloads. Removing a
/// block removes its whole line and the newline joining it to its
/// neighbor; all other text is preserved verbatim. Duplicate blocks of an
/// already-captured kind and blocks whose data does not decode are kept
/// in the text and logged.
pub fn extract(raw: &str) -> (String, PayloadSet) {
    let mut set = PayloadSet::default();
    let mut kept: Vec<&str> = Vec::new();

    for line in raw.split('\n') {
        let Some((kind, data)) = match_marker(line) else {
            kept.push(line);
            continue;
        };
        if set.has(kind) {
            warn!(kind = %kind, "duplicate payload block; keeping line as text");
            kept.push(line);
            continue;
        }
        match set.capture(kind, data) {
            Ok(()) => {}
            Err(e) => {
                warn!(kind = %kind, error = %e, "undecodable payload block; keeping line as text");
                kept.push(line);
            }
        }
    }

    (kept.join("\n"), set)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_untouched() {
        let raw = "No markers here.\nJust two lines.";
        let (content, set) = extract(raw);
        assert_eq!(content, raw);
        assert!(set.is_empty());
    }

    #[test]
    fn test_image_block_stripped() {
        let raw = "Recipe found.\n---\n**META_IMAGE:** {\"url\":\"http://x/a.png\"}";
        let (content, set) = extract(raw);
        assert_eq!(content, "Recipe found.\n---");
        assert_eq!(set.images.len(), 1);
        assert_eq!(set.images[0].url, "http://x/a.png");
    }

    #[test]
    fn test_marker_in_middle_removes_joining_newline() {
        let raw = "before\n**META_SITE:** {\"url\":\"https://sites.savora.dev/s/abc\"}\nafter";
        let (content, set) = extract(raw);
        assert_eq!(content, "before\nafter");
        assert_eq!(set.sites[0].url, "https://sites.savora.dev/s/abc");
    }

    #[test]
    fn test_two_kinds_in_one_output() {
        let raw = concat!(
            "Here you go.\n",
            "**META_IMAGE:** {\"url\":\"http://x/1.png\",\"alt\":\"loaf\"}\n",
            "**META_DOCUMENT:** {\"url\":\"http://x/menu.pdf\",\"title\":\"Menu\"}"
        );
        let (content, set) = extract(raw);
        assert_eq!(content, "Here you go.");
        assert_eq!(set.images[0].alt.as_deref(), Some("loaf"));
        assert_eq!(set.documents[0].title.as_deref(), Some("Menu"));
    }

    #[test]
    fn test_duplicate_kind_first_match_wins() {
        let raw = concat!(
            "**META_IMAGE:** {\"url\":\"http://x/first.png\"}\n",
            "**META_IMAGE:** {\"url\":\"http://x/second.png\"}"
        );
        let (content, set) = extract(raw);
        assert_eq!(set.images.len(), 1);
        assert_eq!(set.images[0].url, "http://x/first.png");
        assert!(content.contains("second.png"));
    }

    #[test]
    fn test_malformed_block_degrades_to_text() {
        let raw = "Almost.\n**META_IMAGE:** {not json";
        let (content, set) = extract(raw);
        assert_eq!(content, raw);
        assert!(set.is_empty());
    }

    #[test]
    fn test_listing_set_block() {
        let raw = concat!(
            "Found 2 listings.\n",
            "**META_LISTINGS:** [",
            "{\"id\":\"l1\",\"title\":\"Rye starter\",\"price\":12.5,\"currency\":\"EUR\"},",
            "{\"id\":\"l2\",\"title\":\"Spelt flour\"}",
            "]"
        );
        let (content, set) = extract(raw);
        assert_eq!(content, "Found 2 listings.");
        assert_eq!(set.listings.len(), 2);
        assert_eq!(set.listings[0].price, Some(12.5));
        assert!(set.listings[1].vendor.is_none());
    }

    #[test]
    fn test_marker_mid_line_is_not_a_block() {
        let raw = "The token **META_IMAGE:** introduces a block.";
        let (content, set) = extract(raw);
        assert_eq!(content, raw);
        assert!(set.is_empty());
    }

    #[test]
    fn test_indented_marker_recognized() {
        let raw = "  **META_VIDEO:** {\"url\":\"http://x/v.mp4\"}";
        let (content, set) = extract(raw);
        assert_eq!(content, "");
        assert_eq!(set.videos[0].url, "http://x/v.mp4");
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let raw = "Recipe found.\n---\n**META_IMAGE:** {\"url\":\"http://x/a.png\"}";
        let (content, _) = extract(raw);
        let (again, set) = extract(&content);
        assert_eq!(again, content);
        assert!(set.is_empty());
    }
}
