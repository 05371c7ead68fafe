//! Site generation tool
//!
//! Renders a one-page site from a fixed template and publishes it through
//! the sites collaborator. Rendering is a pure function of the input; the
//! only side effect is the publish call.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use crate::clients::SitePublisher;
use crate::error::Result;
use crate::stream::payload::PayloadKind;

use super::types::{FieldKind, FieldSpec, InputConstraints, Tool, ToolContext, ToolOutput};

/// Derive a URL-safe slug from a title.
fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_dash = true;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

fn render_page(title: &str, tagline: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n<html>\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n\
         <body>\n<header><h1>{title}</h1><p>{tagline}</p></header>\n\
         <main>{body}</main>\n</body>\n</html>\n"
    )
}

/// Generates and publishes a one-page site.
pub struct GenerateSiteTool {
    publisher: Arc<dyn SitePublisher>,
}

impl GenerateSiteTool {
    pub fn new(publisher: Arc<dyn SitePublisher>) -> Self {
        Self { publisher }
    }
}

#[async_trait]
impl Tool for GenerateSiteTool {
    fn name(&self) -> &str {
        "generate_site"
    }

    fn description(&self) -> &str {
        "Generate and publish a one-page site for a shop, menu or offer; returns its public URL"
    }

    fn constraints(&self) -> InputConstraints {
        InputConstraints::new(vec![
            FieldSpec {
                name: "title",
                kind: FieldKind::String,
                required: true,
                description: "Site title, also used to derive the slug",
            },
            FieldSpec {
                name: "tagline",
                kind: FieldKind::String,
                required: false,
                description: "Short line shown under the title",
            },
            FieldSpec {
                name: "body",
                kind: FieldKind::String,
                required: false,
                description: "Main page content, plain text or simple markup",
            },
        ])
    }

    async fn invoke(&self, input: Value, _ctx: &ToolContext) -> Result<ToolOutput> {
        let title = input.get("title").and_then(Value::as_str).unwrap_or_default();
        let tagline = input.get("tagline").and_then(Value::as_str).unwrap_or("");
        let body = input.get("body").and_then(Value::as_str).unwrap_or("");
        let slug = slugify(title);
        let html = render_page(title, tagline, body);

        match self.publisher.publish_site(&slug, title, &html).await {
            Ok(site) => Ok(ToolOutput::text(format!(
                "The site \"{}\" is live.\n{} {}",
                title,
                PayloadKind::Site.marker(),
                serde_json::to_string(&site)?
            ))),
            Err(e) => {
                warn!(tool = self.name(), error = %e, "site publishing failed");
                Ok(ToolOutput::fallback(
                    "Site publishing is unavailable right now. Please try again shortly.",
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::MockSitePublisher;
    use crate::error::{SavoraError, UpstreamError};
    use crate::stream::{payload, SitePayload};
    use serde_json::json;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Anna's Rye Bakery"), "anna-s-rye-bakery");
        assert_eq!(slugify("  Menu 2026!  "), "menu-2026");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn test_render_page_embeds_fields() {
        let html = render_page("Rye Bakery", "Fresh daily", "We bake.");
        assert!(html.contains("<title>Rye Bakery</title>"));
        assert!(html.contains("<p>Fresh daily</p>"));
        assert!(html.contains("<main>We bake.</main>"));
    }

    #[tokio::test]
    async fn test_site_output_carries_marker_block() {
        let mut publisher = MockSitePublisher::new();
        publisher
            .expect_publish_site()
            .withf(|slug, title, html| {
                slug == "rye-bakery" && title == "Rye Bakery" && html.contains("<h1>Rye Bakery</h1>")
            })
            .returning(|slug, title, _| {
                Ok(SitePayload {
                    url: format!("https://sites.savora.dev/s/{}", slug),
                    slug: Some(slug.to_string()),
                    title: Some(title.to_string()),
                })
            });
        let tool = GenerateSiteTool::new(Arc::new(publisher));
        let output = tool
            .invoke(json!({"title": "Rye Bakery"}), &ToolContext::new())
            .await
            .unwrap();

        let (content, set) = payload::extract(&output.text);
        assert_eq!(content, "The site \"Rye Bakery\" is live.");
        assert_eq!(set.sites[0].url, "https://sites.savora.dev/s/rye-bakery");
    }

    #[tokio::test]
    async fn test_publish_failure_falls_back() {
        let mut publisher = MockSitePublisher::new();
        publisher.expect_publish_site().returning(|_, _, _| {
            Err(SavoraError::from(UpstreamError::from_status(502, "gateway")))
        });
        let tool = GenerateSiteTool::new(Arc::new(publisher));
        let output = tool
            .invoke(json!({"title": "Rye Bakery"}), &ToolContext::new())
            .await
            .unwrap();
        assert!(output.is_fallback);
    }
}
