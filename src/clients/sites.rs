//! Site publishing client
//!
//! Generated sites are rendered locally from templates and published to
//! the sites service, which hosts them under the configured public base
//! URL. Page content travels base64-encoded so markup never fights JSON
//! escaping on the wire.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SavoraError, UpstreamError};
use crate::stream::SitePayload;

/// Site publishing behind a trait seam.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SitePublisher: Send + Sync {
    /// Publish rendered markup under `slug`; returns the hosted site.
    async fn publish_site(&self, slug: &str, title: &str, html: &str) -> Result<SitePayload>;
}

/// HTTP client for the sites service.
pub struct SitesClient {
    client: Client,
    api_key: String,
    public_base: String,
}

#[derive(Serialize)]
struct PublishRequest<'a> {
    slug: &'a str,
    title: &'a str,
    content_base64: String,
}

#[derive(Deserialize)]
struct PublishResponse {
    path: String,
}

impl SitesClient {
    pub fn new(api_key: &str, public_base: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            public_base: public_base.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl SitePublisher for SitesClient {
    async fn publish_site(&self, slug: &str, title: &str, html: &str) -> Result<SitePayload> {
        let request = PublishRequest {
            slug,
            title,
            content_base64: BASE64.encode(html.as_bytes()),
        };
        let response = self
            .client
            .post(format!("{}/publish", self.public_base))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SavoraError::from(UpstreamError::from_status(status, &body)));
        }

        let published: PublishResponse = response.json().await?;
        Ok(SitePayload {
            url: format!("{}{}", self.public_base, published.path),
            slug: Some(slug.to_string()),
            title: Some(title.to_string()),
        })
    }
}
