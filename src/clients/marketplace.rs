//! Marketplace search client
//!
//! Query-in, ranked-records-out search over listings, organizations and
//! service providers. Result counts are bounded by the configured
//! maximum; the relational store behind the service is out of scope here.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::{Result, SavoraError, UpstreamError};
use crate::stream::{ListingPayload, OrganizationPayload, ProviderPayload};

/// Marketplace search behind a trait seam.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ListingSearch: Send + Sync {
    async fn search_listings(&self, query: &str, limit: usize) -> Result<Vec<ListingPayload>>;
    async fn search_organizations(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<OrganizationPayload>>;
    async fn search_providers(&self, query: &str, limit: usize) -> Result<Vec<ProviderPayload>>;
}

/// HTTP client for the marketplace search service.
pub struct MarketplaceClient {
    client: Client,
    api_base: String,
}

#[derive(Deserialize)]
struct SearchResponse<T> {
    results: Vec<T>,
}

impl MarketplaceClient {
    pub fn new(api_base: &str) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    async fn search<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<T>> {
        let response = self
            .client
            .get(format!("{}/{}", self.api_base, path))
            .query(&[("query", query), ("limit", &limit.to_string())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SavoraError::from(UpstreamError::from_status(status, &body)));
        }

        let parsed: SearchResponse<T> = response.json().await?;
        Ok(parsed.results)
    }
}

#[async_trait]
impl ListingSearch for MarketplaceClient {
    async fn search_listings(&self, query: &str, limit: usize) -> Result<Vec<ListingPayload>> {
        self.search("listings", query, limit).await
    }

    async fn search_organizations(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<OrganizationPayload>> {
        self.search("organizations", query, limit).await
    }

    async fn search_providers(&self, query: &str, limit: usize) -> Result<Vec<ProviderPayload>> {
        self.search("providers", query, limit).await
    }
}
