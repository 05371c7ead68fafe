//! Marketplace search tools
//!
//! The marketplace tier: listing, organization and provider search. Each
//! tool renders a short summary line and appends the result set as a
//! marker block; an empty result set produces plain text with no block.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use crate::clients::ListingSearch;
use crate::error::Result;
use crate::stream::payload::PayloadKind;

use super::types::{FieldKind, FieldSpec, InputConstraints, Tool, ToolContext, ToolOutput};

fn search_constraints(what: &'static str) -> InputConstraints {
    InputConstraints::new(vec![
        FieldSpec {
            name: "query",
            kind: FieldKind::String,
            required: true,
            description: what,
        },
        FieldSpec {
            name: "limit",
            kind: FieldKind::Integer,
            required: false,
            description: "Maximum number of results (capped by configuration)",
        },
    ])
}

fn query_field(input: &Value) -> &str {
    input.get("query").and_then(Value::as_str).unwrap_or_default()
}

fn limit_field(input: &Value, max_results: usize) -> usize {
    input
        .get("limit")
        .and_then(Value::as_u64)
        .map(|limit| limit as usize)
        .unwrap_or(max_results)
        .min(max_results)
}

fn render_results<T: serde::Serialize>(
    noun: &str,
    query: &str,
    kind: PayloadKind,
    results: &[T],
) -> Result<ToolOutput> {
    if results.is_empty() {
        return Ok(ToolOutput::text(format!(
            "No {} matched \"{}\".",
            noun, query
        )));
    }
    Ok(ToolOutput::text(format!(
        "Found {} {} for \"{}\".\n{} {}",
        results.len(),
        noun,
        query,
        kind.marker(),
        serde_json::to_string(results)?
    )))
}

fn unavailable(noun: &str) -> ToolOutput {
    ToolOutput::fallback(format!(
        "The {} search is unavailable right now. Please try again shortly.",
        noun
    ))
}

/// Searches marketplace listings.
pub struct SearchListingsTool {
    search: Arc<dyn ListingSearch>,
    max_results: usize,
}

impl SearchListingsTool {
    pub fn new(search: Arc<dyn ListingSearch>, max_results: usize) -> Self {
        Self {
            search,
            max_results,
        }
    }
}

#[async_trait]
impl Tool for SearchListingsTool {
    fn name(&self) -> &str {
        "search_listings"
    }

    fn description(&self) -> &str {
        "Search marketplace listings for ingredients, products and equipment"
    }

    fn constraints(&self) -> InputConstraints {
        search_constraints("What to look for, e.g. 'organic rye flour'")
    }

    async fn invoke(&self, input: Value, _ctx: &ToolContext) -> Result<ToolOutput> {
        let query = query_field(&input);
        let limit = limit_field(&input, self.max_results);
        match self.search.search_listings(query, limit).await {
            Ok(results) => render_results("listings", query, PayloadKind::Listings, &results),
            Err(e) => {
                warn!(tool = self.name(), error = %e, "marketplace search failed");
                Ok(unavailable("listing"))
            }
        }
    }
}

/// Searches marketplace organizations.
pub struct SearchOrganizationsTool {
    search: Arc<dyn ListingSearch>,
    max_results: usize,
}

impl SearchOrganizationsTool {
    pub fn new(search: Arc<dyn ListingSearch>, max_results: usize) -> Self {
        Self {
            search,
            max_results,
        }
    }
}

#[async_trait]
impl Tool for SearchOrganizationsTool {
    fn name(&self) -> &str {
        "search_organizations"
    }

    fn description(&self) -> &str {
        "Search marketplace organizations such as bakeries, farms and cooperatives"
    }

    fn constraints(&self) -> InputConstraints {
        search_constraints("What kind of organization to look for")
    }

    async fn invoke(&self, input: Value, _ctx: &ToolContext) -> Result<ToolOutput> {
        let query = query_field(&input);
        let limit = limit_field(&input, self.max_results);
        match self.search.search_organizations(query, limit).await {
            Ok(results) => {
                render_results("organizations", query, PayloadKind::Organizations, &results)
            }
            Err(e) => {
                warn!(tool = self.name(), error = %e, "marketplace search failed");
                Ok(unavailable("organization"))
            }
        }
    }
}

/// Searches marketplace service providers.
pub struct SearchProvidersTool {
    search: Arc<dyn ListingSearch>,
    max_results: usize,
}

impl SearchProvidersTool {
    pub fn new(search: Arc<dyn ListingSearch>, max_results: usize) -> Self {
        Self {
            search,
            max_results,
        }
    }
}

#[async_trait]
impl Tool for SearchProvidersTool {
    fn name(&self) -> &str {
        "search_providers"
    }

    fn description(&self) -> &str {
        "Search marketplace service providers such as caterers and private chefs"
    }

    fn constraints(&self) -> InputConstraints {
        search_constraints("What kind of service provider to look for")
    }

    async fn invoke(&self, input: Value, _ctx: &ToolContext) -> Result<ToolOutput> {
        let query = query_field(&input);
        let limit = limit_field(&input, self.max_results);
        match self.search.search_providers(query, limit).await {
            Ok(results) => render_results("providers", query, PayloadKind::Providers, &results),
            Err(e) => {
                warn!(tool = self.name(), error = %e, "marketplace search failed");
                Ok(unavailable("provider"))
            }
        }
    }
}
