//! Configuration type definitions for Savora
//!
//! All types implement serde traits for JSON serialization and have sensible
//! defaults, so a missing config file yields a runnable (if credential-less)
//! configuration.

use serde::{Deserialize, Serialize};

/// Main configuration struct for Savora
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Reasoning defaults (model, tokens, iterations)
    pub reasoning: ReasoningConfig,
    /// Model provider credentials (the reasoning + text-generation collaborator)
    pub model: ModelConfig,
    /// Binary-generation collaborator (images, videos, documents)
    pub generation: GenerationConfig,
    /// Listing-search collaborator (marketplace records)
    pub marketplace: MarketplaceConfig,
    /// Generated-site publishing settings
    pub sites: SitesConfig,
    /// Thread storage settings
    pub threads: ThreadsConfig,
}

/// Reasoning loop defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningConfig {
    /// Default model identifier
    pub model: String,
    /// Maximum tokens per model response
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum tool-invocation iterations per request
    pub max_tool_iterations: usize,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 4096,
            temperature: 0.7,
            max_tool_iterations: 8,
        }
    }
}

/// Model provider configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// API key for the model provider
    pub api_key: Option<String>,
    /// Override for the API base URL
    pub api_base: Option<String>,
}

/// Binary-generation collaborator configuration.
///
/// Required by the creative tier (image/video/document generation). When the
/// API key is absent the creative and marketplace agents are refused at
/// startup rather than failing per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// API key for the generation service
    pub api_key: Option<String>,
    /// Base URL of the generation service
    pub api_base: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: "https://gen.savora.dev/v1".to_string(),
        }
    }
}

/// Listing-search collaborator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketplaceConfig {
    /// Base URL of the listing search service
    pub api_base: String,
    /// Maximum records returned per search
    pub max_results: usize,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            api_base: "https://market.savora.dev/v1".to_string(),
            max_results: 10,
        }
    }
}

/// Generated-site publishing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SitesConfig {
    /// Public base URL under which generated sites are served
    pub public_base: String,
}

impl Default for SitesConfig {
    fn default() -> Self {
        Self {
            public_base: "https://sites.savora.dev".to_string(),
        }
    }
}

/// Thread storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadsConfig {
    /// Persist threads to disk (false = in-memory only)
    pub persist: bool,
    /// Override for the storage directory (default: ~/.savora/threads)
    pub storage_dir: Option<String>,
}

impl Default for ThreadsConfig {
    fn default() -> Self {
        Self {
            persist: true,
            storage_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.reasoning.max_tool_iterations, 8);
        assert!(config.model.api_key.is_none());
        assert!(config.generation.api_key.is_none());
        assert_eq!(config.marketplace.max_results, 10);
        assert!(config.threads.persist);
    }

    #[test]
    fn test_config_deserialize_partial() {
        // Missing sections fall back to defaults
        let json = r#"{"reasoning": {"max_tokens": 1024}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.reasoning.max_tokens, 1024);
        // Untouched fields keep their defaults
        assert_eq!(config.reasoning.max_tool_iterations, 8);
        assert_eq!(config.marketplace.max_results, 10);
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.model.api_key = Some("sk-test".to_string());
        config.marketplace.max_results = 5;

        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.model.api_key.as_deref(), Some("sk-test"));
        assert_eq!(parsed.marketplace.max_results, 5);
    }
}
