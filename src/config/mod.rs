//! Configuration management for Savora
//!
//! Configuration is loaded from `~/.savora/config.json` with environment
//! variable overrides following the pattern `SAVORA_SECTION_KEY`.

mod types;

pub use types::*;

use crate::error::Result;
use std::path::PathBuf;

impl Config {
    /// Returns the Savora configuration directory path (~/.savora)
    pub fn dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".savora")
    }

    /// Returns the path to the config file (~/.savora/config.json)
    pub fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load configuration from the default path with environment overrides.
    ///
    /// If the config file doesn't exist, returns default configuration.
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::path())
    }

    /// Load configuration from a specific path with environment overrides.
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content)?
        } else {
            Config::default()
        };

        config.apply_env_overrides();

        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables follow the pattern: SAVORA_SECTION_KEY
    fn apply_env_overrides(&mut self) {
        // Reasoning defaults
        if let Ok(val) = std::env::var("SAVORA_REASONING_MODEL") {
            self.reasoning.model = val;
        }
        if let Ok(val) = std::env::var("SAVORA_REASONING_MAX_TOKENS") {
            if let Ok(v) = val.parse() {
                self.reasoning.max_tokens = v;
            }
        }
        if let Ok(val) = std::env::var("SAVORA_REASONING_TEMPERATURE") {
            if let Ok(v) = val.parse() {
                self.reasoning.temperature = v;
            }
        }
        if let Ok(val) = std::env::var("SAVORA_REASONING_MAX_TOOL_ITERATIONS") {
            if let Ok(v) = val.parse() {
                self.reasoning.max_tool_iterations = v;
            }
        }

        // Model provider
        if let Ok(val) = std::env::var("SAVORA_MODEL_API_KEY") {
            self.model.api_key = Some(val);
        }
        if let Ok(val) = std::env::var("SAVORA_MODEL_API_BASE") {
            self.model.api_base = Some(val);
        }

        // Generation service
        if let Ok(val) = std::env::var("SAVORA_GENERATION_API_KEY") {
            self.generation.api_key = Some(val);
        }
        if let Ok(val) = std::env::var("SAVORA_GENERATION_API_BASE") {
            self.generation.api_base = val;
        }

        // Marketplace search
        if let Ok(val) = std::env::var("SAVORA_MARKETPLACE_API_BASE") {
            self.marketplace.api_base = val;
        }
        if let Ok(val) = std::env::var("SAVORA_MARKETPLACE_MAX_RESULTS") {
            if let Ok(v) = val.parse() {
                self.marketplace.max_results = v;
            }
        }

        // Sites
        if let Ok(val) = std::env::var("SAVORA_SITES_PUBLIC_BASE") {
            self.sites.public_base = val;
        }

        // Threads
        if let Ok(val) = std::env::var("SAVORA_THREADS_STORAGE_DIR") {
            self.threads.storage_dir = Some(val);
        }
    }

    /// Resolved thread storage directory.
    pub fn thread_storage_dir(&self) -> PathBuf {
        self.threads
            .storage_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| Self::dir().join("threads"))
    }

    /// Whether the model collaborator has a credential.
    ///
    /// Required by every agent tier: without it the process serves no agents.
    pub fn model_serviceable(&self) -> bool {
        self.model
            .api_key
            .as_deref()
            .map(|k| !k.is_empty())
            .unwrap_or(false)
    }

    /// Whether the binary-generation collaborator has a credential.
    ///
    /// Required by the creative and marketplace tiers.
    pub fn generation_serviceable(&self) -> bool {
        self.generation
            .api_key
            .as_deref()
            .map(|k| !k.is_empty())
            .unwrap_or(false)
    }
}
