//! Configuration management for askdb.
//!
//! Handles loading configuration from TOML files and environment variables:
//! the LLM provider, the query service endpoint, and pipeline tuning
//! (page size, timeout, sensitive columns).

use crate::error::{AskdbError, Result};
use crate::safety::DEFAULT_SENSITIVE_COLUMNS;
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// LLM provider configuration.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Remote query service configuration.
    #[serde(default)]
    pub query_service: QueryServiceConfig,

    /// Pipeline tuning.
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// LLM provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// LLM provider: "openai" or "mock".
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model name (e.g., "gpt-4o-mini").
    #[serde(default = "default_model")]
    pub model: String,
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
        }
    }
}

/// Remote query service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryServiceConfig {
    /// Base URL of the query service (`/query` and `/schema` hang off it).
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

fn default_endpoint() -> String {
    "http://localhost:9090".to_string()
}

impl Default for QueryServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
        }
    }
}

/// Pipeline tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Rows per page for result cursors.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Deadline in seconds for one query service call.
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,

    /// Column identifiers blocked by the safety validator.
    #[serde(default = "default_sensitive_columns")]
    pub sensitive_columns: Vec<String>,
}

fn default_page_size() -> usize {
    20
}

fn default_query_timeout_secs() -> u64 {
    8
}

fn default_sensitive_columns() -> Vec<String> {
    DEFAULT_SENSITIVE_COLUMNS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            query_timeout_secs: default_query_timeout_secs(),
            sensitive_columns: default_sensitive_columns(),
        }
    }
}

impl Config {
    /// Loads configuration from a TOML file.
    ///
    /// A missing file yields the default configuration.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| AskdbError::config(format!("Failed to read config file: {e}")))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| AskdbError::config(format!("Invalid config file: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Applies environment variable overrides.
    ///
    /// `ASKDB_QUERY_SERVICE` overrides the endpoint, `ASKDB_PAGE_SIZE` the
    /// page size, and `OPENAI_MODEL` the model name.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(endpoint) = std::env::var("ASKDB_QUERY_SERVICE") {
            self.query_service.endpoint = endpoint;
        }
        if let Ok(page_size) = std::env::var("ASKDB_PAGE_SIZE") {
            if let Ok(n) = page_size.parse() {
                self.pipeline.page_size = n;
            }
        }
        if let Ok(model) = std::env::var("OPENAI_MODEL") {
            self.llm.model = model;
        }
    }

    /// Validates field values that can be wrong even when the TOML parses.
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.query_service.endpoint).map_err(|e| {
            AskdbError::config(format!(
                "Invalid query service endpoint '{}': {e}",
                self.query_service.endpoint
            ))
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(AskdbError::config(format!(
                "Invalid scheme '{}' for query service endpoint. Expected http or https",
                url.scheme()
            )));
        }

        if self.pipeline.page_size == 0 {
            return Err(AskdbError::config("page_size must be at least 1"));
        }

        if self.pipeline.query_timeout_secs == 0 {
            return Err(AskdbError::config("query_timeout_secs must be at least 1"));
        }

        Ok(())
    }
}
