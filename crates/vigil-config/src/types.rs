//! Configuration types.
//!
//! Every section has serde defaults, so a partial table from any layer
//! deserializes. Secrets are skipped by `Debug`.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The whole configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Reasoning-loop provider.
    pub model: ModelConfig,
    /// Loop bounds.
    pub orchestrator: OrchestratorSection,
    /// Quote and fundamentals API.
    pub market_data: MarketDataConfig,
    /// Web search API.
    pub search: SearchConfig,
    /// Order store.
    pub storage: StorageConfig,
    /// HTTP surface.
    pub gateway: GatewayConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

impl Config {
    /// The configuration without secrets, for display.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.model.api_key = None;
        copy.market_data.api_key = None;
        copy.search.api_key = None;
        copy
    }

    /// Render [`redacted`](Self::redacted) as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_redacted_toml(&self) -> crate::ConfigResult<String> {
        Ok(toml::to_string_pretty(&self.redacted())?)
    }
}

/// `[model]`
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// `openai` or `openai-compat`.
    pub provider: String,
    /// Model identifier.
    pub model: String,
    /// API key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Endpoint override; required for `openai-compat`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    /// Completion token cap.
    pub max_tokens: usize,
    /// Sampling temperature.
    pub temperature: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o".to_string(),
            api_key: None,
            api_url: None,
            max_tokens: 4096,
            temperature: 0.7,
        }
    }
}

impl fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_url", &self.api_url)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .finish()
    }
}

/// `[orchestrator]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorSection {
    /// Provider streams allowed per request.
    pub max_steps: u32,
    /// Per-call executor timeout.
    pub tool_timeout_secs: u64,
}

impl Default for OrchestratorSection {
    fn default() -> Self {
        Self {
            max_steps: 10,
            tool_timeout_secs: 30,
        }
    }
}

/// `[market_data]`
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketDataConfig {
    /// API root.
    pub base_url: String,
    /// API key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            base_url: "https://financialmodelingprep.com/api/v3".to_string(),
            api_key: None,
        }
    }
}

impl fmt::Debug for MarketDataConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarketDataConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// `[search]`
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Search endpoint.
    pub url: String,
    /// API key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            url: "https://api.tavily.com/search".to_string(),
            api_key: None,
        }
    }
}

impl fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchConfig")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Where orders are kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process memory; lost on exit.
    #[default]
    Memory,
    /// One JSON document on disk.
    File,
}

/// `[storage]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend.
    pub backend: StorageBackend,
    /// File path for the `file` backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// `[gateway]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listen address.
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
        }
    }
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base level.
    pub level: String,
    /// `pretty`, `compact`, `json` or `full`.
    pub format: String,
    /// Extra filter directives.
    pub directives: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            directives: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_keys() {
        let mut config = Config::default();
        config.model.api_key = Some("sk-secret".into());
        config.search.api_key = Some("tvly-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(!debug.contains("tvly-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_redacted_toml_omits_keys() {
        let mut config = Config::default();
        config.market_data.api_key = Some("fmp-secret".into());
        let rendered = config.to_redacted_toml().unwrap();
        assert!(!rendered.contains("fmp-secret"));
        assert!(rendered.contains("[market_data]"));
    }

    #[test]
    fn test_partial_section_uses_defaults() {
        let config: Config = toml::from_str("[orchestrator]\nmax_steps = 3\n").unwrap();
        assert_eq!(config.orchestrator.max_steps, 3);
        assert_eq!(config.orchestrator.tool_timeout_secs, 30);
        assert_eq!(config.model.model, "gpt-4o");
    }
}
