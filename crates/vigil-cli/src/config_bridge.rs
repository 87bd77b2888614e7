//! Bridge from `vigil_config::Config` to domain types.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use vigil_config::{Config, StorageBackend};
use vigil_llm::{LlmProvider, OpenAiCompatProvider};
use vigil_orchestrator::OrchestratorConfig;
use vigil_storage::{JsonFileOrderStore, MemoryOrderStore, OrderStore};
use vigil_telemetry::{LogConfig, LogFormat};
use vigil_tools::{MarketDataClient, StockToolset, WebSearchTool};

/// Logging settings, with `verbose` forcing `debug`.
pub(crate) fn to_log_config(cfg: &Config, verbose: bool) -> LogConfig {
    let format = cfg
        .logging
        .format
        .parse::<LogFormat>()
        .unwrap_or(LogFormat::Compact);
    let level = if verbose { "debug" } else { cfg.logging.level.as_str() };

    cfg.logging
        .directives
        .iter()
        .fold(LogConfig::new(level).with_format(format), |lc, d| {
            lc.with_directive(d.as_str())
        })
}

pub(crate) fn to_orchestrator_config(cfg: &Config) -> OrchestratorConfig {
    OrchestratorConfig::default()
        .with_max_steps(cfg.orchestrator.max_steps)
        .with_tool_timeout(Duration::from_secs(cfg.orchestrator.tool_timeout_secs))
}

/// The reasoning-loop provider named by `[model]`.
pub(crate) fn build_provider(cfg: &Config) -> Result<Arc<dyn LlmProvider>> {
    let m = &cfg.model;
    let provider = match (m.provider.as_str(), m.api_url.as_deref()) {
        ("openai-compat", Some(url)) => {
            OpenAiCompatProvider::custom(url, m.api_key.as_deref(), &m.model)
        },
        ("openai", _) => {
            let key = m
                .api_key
                .as_deref()
                .filter(|k| !k.is_empty())
                .context("no API key configured; set model.api_key or OPENAI_API_KEY")?;
            OpenAiCompatProvider::openai(key, &m.model)
        },
        (other, _) => bail!("unsupported model provider '{other}'"),
    };
    Ok(Arc::new(
        provider
            .with_max_tokens(m.max_tokens)
            .with_temperature(m.temperature),
    ))
}

pub(crate) fn build_store(cfg: &Config) -> Result<Arc<dyn OrderStore>> {
    match (cfg.storage.backend, &cfg.storage.path) {
        (StorageBackend::Memory, _) => Ok(Arc::new(MemoryOrderStore::new())),
        (StorageBackend::File, Some(path)) => {
            let store = JsonFileOrderStore::open(path)
                .with_context(|| format!("failed to open order store at {}", path.display()))?;
            Ok(Arc::new(store))
        },
        (StorageBackend::File, None) => bail!("storage.path is required for the file backend"),
    }
}

pub(crate) fn build_toolset(cfg: &Config) -> Result<StockToolset> {
    let market = MarketDataClient::new(
        cfg.market_data.base_url.clone(),
        cfg.market_data.api_key.clone(),
    );
    let search = WebSearchTool::new(cfg.search.url.clone(), cfg.search.api_key.clone());
    Ok(StockToolset::new(market, search, build_store(cfg)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_forces_debug() {
        let mut cfg = Config::default();
        cfg.logging.directives = vec!["hyper=warn".into()];
        let lc = to_log_config(&cfg, true);
        assert_eq!(lc.level, "debug");
        assert_eq!(lc.directives, vec!["hyper=warn".to_string()]);
        assert_eq!(lc.format, LogFormat::Pretty);
    }

    #[test]
    fn test_orchestrator_bounds() {
        let mut cfg = Config::default();
        cfg.orchestrator.max_steps = 4;
        cfg.orchestrator.tool_timeout_secs = 7;
        let oc = to_orchestrator_config(&cfg);
        assert_eq!(oc.max_steps, 4);
        assert_eq!(oc.tool_timeout, Duration::from_secs(7));
    }

    #[test]
    fn test_openai_needs_key() {
        let mut cfg = Config::default();
        cfg.model.api_key = None;
        assert!(build_provider(&cfg).is_err());
        cfg.model.api_key = Some("sk-test".into());
        assert!(build_provider(&cfg).is_ok());
    }

    #[tokio::test]
    async fn test_file_store_is_opened() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = Config::default();
        cfg.storage.backend = StorageBackend::File;
        cfg.storage.path = Some(dir.path().join("orders.json"));

        let store = build_store(&cfg).unwrap();
        assert!(store.get_by_user("nobody").await.unwrap().is_empty());
    }
}
