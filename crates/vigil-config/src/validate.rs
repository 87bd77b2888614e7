//! Post-merge validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::{Config, StorageBackend};

const MAX_STEPS_RANGE: std::ops::RangeInclusive<u32> = 1..=100;
const TOOL_TIMEOUT_RANGE: std::ops::RangeInclusive<u64> = 1..=600;

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_owned(),
        message: message.into(),
    }
}

/// Check ranges and cross-field rules of a merged configuration.
///
/// # Errors
///
/// Returns the first violation found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    let m = &config.model;
    match m.provider.as_str() {
        "openai" => {},
        "openai-compat" => {
            if m.api_url.as_deref().is_none_or(str::is_empty) {
                return Err(invalid(
                    "model.api_url",
                    "required when provider is 'openai-compat'",
                ));
            }
        },
        other => {
            return Err(invalid(
                "model.provider",
                format!("unsupported provider '{other}'; expected one of: openai, openai-compat"),
            ));
        },
    }
    if !(0.0..=1.0).contains(&m.temperature) {
        return Err(invalid(
            "model.temperature",
            format!("{} is out of range; must be between 0.0 and 1.0", m.temperature),
        ));
    }
    if m.max_tokens == 0 {
        return Err(invalid("model.max_tokens", "must be greater than 0"));
    }

    let o = &config.orchestrator;
    if !MAX_STEPS_RANGE.contains(&o.max_steps) {
        return Err(invalid(
            "orchestrator.max_steps",
            format!("{} is out of range; must be between 1 and 100", o.max_steps),
        ));
    }
    if !TOOL_TIMEOUT_RANGE.contains(&o.tool_timeout_secs) {
        return Err(invalid(
            "orchestrator.tool_timeout_secs",
            format!(
                "{} is out of range; must be between 1 and 600",
                o.tool_timeout_secs
            ),
        ));
    }

    if config.storage.backend == StorageBackend::File && config.storage.path.is_none() {
        return Err(invalid(
            "storage.path",
            "required when backend is 'file'",
        ));
    }

    if config.gateway.bind.parse::<std::net::SocketAddr>().is_err() {
        return Err(invalid(
            "gateway.bind",
            format!("'{}' is not a socket address", config.gateway.bind),
        ));
    }

    if !matches!(
        config.logging.format.as_str(),
        "pretty" | "compact" | "json" | "full"
    ) {
        return Err(invalid(
            "logging.format",
            format!(
                "unknown format '{}'; expected pretty, compact, json or full",
                config.logging.format
            ),
        ));
    }

    Ok(())
}
