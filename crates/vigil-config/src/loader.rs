//! Config file discovery and layered loading.
//!
//! 1. Parse embedded `defaults.toml`
//! 2. Merge `/etc/vigil/config.toml`
//! 3. Merge `~/.vigil/config.toml`
//! 4. Merge `{workspace}/.vigil/config.toml`
//! 5. Merge an explicit `--config` file, if given
//! 6. Fill unset fields from the environment
//! 7. Resolve `${VAR}` references, deserialize, validate

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::{apply_env_fallbacks, collect_env_vars, resolve_env_references};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::{ConfigLayer, FieldSources, deep_merge_tracking, record_leaves};
use crate::types::Config;
use crate::validate::validate;

const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Refuse config files larger than this.
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Where to look for configuration.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Project root holding `.vigil/config.toml`.
    pub workspace_root: Option<PathBuf>,
    /// Directory used instead of `~/.vigil`.
    pub home_override: Option<PathBuf>,
    /// A file that overrides every discovered layer.
    pub explicit_file: Option<PathBuf>,
    /// Skip `/etc/vigil/config.toml`.
    pub skip_system: bool,
    /// Read only the explicit file; skip system, user and workspace.
    pub explicit_only: bool,
}

/// A loaded configuration and where its values came from.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The configuration.
    pub config: Config,
    /// Layer of every field set above the defaults.
    pub field_sources: FieldSources,
    /// Files that contributed, lowest precedence first.
    pub loaded_files: Vec<String>,
}

/// Load with explicit discovery options.
///
/// # Errors
///
/// Returns a [`ConfigError`] if a file is malformed or validation fails.
pub fn load_with(options: &LoadOptions) -> ConfigResult<ResolvedConfig> {
    let env_vars = collect_env_vars();

    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;
    let mut sources = FieldSources::new();
    record_leaves(&merged, "", ConfigLayer::Defaults, &mut sources);
    let mut loaded_files = Vec::new();

    let mut layers: Vec<(PathBuf, ConfigLayer)> = Vec::new();
    if !options.explicit_only {
        if !options.skip_system {
            layers.push((PathBuf::from("/etc/vigil/config.toml"), ConfigLayer::System));
        }
        let user_dir = match &options.home_override {
            Some(dir) => dir.clone(),
            None => home_directory()?.join(".vigil"),
        };
        layers.push((user_dir.join("config.toml"), ConfigLayer::User));
        if let Some(root) = &options.workspace_root {
            layers.push((root.join(".vigil").join("config.toml"), ConfigLayer::Workspace));
        }
    }

    for (path, layer) in layers {
        if let Some(overlay) = try_load_file(&path)? {
            deep_merge_tracking(&mut merged, &overlay, "", layer, &mut sources);
            info!(path = %path.display(), %layer, "loaded config");
            loaded_files.push(path.display().to_string());
        }
    }

    if let Some(path) = &options.explicit_file {
        let overlay = try_load_file(path)?.ok_or_else(|| ConfigError::ReadError {
            path: path.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        })?;
        deep_merge_tracking(&mut merged, &overlay, "", ConfigLayer::Explicit, &mut sources);
        info!(path = %path.display(), "loaded config");
        loaded_files.push(path.display().to_string());
    }

    let applied = apply_env_fallbacks(&mut merged, &mut sources, &env_vars);
    if applied > 0 {
        debug!(count = applied, "applied environment variable fallbacks");
    }

    resolve_env_references(&mut merged, &env_vars);
    let config: Config = merged
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::ParseError {
            path: "<merged config>".to_owned(),
            source: e,
        })?;
    validate(&config)?;

    sources.retain(|_, layer| *layer != ConfigLayer::Defaults);
    Ok(ResolvedConfig {
        config,
        field_sources: sources,
        loaded_files,
    })
}

/// Read and parse one TOML file. A missing file is `Ok(None)`.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let metadata = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };
    if metadata.len() > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit",
                metadata.len()
            ),
        });
    }
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    let value = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(Some(value))
}

fn home_directory() -> ConfigResult<PathBuf> {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().to_path_buf())
        .ok_or(ConfigError::NoHomeDir)
}
