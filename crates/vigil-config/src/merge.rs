//! Deep merge of TOML layers with per-field provenance.
//!
//! Merging raw [`toml::Value`] trees keeps "absent" distinct from "default":
//! a key missing from a layer never overrides the layer below it.

use std::collections::HashMap;
use std::fmt;

/// Where a value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayer {
    /// Compiled-in `defaults.toml`.
    Defaults,
    /// `/etc/vigil/config.toml`.
    System,
    /// `~/.vigil/config.toml`.
    User,
    /// `{workspace}/.vigil/config.toml`.
    Workspace,
    /// A file named on the command line.
    Explicit,
    /// Environment variable fallback.
    Environment,
}

impl fmt::Display for ConfigLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Defaults => write!(f, "defaults"),
            Self::System => write!(f, "system (/etc/vigil/config.toml)"),
            Self::User => write!(f, "user (~/.vigil/config.toml)"),
            Self::Workspace => write!(f, "workspace (.vigil/config.toml)"),
            Self::Explicit => write!(f, "--config file"),
            Self::Environment => write!(f, "environment variable"),
        }
    }
}

/// Dotted field path to the layer that last set it.
pub type FieldSources = HashMap<String, ConfigLayer>;

/// Merge `overlay` into `base`, recording the layer of every leaf it sets.
///
/// Tables merge per key; scalars and arrays replace.
pub fn deep_merge_tracking(
    base: &mut toml::Value,
    overlay: &toml::Value,
    prefix: &str,
    layer: ConfigLayer,
    sources: &mut FieldSources,
) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let path = join(prefix, key);
                match base_table.get_mut(key) {
                    Some(base_val) if overlay_val.is_table() => {
                        deep_merge_tracking(base_val, overlay_val, &path, layer, sources);
                    },
                    Some(base_val) => {
                        *base_val = overlay_val.clone();
                        sources.insert(path, layer);
                    },
                    None => {
                        base_table.insert(key.clone(), overlay_val.clone());
                        record_leaves(overlay_val, &path, layer, sources);
                    },
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
            sources.insert(prefix.to_owned(), layer);
        },
    }
}

/// Record every leaf under `val` as coming from `layer`.
pub fn record_leaves(val: &toml::Value, prefix: &str, layer: ConfigLayer, sources: &mut FieldSources) {
    if let toml::Value::Table(table) = val {
        for (key, child) in table {
            record_leaves(child, &join(prefix, key), layer, sources);
        }
    } else {
        sources.insert(prefix.to_owned(), layer);
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_owned()
    } else {
        format!("{prefix}.{key}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> toml::Value {
        toml::from_str(s).unwrap()
    }

    #[test]
    fn test_overlay_replaces_only_present_keys() {
        let mut base = parse("[model]\nmodel = \"gpt-4o\"\ntemperature = 0.7\n");
        let overlay = parse("[model]\ntemperature = 0.2\n");
        let mut sources = FieldSources::new();

        deep_merge_tracking(&mut base, &overlay, "", ConfigLayer::User, &mut sources);

        assert_eq!(base["model"]["model"].as_str(), Some("gpt-4o"));
        assert_eq!(base["model"]["temperature"].as_float(), Some(0.2));
        assert_eq!(sources.get("model.temperature"), Some(&ConfigLayer::User));
        assert!(!sources.contains_key("model.model"));
    }

    #[test]
    fn test_new_tables_are_recorded() {
        let mut base = parse("[model]\nmodel = \"gpt-4o\"\n");
        let overlay = parse("[storage]\nbackend = \"file\"\npath = \"orders.json\"\n");
        let mut sources = FieldSources::new();

        deep_merge_tracking(&mut base, &overlay, "", ConfigLayer::Workspace, &mut sources);

        assert_eq!(base["storage"]["backend"].as_str(), Some("file"));
        assert_eq!(sources.get("storage.path"), Some(&ConfigLayer::Workspace));
    }

    #[test]
    fn test_arrays_replace() {
        let mut base = parse("[logging]\ndirectives = [\"a=debug\"]\n");
        let overlay = parse("[logging]\ndirectives = [\"b=trace\"]\n");
        let mut sources = FieldSources::new();

        deep_merge_tracking(&mut base, &overlay, "", ConfigLayer::User, &mut sources);

        let dirs = base["logging"]["directives"].as_array().unwrap();
        assert_eq!(dirs.len(), 1);
        assert_eq!(dirs[0].as_str(), Some("b=trace"));
    }
}
