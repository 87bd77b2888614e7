//! Environment variable fallbacks and `${VAR}` references.
//!
//! Environment variables are fallback only: they fill fields no file set.

use std::collections::HashMap;
use std::hash::BuildHasher;

use tracing::debug;

use crate::merge::{ConfigLayer, FieldSources};

/// Environment variable name to dotted field path.
const ENV_MAPPINGS: &[(&str, &str)] = &[
    ("VIGIL_MODEL", "model.model"),
    ("VIGIL_MODEL_API_URL", "model.api_url"),
    ("OPENAI_API_KEY", "model.api_key"),
    ("VIGIL_MAX_STEPS", "orchestrator.max_steps"),
    ("FINANCIAL_MODELING_PREP_API_KEY", "market_data.api_key"),
    ("TAVILY_API_KEY", "search.api_key"),
    ("VIGIL_BIND", "gateway.bind"),
    ("VIGIL_LOG_LEVEL", "logging.level"),
];

const INTEGER_FIELDS: &[&str] = &[
    "model.max_tokens",
    "orchestrator.max_steps",
    "orchestrator.tool_timeout_secs",
];

/// Fill unset fields from the environment. Returns how many were applied.
pub fn apply_env_fallbacks<S: BuildHasher>(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String, S>,
) -> usize {
    let mut count: usize = 0;
    for &(var, path) in ENV_MAPPINGS {
        if matches!(sources.get(path), Some(layer) if *layer != ConfigLayer::Defaults) {
            continue;
        }
        let Some(val) = env_vars.get(var).filter(|v| !v.is_empty()) else {
            continue;
        };
        debug!(var, field = path, "applying env var fallback");
        set_field(merged, path, coerce(path, val));
        sources.insert(path.to_owned(), ConfigLayer::Environment);
        count = count.saturating_add(1);
    }
    count
}

/// Replace `${VAR}` in every string value. Unknown variables stay as written.
pub fn resolve_env_references<S: BuildHasher>(
    val: &mut toml::Value,
    env_vars: &HashMap<String, String, S>,
) {
    match val {
        toml::Value::String(s) => *s = resolve_string(s, env_vars),
        toml::Value::Table(table) => {
            for (_, child) in table.iter_mut() {
                resolve_env_references(child, env_vars);
            }
        },
        toml::Value::Array(items) => {
            for child in items {
                resolve_env_references(child, env_vars);
            }
        },
        _ => {},
    }
}

fn resolve_string<S: BuildHasher>(input: &str, env_vars: &HashMap<String, String, S>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start..];
        let Some(end) = after.find('}') else {
            out.push_str(after);
            return out;
        };
        let name = &after[2..end];
        match env_vars.get(name) {
            Some(v) if !name.is_empty() => out.push_str(v),
            _ => {
                debug!(var = name, "unresolved env var reference in config");
                out.push_str(&after[..=end]);
            },
        }
        rest = &after[end..][1..];
    }
    out.push_str(rest);
    out
}

fn coerce(path: &str, val: &str) -> toml::Value {
    if INTEGER_FIELDS.contains(&path)
        && let Ok(i) = val.parse::<i64>()
    {
        return toml::Value::Integer(i);
    }
    if path == "model.temperature"
        && let Ok(f) = val.parse::<f64>()
    {
        return toml::Value::Float(f);
    }
    toml::Value::String(val.to_owned())
}

fn set_field(root: &mut toml::Value, path: &str, value: toml::Value) {
    let mut segments: Vec<&str> = path.split('.').collect();
    let Some(leaf) = segments.pop() else {
        return;
    };
    let mut current = root;
    for segment in segments {
        let Some(table) = current.as_table_mut() else {
            return;
        };
        current = table
            .entry(segment)
            .or_insert(toml::Value::Table(toml::map::Map::new()));
    }
    if let Some(table) = current.as_table_mut() {
        table.insert(leaf.to_owned(), value);
    }
}

/// Snapshot of the process environment.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_fallback_fills_unset_fields() {
        let mut merged: toml::Value = toml::from_str("[model]\nmodel = \"gpt-4o\"\n").unwrap();
        let mut sources = FieldSources::new();
        sources.insert("model.model".into(), ConfigLayer::Defaults);

        let n = apply_env_fallbacks(
            &mut merged,
            &mut sources,
            &env(&[
                ("OPENAI_API_KEY", "sk-test"),
                ("VIGIL_MODEL", "gpt-4o-mini"),
                ("VIGIL_MAX_STEPS", "4"),
            ]),
        );

        assert_eq!(n, 3);
        assert_eq!(merged["model"]["api_key"].as_str(), Some("sk-test"));
        assert_eq!(merged["model"]["model"].as_str(), Some("gpt-4o-mini"));
        assert_eq!(merged["orchestrator"]["max_steps"].as_integer(), Some(4));
    }

    #[test]
    fn test_fallback_never_overrides_a_file() {
        let mut merged: toml::Value = toml::from_str("[model]\nmodel = \"from-file\"\n").unwrap();
        let mut sources = FieldSources::new();
        sources.insert("model.model".into(), ConfigLayer::User);

        let n = apply_env_fallbacks(&mut merged, &mut sources, &env(&[("VIGIL_MODEL", "env")]));

        assert_eq!(n, 0);
        assert_eq!(merged["model"]["model"].as_str(), Some("from-file"));
    }

    #[test]
    fn test_resolve_references() {
        let mut val: toml::Value =
            toml::from_str("[search]\napi_key = \"${TAVILY}\"\nurl = \"x-${MISSING}-y\"\n").unwrap();
        resolve_env_references(&mut val, &env(&[("TAVILY", "tvly-1")]));
        assert_eq!(val["search"]["api_key"].as_str(), Some("tvly-1"));
        assert_eq!(val["search"]["url"].as_str(), Some("x-${MISSING}-y"));
    }

    #[test]
    fn test_unterminated_reference_is_kept() {
        assert_eq!(resolve_string("a ${B", &env(&[("B", "no")])), "a ${B");
    }
}
