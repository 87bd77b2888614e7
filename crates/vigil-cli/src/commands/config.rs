//! `vigil config`: inspect the resolved configuration.

use anyhow::Result;
use vigil_config::ResolvedConfig;

use crate::theme::Theme;

pub(crate) fn show(resolved: &ResolvedConfig, sources: bool) -> Result<()> {
    print!("{}", resolved.config.to_redacted_toml()?);

    if sources {
        println!();
        println!("{}", Theme::header("Sources"));
        if resolved.loaded_files.is_empty() {
            println!("{}", Theme::dimmed("no config files found; using defaults"));
        }
        for file in &resolved.loaded_files {
            println!("  {}", Theme::dimmed(file));
        }
        let mut fields: Vec<_> = resolved.field_sources.iter().collect();
        fields.sort_by(|a, b| a.0.cmp(b.0));
        for (field, layer) in fields {
            println!("  {field} = {}", Theme::dimmed(&layer.to_string()));
        }
    }
    Ok(())
}
