#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Layered configuration for Vigil.
//!
//! ```rust,no_run
//! let resolved = vigil_config::Config::load(Some(std::path::Path::new("."))).unwrap();
//! println!("model: {}", resolved.config.model.model);
//! ```
//!
//! # Precedence
//!
//! Highest first:
//!
//! 1. An explicit `--config` file
//! 2. Workspace (`{workspace}/.vigil/config.toml`)
//! 3. User (`~/.vigil/config.toml`)
//! 4. System (`/etc/vigil/config.toml`)
//! 5. Environment variables, for fields no file set
//! 6. Embedded defaults
//!
//! This crate depends on no other vigil crate. Binaries convert its sections
//! into domain types at startup.

/// Environment variable fallback resolution.
pub mod env;
mod error;
/// Config file discovery and loading.
pub mod loader;
/// Layered merging with provenance.
pub mod merge;
/// Configuration struct definitions.
pub mod types;
/// Validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{LoadOptions, ResolvedConfig};
pub use merge::{ConfigLayer, FieldSources};
pub use types::*;

impl Config {
    /// Load with the full precedence chain.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a file is malformed or validation fails.
    pub fn load(workspace_root: Option<&std::path::Path>) -> ConfigResult<ResolvedConfig> {
        loader::load_with(&LoadOptions {
            workspace_root: workspace_root.map(std::path::Path::to_path_buf),
            ..LoadOptions::default()
        })
    }

    /// Load defaults, environment and a single explicit file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file is missing, malformed or invalid.
    pub fn load_file(path: &std::path::Path) -> ConfigResult<ResolvedConfig> {
        loader::load_with(&LoadOptions {
            explicit_file: Some(path.to_path_buf()),
            explicit_only: true,
            ..LoadOptions::default()
        })
    }
}
