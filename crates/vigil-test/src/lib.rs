//! Vigil Test - shared test utilities.
//!
//! Used as a dev-dependency across the workspace:
//!
//! ```toml
//! [dev-dependencies]
//! vigil-test.workspace = true
//! ```
//!
//! - [`MockLlmProvider`] replays scripted reasoning steps.
//! - [`ScriptedTool`] counts and records executor runs.
//! - [`fixtures`] builds traces and registries.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod fixtures;
pub mod mock_llm;
pub mod tools;

pub use fixtures::*;
pub use mock_llm::*;
pub use tools::*;

use tracing_subscriber::EnvFilter;

/// Route `tracing` output to the test writer with the given filter.
pub fn setup_test_logging(filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_test_writer()
        .try_init();
}
