//! `vigil serve`: run the HTTP gateway.

use anyhow::{Context, Result};
use vigil_config::Config;
use vigil_gateway::GatewayState;

use crate::config_bridge::{build_provider, build_toolset, to_orchestrator_config};
use crate::theme::Theme;

pub(crate) async fn run_serve(cfg: &Config, bind: Option<String>) -> Result<()> {
    let toolset = build_toolset(cfg)?;
    let provider = build_provider(cfg)?;
    let state = GatewayState::new(provider, &toolset, to_orchestrator_config(cfg));

    let addr = bind.unwrap_or_else(|| cfg.gateway.bind.clone());
    println!(
        "{}",
        Theme::info(&format!("Serving /api/chat and /api/chat-hil on http://{addr}"))
    );
    vigil_gateway::serve(&addr, state)
        .await
        .with_context(|| format!("gateway on {addr} failed"))
}
