//! Shared gateway state.

use std::sync::Arc;

use vigil_llm::LlmProvider;
use vigil_orchestrator::{Driver, OrchestratorConfig, system_prompt};
use vigil_tools::{OrderMode, StockToolset};

/// Which chat route a request arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRoute {
    /// Every tool runs without asking.
    Chat,
    /// Order creation waits for a human decision.
    Confirmed,
}

impl ChatRoute {
    /// URL path of the route.
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Chat => "/api/chat",
            Self::Confirmed => "/api/chat-hil",
        }
    }

    /// How the route exposes order creation.
    #[must_use]
    pub fn order_mode(self) -> OrderMode {
        match self {
            Self::Chat => OrderMode::Auto,
            Self::Confirmed => OrderMode::Confirmed,
        }
    }
}

/// One driver per chat route.
#[derive(Clone)]
pub struct GatewayState {
    chat: Arc<Driver>,
    confirmed: Arc<Driver>,
}

impl GatewayState {
    /// Build both drivers from one provider and tool set.
    #[must_use]
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        toolset: &StockToolset,
        config: OrchestratorConfig,
    ) -> Self {
        let driver = |route: ChatRoute| {
            let mode = route.order_mode();
            Driver::new(Arc::clone(&provider), toolset.registry(mode), config)
                .with_system_prompt(system_prompt(mode))
        };
        Self::from_drivers(driver(ChatRoute::Chat), driver(ChatRoute::Confirmed))
    }

    /// Use prebuilt drivers.
    #[must_use]
    pub fn from_drivers(chat: Driver, confirmed: Driver) -> Self {
        Self {
            chat: Arc::new(chat),
            confirmed: Arc::new(confirmed),
        }
    }

    /// The driver serving `route`.
    #[must_use]
    pub fn driver(&self, route: ChatRoute) -> Arc<Driver> {
        match route {
            ChatRoute::Chat => Arc::clone(&self.chat),
            ChatRoute::Confirmed => Arc::clone(&self.confirmed),
        }
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("chat", &self.chat)
            .field("confirmed", &self.confirmed)
            .finish()
    }
}
