//! Per-request context for log correlation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies one inbound request in every log line it produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// Unique request identifier.
    pub request_id: Uuid,
    /// Route or command that received the request.
    pub route: String,
    /// Bound user, when the caller supplied one.
    pub user_id: Option<String>,
    /// When the request started.
    pub started_at: DateTime<Utc>,
}

impl RequestContext {
    /// A fresh context for `route`.
    #[must_use]
    pub fn new(route: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            route: route.into(),
            user_id: None,
            started_at: Utc::now(),
        }
    }

    /// Record the bound user.
    #[must_use]
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Milliseconds since the request started.
    #[must_use]
    pub fn elapsed_ms(&self) -> i64 {
        Utc::now()
            .signed_duration_since(self.started_at)
            .num_milliseconds()
    }

    /// First eight characters of the request id.
    #[must_use]
    pub fn short_id(&self) -> String {
        self.request_id.simple().to_string().chars().take(8).collect()
    }

    /// A span carrying the request's identity.
    #[must_use]
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "request",
            request_id = %self.request_id,
            route = %self.route,
            user_id = self.user_id.as_deref(),
        )
    }
}
