use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use vigil_orchestrator::OrchestratorError;

/// Gateway errors.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request body could not be read as a chat request.
    #[error("invalid request body: {0}")]
    BadRequest(String),

    /// The orchestrator refused the request before streaming began.
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),

    /// The listen address could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Requested address.
        addr: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The server stopped with an I/O error.
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Orchestrator(OrchestratorError::Protocol(_)) => {
                StatusCode::BAD_REQUEST
            },
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_orchestrator::ProtocolViolation;

    #[test]
    fn test_protocol_violation_is_client_error() {
        let err = GatewayError::from(OrchestratorError::Protocol(
            ProtocolViolation::UnknownDecisionTarget {
                call_id: "c9".into(),
            },
        ));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("c9"));
    }

    #[test]
    fn test_other_failures_are_server_errors() {
        assert_eq!(
            GatewayError::from(OrchestratorError::Cancelled).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
