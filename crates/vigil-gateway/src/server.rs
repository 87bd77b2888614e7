//! Listener lifecycle.

use std::future::Future;

use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::error::{GatewayError, GatewayResult};
use crate::routes::router;
use crate::state::GatewayState;

/// Bind `addr` and serve until Ctrl-C.
///
/// # Errors
///
/// Returns [`GatewayError::Bind`] if the address is unavailable, or an I/O
/// error if the server stops abnormally.
pub async fn serve(addr: &str, state: GatewayState) -> GatewayResult<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| GatewayError::Bind {
            addr: addr.to_string(),
            source,
        })?;
    serve_listener(listener, state, shutdown_signal()).await
}

/// Serve on an already bound listener until `shutdown` completes.
///
/// # Errors
///
/// Returns an I/O error if the server stops abnormally.
pub async fn serve_listener<F>(
    listener: TcpListener,
    state: GatewayState,
    shutdown: F,
) -> GatewayResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let local = listener.local_addr()?;
    info!(addr = %local, "gateway listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for Ctrl-C; running until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
