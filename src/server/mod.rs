//! HTTP surface of the control service.
//!
//! Handlers are stateless: each one acquires a client handle from the
//! credential manager, forwards a single remote call, and maps the outcome
//! to an HTTP response. Nothing here is fatal to the process.

pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;

use crate::auth::CredentialManager;
use crate::config::Config;

/// Fixed cap on search results; bounds response size and latency.
pub const SEARCH_LIMIT: u32 = 5;

/// Shared state for the request handlers.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<CredentialManager>,
    pub config: Arc<Config>,
}

/// Build the control service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/play", post(handlers::play))
        .route("/pause", post(handlers::pause))
        .route("/next", post(handlers::next))
        .route("/previous", post(handlers::previous))
        .route("/current_track", get(handlers::current_track))
        .route("/search", get(handlers::search))
        .route("/auth", get(handlers::auth_page))
        .route("/callback", get(handlers::callback))
        .with_state(state)
}

/// Serve the control service on an already-bound listener.
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!("control service listening on http://{addr}");
    axum::serve(listener, router(state)).await
}
