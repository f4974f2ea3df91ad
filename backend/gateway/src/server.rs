//! HTTP server wiring.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tracing::info;

use chatrelay_agent::ChatSession;

use crate::chat_api;

/// Application state shared across routes.
///
/// The mutex serializes whole chat turns: concurrent requests must not
/// interleave transcript mutations and history appends.
#[derive(Clone)]
pub struct GatewayState {
    pub session: Arc<Mutex<ChatSession>>,
}

impl GatewayState {
    pub fn new(session: ChatSession) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
        }
    }
}

/// Build the Axum router with all routes.
pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/chat", post(chat_api::chat))
        .route("/api/health", get(chat_api::health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Starts the HTTP server for the gateway.
pub async fn start_server(addr: SocketAddr, state: GatewayState) -> Result<()> {
    let app = build_router(state);

    info!("Gateway HTTP server listening on {}", addr);
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
