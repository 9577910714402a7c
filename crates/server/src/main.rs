//! HTTP API server over the blacklist attestor ledger.
//!
//! Backed by the in-memory simulated attestor; swap in a real chain client
//! by providing another `ChainBoundary` implementation.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

mod handlers;
mod routes;

use attestor_ledger::{BlacklistLedger, SimulatedAttestor};
use attestor_smt::DEFAULT_DEPTH;

/// Application state shared across handlers.
pub struct AppState {
    pub ledger: BlacklistLedger<SimulatedAttestor>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let chain = SimulatedAttestor::new(DEFAULT_DEPTH).expect("default depth is valid");
    let ledger = BlacklistLedger::new(chain, DEFAULT_DEPTH).expect("default depth is valid");

    let state = Arc::new(RwLock::new(AppState { ledger }));

    let app = Router::new()
        .merge(routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], 3001));
    tracing::info!("listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
