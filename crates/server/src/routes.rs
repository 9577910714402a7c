//! API route definitions for blacklist ledger operations.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::sync::RwLock;

use crate::handlers;
use crate::AppState;

/// Create API routes
pub fn api_routes() -> Router<Arc<RwLock<AppState>>> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // Blacklist mutations
        .route("/api/blacklist/add", post(handlers::add_to_blacklist))
        .route("/api/blacklist/remove", post(handlers::remove_from_blacklist))
        // Blacklist queries
        .route("/api/blacklist/list", post(handlers::list_blacklist))
        .route("/api/blacklist/contains", post(handlers::contains))
        .route("/api/blacklist/root", post(handlers::root))
        .route("/api/blacklist/sibling-path", post(handlers::sibling_path))
        .route("/api/blacklist/sibling-paths", post(handlers::sibling_paths))
}
