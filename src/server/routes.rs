//! Router configuration for the query surface.

use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;

use super::handlers;
use super::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::corpus_summary))
        .route("/health", get(handlers::health))
        .route("/search", get(handlers::search))
        .route("/indexing_status", get(handlers::indexing_status))
        .route("/download_status", get(handlers::download_status))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
