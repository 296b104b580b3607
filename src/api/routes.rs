//! API Routes
//!
//! Configures the Axum router with the cache inspection endpoints.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, get_handler, health_handler, invalidate_handler, maintenance_handler,
    set_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /get/:key` - Read through the cache
/// - `PUT /set` - Write to the backing store and invalidate
/// - `DELETE /cache/:key` - Drop one cached entry
/// - `POST /cache/clear` - Drop every cached entry
/// - `POST /cache/maintenance` - Sweep expired entries now
/// - `GET /stats` - Cache metrics snapshot
/// - `GET /health` - Health check endpoint
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/get/:key", get(get_handler))
        .route("/set", put(set_handler))
        .route("/cache/:key", delete(invalidate_handler))
        .route("/cache/clear", post(clear_handler))
        .route("/cache/maintenance", post(maintenance_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
