//! API Routes
//!
//! Configures the Axum router with all cache server endpoints.

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    alias_handler, delete_handler, get_handler, health_handler, insert_handler, resend_handler,
    stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `PUT /entries` - Store a value
/// - `GET /entries/:id` - Retrieve a value by id or alias
/// - `DELETE /entries/:id` - Delete an entry and its aliases
/// - `PUT /entries/:id/aliases` - Bind an alias
/// - `POST /verification/:token/resend` - Count a verification resend
/// - `GET /stats` - Get cache statistics
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/entries", put(insert_handler))
        .route("/entries/:id", get(get_handler).delete(delete_handler))
        .route("/entries/:id/aliases", put(alias_handler))
        .route("/verification/:token/resend", post(resend_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
