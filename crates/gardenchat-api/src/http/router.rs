//! Axum router configuration with middleware.
//!
//! All routes are under `/api/v1/`.
//! Middleware: CORS, tracing, request body limit.

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Largest accepted request body. Images above the inline limit are still
/// accepted here so they can go to the object store.
pub const MAX_REQUEST_BYTES: usize = 32 * 1024 * 1024;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/health", get(handlers::meta::health))
        .route("/profiles", get(handlers::meta::list_profiles))
        .route("/settings/schema", get(handlers::meta::get_settings_schema))
        // Sessions
        .route("/sessions", post(handlers::session::create_session))
        .route(
            "/sessions/{id}",
            get(handlers::session::get_session).delete(handlers::session::delete_session),
        )
        .route(
            "/sessions/{id}/settings",
            put(handlers::session::update_settings),
        )
        .route("/sessions/{id}/reset", post(handlers::session::reset_session))
        // Messages
        .route(
            "/sessions/{id}/messages",
            post(handlers::message::post_message),
        );

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
