//! Read-only endpoints: health, chat profiles and the settings schema.

use std::time::Instant;

use axum::Json;
use axum::extract::State;

use gardenchat_core::chat::settings::settings_schema;
use gardenchat_types::chat::{ChatProfile, SettingsSchema};

use crate::http::response::ApiResponse;
use crate::state::AppState;

/// GET /api/v1/health
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<serde_json::Value>> {
    let start = Instant::now();
    let data = serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "active_sessions": state.sessions.len(),
    });
    Json(ApiResponse::success(data, start))
}

/// GET /api/v1/profiles
pub async fn list_profiles(State(state): State<AppState>) -> Json<ApiResponse<Vec<ChatProfile>>> {
    let start = Instant::now();
    let profiles = state.context.profiles.clone();
    Json(ApiResponse::success(profiles, start).with_link("self", "/api/v1/profiles"))
}

/// GET /api/v1/settings/schema - Widgets for the chat settings panel.
pub async fn get_settings_schema(State(state): State<AppState>) -> Json<ApiResponse<SettingsSchema>> {
    let start = Instant::now();
    let schema = settings_schema(&state.context.profiles);
    Json(ApiResponse::success(schema, start))
}
