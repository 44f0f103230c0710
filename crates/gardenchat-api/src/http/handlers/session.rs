//! Session lifecycle HTTP handlers.
//!
//! Endpoints:
//! - POST   /api/v1/sessions                - Start a session
//! - GET    /api/v1/sessions/{id}           - Session info with history
//! - PUT    /api/v1/sessions/{id}/settings  - Change settings
//! - POST   /api/v1/sessions/{id}/reset     - Drop the history
//! - DELETE /api/v1/sessions/{id}           - End a session

use std::time::Instant;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use gardenchat_types::chat::{SessionInfo, SettingsPatch};

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Parse a UUID from a path parameter, returning a 400 error on invalid format.
pub(crate) fn parse_uuid(s: &str) -> Result<Uuid, AppError> {
    s.parse::<Uuid>()
        .map_err(|_| AppError::Validation(format!("Invalid UUID: {s}")))
}

fn parse_patch(body: &[u8]) -> Result<SettingsPatch, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(SettingsPatch::default());
    }
    serde_json::from_slice(body).map_err(|e| AppError::Validation(format!("Invalid settings: {e}")))
}

fn session_links(resp: ApiResponse<SessionInfo>, id: Uuid) -> ApiResponse<SessionInfo> {
    resp.with_link("self", &format!("/api/v1/sessions/{id}"))
        .with_link("settings", &format!("/api/v1/sessions/{id}/settings"))
        .with_link("messages", &format!("/api/v1/sessions/{id}/messages"))
}

/// POST /api/v1/sessions - Start a session (body optional).
pub async fn create_session(State(state): State<AppState>, body: Bytes) -> Result<Response, AppError> {
    let start = Instant::now();
    let patch = parse_patch(&body)?;

    let handle = state.sessions.create(&patch)?;
    let info = handle.lock().await.info(false);
    let id = info.id;

    let resp = session_links(ApiResponse::success(info, start), id);
    Ok((StatusCode::CREATED, resp).into_response())
}

/// GET /api/v1/sessions/{id}
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ApiResponse<SessionInfo>>, AppError> {
    let start = Instant::now();
    let id = parse_uuid(&session_id)?;

    let handle = state.sessions.get(&id)?;
    let info = handle.lock().await.info(true);

    Ok(Json(session_links(ApiResponse::success(info, start), id)))
}

/// PUT /api/v1/sessions/{id}/settings
///
/// Absent fields keep their value. History is preserved.
pub async fn update_settings(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    body: Bytes,
) -> Result<Json<ApiResponse<SessionInfo>>, AppError> {
    let start = Instant::now();
    let id = parse_uuid(&session_id)?;
    let patch = parse_patch(&body)?;

    let handle = state.sessions.get(&id)?;
    let mut session = handle.lock().await;
    session.update_settings(&patch)?;
    let info = session.info(false);

    Ok(Json(session_links(ApiResponse::success(info, start), id)))
}

/// POST /api/v1/sessions/{id}/reset - Clear history, keep settings.
pub async fn reset_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ApiResponse<SessionInfo>>, AppError> {
    let start = Instant::now();
    let id = parse_uuid(&session_id)?;

    let handle = state.sessions.get(&id)?;
    let mut session = handle.lock().await;
    session.reset();
    let info = session.info(false);

    Ok(Json(session_links(ApiResponse::success(info, start), id)))
}

/// DELETE /api/v1/sessions/{id}
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let id = parse_uuid(&session_id)?;

    state.sessions.remove(&id)?;

    Ok(Json(ApiResponse::success(
        serde_json::json!({ "id": id, "ended": true }),
        start,
    )))
}
