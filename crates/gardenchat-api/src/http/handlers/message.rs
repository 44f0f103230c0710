//! Message endpoint.
//!
//! POST /api/v1/sessions/{id}/messages[?stream=false]
//!
//! Takes a multipart form (`content` text, `file` parts). By default the
//! reply streams as Server-Sent Events:
//! - `text_delta`: incremental text: `{ "text": "..." }`
//! - `usage`: token usage: `{ "input_tokens": N, "output_tokens": N }`
//! - `error`: the turn failed: `{ "code": "...", "message": "..." }`
//! - `done`: always last: `{ "stop_reason": ..., "response_ms": N }`
//!
//! With `stream=false` the full [`ChatReply`] comes back in an envelope.

use std::convert::Infallible;
use std::time::{Duration, Instant};

use axum::Json;
use axum::extract::{Multipart, Path, Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use tokio::sync::mpsc;

use gardenchat_core::chat::registry::SessionHandle;
use gardenchat_core::chat::session::UserTurn;
use gardenchat_types::chat::ChatReply;
use gardenchat_types::llm::Usage;

use crate::http::error::AppError;
use crate::http::extractors::multipart::read_turn;
use crate::http::extractors::query::MessageQuery;
use crate::http::handlers::session::parse_uuid;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Frames sent from the session task to the SSE response.
#[derive(Debug)]
enum Frame {
    TextDelta(String),
    Usage(Usage),
    Error { code: &'static str, message: String },
    Done { stop_reason: Option<String>, response_ms: Option<u64> },
}

impl Frame {
    fn into_event(self) -> Event {
        match self {
            Frame::TextDelta(text) => Event::default()
                .event("text_delta")
                .data(serde_json::json!({ "text": text }).to_string()),
            Frame::Usage(usage) => Event::default()
                .event("usage")
                .data(serde_json::to_string(&usage).unwrap_or_default()),
            Frame::Error { code, message } => Event::default()
                .event("error")
                .data(serde_json::json!({ "code": code, "message": message }).to_string()),
            Frame::Done {
                stop_reason,
                response_ms,
            } => Event::default().event("done").data(
                serde_json::json!({ "stop_reason": stop_reason, "response_ms": response_ms })
                    .to_string(),
            ),
        }
    }
}

/// POST /api/v1/sessions/{id}/messages
pub async fn post_message(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<MessageQuery>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let start = Instant::now();
    let id = parse_uuid(&session_id)?;
    let handle = state.sessions.get(&id)?;
    let turn = read_turn(multipart).await?;

    if !query.wants_stream() {
        let reply = handle.lock().await.complete_message(turn).await?;
        return Ok(Json(ApiResponse::success(reply, start)).into_response());
    }

    Ok(stream_reply(handle, turn).into_response())
}

/// Run the turn on its own task and forward deltas as SSE events.
///
/// The task holds the session lock for the whole turn, so a second message
/// to the same session waits until this one has finished.
fn stream_reply(
    handle: SessionHandle,
    turn: UserTurn,
) -> Sse<impl futures_util::Stream<Item = Result<Event, Infallible>>> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Frame>();

    tokio::spawn(async move {
        let mut session = handle.lock().await;
        let token_tx = tx.clone();
        let result = session
            .send_message(turn, move |text| {
                let _ = token_tx.send(Frame::TextDelta(text.to_string()));
            })
            .await;

        let done = match result {
            Ok(ChatReply {
                usage,
                stop_reason,
                response_ms,
                ..
            }) => {
                let _ = tx.send(Frame::Usage(usage));
                Frame::Done {
                    stop_reason,
                    response_ms: Some(response_ms),
                }
            }
            Err(e) => {
                let (_, code, message) = AppError::from(e).parts();
                let _ = tx.send(Frame::Error { code, message });
                Frame::Done {
                    stop_reason: None,
                    response_ms: None,
                }
            }
        };
        let _ = tx.send(done);
    });

    let events = async_stream::stream! {
        while let Some(frame) = rx.recv().await {
            yield Ok::<Event, Infallible>(frame.into_event());
        }
    };

    Sse::new(events).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
