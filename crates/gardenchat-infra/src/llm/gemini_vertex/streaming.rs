//! SSE streaming for Gemini on Vertex.
//!
//! With `alt=sse` every `data:` line is a complete `GenerateContentResponse`
//! chunk. There is no terminal event; the stream simply ends.

use futures_util::StreamExt;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use reqwest_eventsource::{Error as EventSourceError, Event, EventSource};
use secrecy::ExposeSecret;

use gardenchat_core::llm::provider::LlmEventStream;
use gardenchat_types::llm::{LlmError, StopReason, StreamEvent, Usage};

use crate::auth::DynTokenSource;
use crate::llm::{bearer_token, map_status};

use super::types::{GeminiError, GeminiRequest, GeminiResponse};

/// Map a Gemini `finishReason`.
pub(crate) fn map_finish_reason(reason: &str) -> StopReason {
    match reason {
        "STOP" | "FINISH_REASON_UNSPECIFIED" => StopReason::EndTurn,
        "MAX_TOKENS" => StopReason::MaxTokens,
        "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII" => {
            tracing::warn!(finish_reason = reason, "Gemini withheld output");
            StopReason::ContentFilter
        }
        other => {
            tracing::warn!(finish_reason = other, "Unexpected Gemini finish reason");
            StopReason::EndTurn
        }
    }
}

/// Map a Google API error object (`{"code","message","status"}`).
///
/// The numeric code goes through the shared HTTP status mapping; the
/// canonical status string is the fallback when the code is missing.
pub(crate) fn map_error_payload(error: &GeminiError) -> LlmError {
    let message = if error.status.is_empty() {
        error.message.clone()
    } else {
        format!("{} ({})", error.message, error.status)
    };

    if let Ok(status) = StatusCode::from_u16(error.code)
        && (status.is_client_error() || status.is_server_error())
    {
        return map_status(status, &HeaderMap::new(), message);
    }

    match error.status.as_str() {
        "UNAUTHENTICATED" | "PERMISSION_DENIED" => LlmError::AuthenticationFailed,
        "RESOURCE_EXHAUSTED" => LlmError::RateLimited {
            retry_after_ms: None,
        },
        "INVALID_ARGUMENT" | "NOT_FOUND" | "FAILED_PRECONDITION" => {
            LlmError::InvalidRequest(message)
        }
        _ => LlmError::Provider { message },
    }
}

/// Map one response chunk to stream events.
///
/// A chunk carrying an `error` object fails the stream.
pub(crate) fn process_chunk(chunk: &GeminiResponse) -> Result<Vec<StreamEvent>, LlmError> {
    if let Some(error) = &chunk.error {
        tracing::warn!(code = error.code, status = %error.status, message = %error.message, "Gemini stream error");
        return Err(map_error_payload(error));
    }

    let mut events = Vec::new();

    let text = chunk.text();
    if !text.is_empty() {
        events.push(StreamEvent::TextDelta { text });
    }

    if let Some(reason) = chunk.block_reason() {
        tracing::warn!(block_reason = reason, "Gemini blocked the prompt");
        events.push(StreamEvent::MessageDelta {
            stop_reason: StopReason::ContentFilter,
        });
    } else if let Some(reason) = chunk.finish_reason() {
        events.push(StreamEvent::MessageDelta {
            stop_reason: map_finish_reason(reason),
        });
    }

    if let Some(usage) = chunk.usage_metadata {
        events.push(StreamEvent::Usage(Usage {
            input_tokens: usage.prompt_token_count,
            output_tokens: usage.candidates_token_count,
        }));
    }

    Ok(events)
}

/// Open a streaming connection to `streamGenerateContent?alt=sse`.
pub fn create_gemini_stream(
    client: &reqwest::Client,
    url: &str,
    body: GeminiRequest,
    tokens: &DynTokenSource,
) -> LlmEventStream {
    let client = client.clone();
    let url = url.to_string();
    let tokens = tokens.clone();

    Box::pin(async_stream::try_stream! {
        let token = bearer_token(&tokens).await?;
        let builder = client
            .post(&url)
            .query(&[("alt", "sse")])
            .bearer_auth(token.expose_secret())
            .json(&body);

        let mut source = EventSource::new(builder).map_err(|e| LlmError::Provider {
            message: format!("cannot open event stream: {e}"),
        })?;

        // Set by a finishReason or a blocked prompt; usage may still follow.
        let mut finished = false;

        while let Some(next) = source.next().await {
            let event = match next {
                Ok(event) => event,
                Err(EventSourceError::StreamEnded) => break,
                Err(EventSourceError::InvalidStatusCode(status, response)) => {
                    source.close();
                    let headers = response.headers().clone();
                    let body = response.text().await.unwrap_or_default();
                    tracing::warn!(status = %status, body = %body, "Gemini stream API error response");
                    Err(map_status(status, &headers, body))?;
                    unreachable!()
                }
                Err(e) => {
                    source.close();
                    Err(LlmError::Stream(e.to_string()))?;
                    unreachable!()
                }
            };

            let message = match event {
                Event::Open => {
                    yield StreamEvent::Connected;
                    continue;
                }
                Event::Message(message) => message,
            };

            let chunk: GeminiResponse = match serde_json::from_str(&message.data) {
                Ok(chunk) => chunk,
                Err(e) => {
                    source.close();
                    Err(LlmError::Deserialization(format!("stream chunk: {e}")))?;
                    unreachable!()
                }
            };

            let mapped = match process_chunk(&chunk) {
                Ok(mapped) => mapped,
                Err(e) => {
                    source.close();
                    Err(e)?;
                    unreachable!()
                }
            };

            for ev in mapped {
                if matches!(ev, StreamEvent::MessageDelta { .. }) {
                    finished = true;
                }
                yield ev;
            }
        }

        source.close();
        if !finished {
            Err(LlmError::Stream("stream ended before finishReason".to_string()))?;
        }
        yield StreamEvent::Done;
    })
}
