//! SSE stream creation and event mapping for Anthropic on Vertex.
//!
//! `streamRawPredict` follows the Messages API streaming protocol:
//! 1. `message_start` -- message object with initial usage
//! 2. Per block: `content_block_start` -> N x `content_block_delta` -> `content_block_stop`
//! 3. `message_delta` -- stop_reason and cumulative usage
//! 4. `message_stop` -- final event
//! 5. `ping` events may appear anywhere (keepalive)
//! 6. `error` events may appear mid-stream

use futures_util::StreamExt;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use reqwest_eventsource::{Error as EventSourceError, Event, EventSource};
use secrecy::ExposeSecret;

use gardenchat_core::llm::provider::LlmEventStream;
use gardenchat_types::llm::{LlmError, StopReason, StreamEvent, Usage};

use crate::auth::DynTokenSource;
use crate::llm::{bearer_token, map_status};

use super::types::{
    AnthropicDelta, AnthropicVertexRequest, ContentBlockDeltaPayload, ErrorPayload,
    MessageDeltaPayload, MessageStartPayload,
};

/// Map an Anthropic `stop_reason` string.
pub(crate) fn map_stop_reason(reason: Option<&str>) -> StopReason {
    match reason {
        Some("max_tokens") => StopReason::MaxTokens,
        Some("stop_sequence") => StopReason::StopSequence,
        Some("refusal") => StopReason::ContentFilter,
        _ => StopReason::EndTurn,
    }
}

/// Map an Anthropic error payload (`{"error":{"type":...}}`).
pub(crate) fn map_error_payload(payload: ErrorPayload) -> LlmError {
    match payload.error.error_type.as_str() {
        "overloaded_error" => LlmError::Overloaded(payload.error.message),
        "rate_limit_error" => LlmError::RateLimited {
            retry_after_ms: None,
        },
        "authentication_error" | "permission_error" => LlmError::AuthenticationFailed,
        "invalid_request_error" => LlmError::InvalidRequest(payload.error.message),
        _ => LlmError::Provider {
            message: payload.error.message,
        },
    }
}

/// Map a non-success HTTP response, preferring the Anthropic error body.
///
/// 429 keeps the status mapping so `Retry-After` is not lost.
pub(crate) fn map_error_response(status: StatusCode, headers: &HeaderMap, body: String) -> LlmError {
    if status.as_u16() != 429
        && let Ok(payload) = serde_json::from_str::<ErrorPayload>(&body)
    {
        return map_error_payload(payload);
    }
    map_status(status, headers, body)
}

/// Process one SSE event into zero or more `StreamEvent`s.
pub(crate) fn process_event(event_type: &str, data: &str) -> Result<Vec<StreamEvent>, LlmError> {
    let mut events = Vec::new();

    match event_type {
        "message_start" => {
            let payload: MessageStartPayload = serde_json::from_str(data)
                .map_err(|e| LlmError::Deserialization(format!("message_start: {e}")))?;
            tracing::debug!(message_id = %payload.message.id, model = %payload.message.model, "Anthropic stream started");
            if let Some(usage) = payload.message.usage {
                events.push(StreamEvent::Usage(Usage {
                    input_tokens: usage.input_tokens,
                    output_tokens: usage.output_tokens,
                }));
            }
        }

        "content_block_delta" => {
            let payload: ContentBlockDeltaPayload = serde_json::from_str(data)
                .map_err(|e| LlmError::Deserialization(format!("content_block_delta: {e}")))?;
            match payload.delta {
                AnthropicDelta::TextDelta { text } => events.push(StreamEvent::TextDelta { text }),
                AnthropicDelta::Other => {
                    tracing::trace!(index = payload.index, "Skipping non-text delta");
                }
            }
        }

        "content_block_start" | "content_block_stop" | "ping" => {}

        "message_delta" => {
            let payload: MessageDeltaPayload = serde_json::from_str(data)
                .map_err(|e| LlmError::Deserialization(format!("message_delta: {e}")))?;
            events.push(StreamEvent::MessageDelta {
                stop_reason: map_stop_reason(payload.delta.stop_reason.as_deref()),
            });
            // message_delta usage only reports output tokens; input comes
            // from message_start and is merged by the caller.
            events.push(StreamEvent::Usage(Usage {
                input_tokens: payload.usage.input_tokens,
                output_tokens: payload.usage.output_tokens,
            }));
        }

        "message_stop" => events.push(StreamEvent::Done),

        "error" => {
            let payload: ErrorPayload = serde_json::from_str(data)
                .map_err(|e| LlmError::Deserialization(format!("error event: {e}")))?;
            return Err(map_error_payload(payload));
        }

        unknown => {
            tracing::warn!(event_type = unknown, "Unknown Anthropic event type, skipping");
        }
    }

    Ok(events)
}

/// Open a streaming connection to `streamRawPredict`.
pub fn create_anthropic_stream(
    client: &reqwest::Client,
    url: &str,
    body: AnthropicVertexRequest,
    tokens: &DynTokenSource,
) -> LlmEventStream {
    let client = client.clone();
    let url = url.to_string();
    let tokens = tokens.clone();

    Box::pin(async_stream::try_stream! {
        let token = bearer_token(&tokens).await?;
        let builder = client
            .post(&url)
            .bearer_auth(token.expose_secret())
            .json(&body);

        let mut source = EventSource::new(builder).map_err(|e| LlmError::Provider {
            message: format!("cannot open event stream: {e}"),
        })?;

        // Input tokens arrive in message_start, output tokens in message_delta.
        let mut usage = Usage::default();
        let mut finished = false;

        while let Some(next) = source.next().await {
            let event = match next {
                Ok(event) => event,
                Err(EventSourceError::StreamEnded) => break,
                Err(EventSourceError::InvalidStatusCode(status, response)) => {
                    source.close();
                    let headers = response.headers().clone();
                    let body = response.text().await.unwrap_or_default();
                    tracing::warn!(status = %status, body = %body, "Anthropic stream API error response");
                    Err(map_error_response(status, &headers, body))?;
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

            let mapped = match process_event(&message.event, &message.data) {
                Ok(mapped) => mapped,
                Err(e) => {
                    source.close();
                    Err(e)?;
                    unreachable!()
                }
            };

            for ev in mapped {
                match ev {
                    StreamEvent::Usage(u) => {
                        if u.input_tokens > 0 {
                            usage.input_tokens = u.input_tokens;
                        }
                        usage.output_tokens = u.output_tokens.max(usage.output_tokens);
                        yield StreamEvent::Usage(usage);
                    }
                    StreamEvent::Done => {
                        finished = true;
                    }
                    other => yield other,
                }
            }

            if finished {
                source.close();
                break;
            }
        }

        if !finished {
            Err(LlmError::Stream("stream ended before message_stop".to_string()))?;
        }
        yield StreamEvent::Done;
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_delta() {
        let events = process_event(
            "content_block_delta",
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hel"}}"#,
        )
        .unwrap();
        assert_eq!(events, vec![StreamEvent::TextDelta { text: "Hel".to_string() }]);
    }

    #[test]
    fn test_non_text_delta_skipped() {
        let events = process_event(
            "content_block_delta",
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"input_json_delta","partial_json":"{"}}"#,
        )
        .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_message_delta() {
        let events = process_event(
            "message_delta",
            r#"{"type":"message_delta","delta":{"stop_reason":"max_tokens","stop_sequence":null},"usage":{"output_tokens":15}}"#,
        )
        .unwrap();
        assert_eq!(
            events,
            vec![
                StreamEvent::MessageDelta { stop_reason: StopReason::MaxTokens },
                StreamEvent::Usage(Usage { input_tokens: 0, output_tokens: 15 }),
            ]
        );
    }

    #[test]
    fn test_ping_and_stop() {
        assert!(process_event("ping", r#"{"type":"ping"}"#).unwrap().is_empty());
        assert_eq!(
            process_event("message_stop", r#"{"type":"message_stop"}"#).unwrap(),
            vec![StreamEvent::Done]
        );
    }

    #[test]
    fn test_error_event() {
        let err = process_event(
            "error",
            r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, LlmError::Overloaded(msg) if msg == "Overloaded"));
    }

    #[test]
    fn test_malformed_payload() {
        let err = process_event("message_start", "{not json").unwrap_err();
        assert!(matches!(err, LlmError::Deserialization(_)));
    }
}
