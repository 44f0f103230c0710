//! AnthropicVertexProvider -- concrete [`LlmProvider`] for Claude models
//! published in the Vertex AI model garden.
//!
//! Non-streaming calls go to `:rawPredict`, streaming calls to
//! `:streamRawPredict`. Both authenticate with a Google OAuth2 bearer token.

use secrecy::ExposeSecret;

use gardenchat_core::llm::provider::{LlmEventStream, LlmProvider};
use gardenchat_types::llm::{
    CompletionRequest, CompletionResponse, ContentPart, LlmError, ProviderCapabilities, Usage,
};

use crate::auth::DynTokenSource;
use crate::llm::{VertexEndpoint, bearer_token};

use super::streaming::{create_anthropic_stream, map_error_response, map_stop_reason};
use super::types::{
    AnthropicContentBlock, AnthropicMessage, AnthropicNonStreamResponse, AnthropicRequestBlock,
    AnthropicVertexRequest, ImageSource, VERTEX_ANTHROPIC_VERSION,
};

const PUBLISHER: &str = "anthropic";

/// Claude on Vertex AI.
///
/// Does not derive Debug; it holds a handle to the token source.
pub struct AnthropicVertexProvider {
    client: reqwest::Client,
    endpoint: VertexEndpoint,
    tokens: DynTokenSource,
    model: String,
    capabilities: ProviderCapabilities,
}

impl AnthropicVertexProvider {
    pub fn new(
        client: reqwest::Client,
        endpoint: VertexEndpoint,
        tokens: DynTokenSource,
        model: String,
    ) -> Self {
        let capabilities = Self::capabilities_for_model(&model);
        Self {
            client,
            endpoint,
            tokens,
            model,
            capabilities,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Determine capabilities based on model name.
    fn capabilities_for_model(model: &str) -> ProviderCapabilities {
        let max_output_tokens = if model.contains("claude-3-5")
            || model.contains("claude-3-7")
            || model.contains("sonnet-4")
            || model.contains("opus-4")
        {
            8_192
        } else {
            // Claude 3 (Opus, Sonnet, Haiku) and unknown models
            4_096
        };

        ProviderCapabilities {
            streaming: true,
            vision: true,
            storage_image_refs: false,
            max_context_tokens: 200_000,
            max_output_tokens,
        }
    }

    fn url(&self, method: &str) -> String {
        self.endpoint.model_url(PUBLISHER, &self.model, method)
    }

    /// Convert a generic [`CompletionRequest`] into the Vertex request body.
    ///
    /// Fails for `gs://` image references, which the Messages API cannot read.
    fn to_vertex_request(
        &self,
        request: &CompletionRequest,
        stream: bool,
    ) -> Result<AnthropicVertexRequest, LlmError> {
        let messages = request
            .messages
            .iter()
            .map(|m| {
                let content = m
                    .content
                    .iter()
                    .map(to_request_block)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(AnthropicMessage {
                    role: m.role.to_string(),
                    content,
                })
            })
            .collect::<Result<Vec<_>, LlmError>>()?;

        Ok(AnthropicVertexRequest {
            anthropic_version: VERTEX_ANTHROPIC_VERSION,
            max_tokens: request.max_tokens,
            messages,
            system: request.system.clone(),
            stream,
            temperature: request.temperature,
            stop_sequences: request.stop_sequences.clone(),
        })
    }
}

fn to_request_block(part: &ContentPart) -> Result<AnthropicRequestBlock, LlmError> {
    match part {
        ContentPart::Text { text } => Ok(AnthropicRequestBlock::Text { text: text.clone() }),
        ContentPart::InlineImage { media_type, data } => Ok(AnthropicRequestBlock::Image {
            source: ImageSource::Base64 {
                media_type: media_type.clone(),
                data: data.clone(),
            },
        }),
        ContentPart::ImageRef { uri, .. } if uri.starts_with("https://") || uri.starts_with("http://") => {
            Ok(AnthropicRequestBlock::Image {
                source: ImageSource::Url { url: uri.clone() },
            })
        }
        ContentPart::ImageRef { uri, .. } => Err(LlmError::InvalidRequest(format!(
            "Anthropic models cannot read image reference '{uri}'"
        ))),
    }
}

impl LlmProvider for AnthropicVertexProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        &self.capabilities
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = self.to_vertex_request(request, false)?;
        let token = bearer_token(&self.tokens).await?;

        let response = self
            .client
            .post(self.url("rawPredict"))
            .bearer_auth(token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Provider {
                message: format!("HTTP request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let error_body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %error_body, "Anthropic API error response");
            return Err(map_error_response(status, &headers, error_body));
        }

        let resp: AnthropicNonStreamResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Deserialization(format!("failed to parse response: {e}")))?;

        let content = resp
            .content
            .iter()
            .filter_map(|block| match block {
                AnthropicContentBlock::Text { text } => Some(text.as_str()),
                AnthropicContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("");

        Ok(CompletionResponse {
            id: resp.id,
            content,
            model: resp.model,
            stop_reason: map_stop_reason(resp.stop_reason.as_deref()),
            usage: Usage {
                input_tokens: resp.usage.input_tokens,
                output_tokens: resp.usage.output_tokens,
            },
        })
    }

    fn stream(&self, request: CompletionRequest) -> LlmEventStream {
        let body = match self.to_vertex_request(&request, true) {
            Ok(body) => body,
            Err(e) => return Box::pin(futures_util::stream::once(async move { Err(e) })),
        };
        create_anthropic_stream(&self.client, &self.url("streamRawPredict"), body, &self.tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use futures_util::StreamExt;
    use gardenchat_types::llm::{Message, MessageRole, StopReason, StreamEvent};
    use secrecy::SecretString;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::auth::env::StaticTokenSource;

    const MODEL: &str = "claude-3-5-sonnet@20240620";
    const RAW_PATH: &str =
        "/v1/projects/test-project/locations/europe-west1/publishers/anthropic/models/claude-3-5-sonnet@20240620:rawPredict";
    const STREAM_PATH: &str =
        "/v1/projects/test-project/locations/europe-west1/publishers/anthropic/models/claude-3-5-sonnet@20240620:streamRawPredict";

    fn provider(base_url: &str) -> AnthropicVertexProvider {
        AnthropicVertexProvider::new(
            reqwest::Client::new(),
            VertexEndpoint::new("test-project", "europe-west1").with_base_url(base_url),
            Arc::new(StaticTokenSource::new(SecretString::from("test-token"))),
            MODEL.to_string(),
        )
    }

    fn request(text: &str) -> CompletionRequest {
        CompletionRequest {
            model: MODEL.to_string(),
            messages: vec![Message::user(text)],
            system: Some("You are a helpful chatbot".to_string()),
            max_tokens: 1024,
            temperature: Some(0.3),
            stream: false,
            stop_sequences: None,
        }
    }

    #[test]
    fn test_sonnet_capabilities() {
        let provider = provider("http://localhost");
        let caps = provider.capabilities();
        assert_eq!(caps.max_output_tokens, 8_192);
        assert!(caps.vision);
        assert!(!caps.storage_image_refs);
        assert_eq!(provider.name(), "anthropic");
        assert_eq!(provider.model(), MODEL);
    }

    #[test]
    fn test_claude_3_capabilities() {
        let caps = AnthropicVertexProvider::capabilities_for_model("claude-3-haiku@20240307");
        assert_eq!(caps.max_output_tokens, 4_096);
    }

    #[test]
    fn test_image_parts_mapping() {
        let provider = provider("http://localhost");
        let mut req = request("what is this?");
        req.messages[0].content.insert(
            0,
            ContentPart::InlineImage {
                media_type: "image/jpeg".to_string(),
                data: "/9j/".to_string(),
            },
        );
        let body = provider.to_vertex_request(&req, false).unwrap();
        assert_eq!(body.messages[0].content.len(), 2);
        assert!(matches!(
            &body.messages[0].content[0],
            AnthropicRequestBlock::Image { source: ImageSource::Base64 { media_type, .. } } if media_type == "image/jpeg"
        ));

        req.messages[0].content[0] = ContentPart::ImageRef {
            media_type: "image/png".to_string(),
            uri: "gs://bucket/cat.png".to_string(),
        };
        assert!(matches!(
            provider.to_vertex_request(&req, false),
            Err(LlmError::InvalidRequest(_))
        ));

        req.messages[0].content[0] = ContentPart::ImageRef {
            media_type: "image/png".to_string(),
            uri: "https://example.com/cat.png".to_string(),
        };
        let body = provider.to_vertex_request(&req, false).unwrap();
        assert!(matches!(
            &body.messages[0].content[0],
            AnthropicRequestBlock::Image { source: ImageSource::Url { url } } if url == "https://example.com/cat.png"
        ));
    }

    #[tokio::test]
    async fn test_complete() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(RAW_PATH))
            .and(header("authorization", "Bearer test-token"))
            .and(body_partial_json(serde_json::json!({
                "anthropic_version": "vertex-2023-10-16",
                "max_tokens": 1024,
                "stream": false,
                "system": "You are a helpful chatbot"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "msg_01",
                "type": "message",
                "role": "assistant",
                "model": "claude-3-5-sonnet-20240620",
                "content": [{"type": "text", "text": "Hello! "}, {"type": "text", "text": "How can I help?"}],
                "stop_reason": "end_turn",
                "usage": {"input_tokens": 12, "output_tokens": 8}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = provider(&server.uri()).complete(&request("hi")).await.unwrap();
        assert_eq!(response.content, "Hello! How can I help?");
        assert_eq!(response.stop_reason, StopReason::EndTurn);
        assert_eq!(response.usage, Usage { input_tokens: 12, output_tokens: 8 });
        assert_eq!(response.id, "msg_01");
    }

    #[tokio::test]
    async fn test_complete_error_statuses() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(RAW_PATH))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .mount(&server)
            .await;

        let err = provider(&server.uri()).complete(&request("hi")).await.unwrap_err();
        assert!(matches!(err, LlmError::AuthenticationFailed));
    }

    #[tokio::test]
    async fn test_complete_overloaded_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(RAW_PATH))
            .respond_with(ResponseTemplate::new(529).set_body_json(serde_json::json!({
                "type": "error",
                "error": {"type": "overloaded_error", "message": "Overloaded"}
            })))
            .mount(&server)
            .await;

        let err = provider(&server.uri()).complete(&request("hi")).await.unwrap_err();
        assert!(matches!(err, LlmError::Overloaded(msg) if msg == "Overloaded"));
    }

    #[tokio::test]
    async fn test_stream() {
        let sse = concat!(
            "event: message_start\n",
            "data: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_1\",\"type\":\"message\",\"role\":\"assistant\",\"model\":\"claude-3-5-sonnet-20240620\",\"content\":[],\"stop_reason\":null,\"usage\":{\"input_tokens\":25,\"output_tokens\":1}}}\n\n",
            "event: content_block_start\n",
            "data: {\"type\":\"content_block_start\",\"index\":0,\"content_block\":{\"type\":\"text\",\"text\":\"\"}}\n\n",
            "event: ping\n",
            "data: {\"type\":\"ping\"}\n\n",
            "event: content_block_delta\n",
            "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hello\"}}\n\n",
            "event: content_block_delta\n",
            "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\" world\"}}\n\n",
            "event: content_block_stop\n",
            "data: {\"type\":\"content_block_stop\",\"index\":0}\n\n",
            "event: message_delta\n",
            "data: {\"type\":\"message_delta\",\"delta\":{\"stop_reason\":\"end_turn\",\"stop_sequence\":null},\"usage\":{\"output_tokens\":15}}\n\n",
            "event: message_stop\n",
            "data: {\"type\":\"message_stop\"}\n\n",
        );

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(STREAM_PATH))
            .and(body_partial_json(serde_json::json!({"stream": true})))
            .respond_with(ResponseTemplate::new(200).set_body_raw(sse, "text/event-stream"))
            .mount(&server)
            .await;

        let events: Vec<_> = provider(&server.uri())
            .stream(request("hi"))
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        let text: String = events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::TextDelta { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(text, "Hello world");
        assert_eq!(events.first(), Some(&StreamEvent::Connected));
        assert_eq!(events.last(), Some(&StreamEvent::Done));
        assert!(events.contains(&StreamEvent::MessageDelta { stop_reason: StopReason::EndTurn }));
        let last_usage = events
            .iter()
            .rev()
            .find_map(|e| match e {
                StreamEvent::Usage(u) => Some(*u),
                _ => None,
            })
            .unwrap();
        assert_eq!(last_usage, Usage { input_tokens: 25, output_tokens: 15 });
    }

    #[tokio::test]
    async fn test_stream_error_event() {
        let sse = concat!(
            "event: content_block_delta\n",
            "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hi\"}}\n\n",
            "event: error\n",
            "data: {\"type\":\"error\",\"error\":{\"type\":\"overloaded_error\",\"message\":\"Overloaded\"}}\n\n",
        );

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(STREAM_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_raw(sse, "text/event-stream"))
            .mount(&server)
            .await;

        let events: Vec<_> = provider(&server.uri()).stream(request("hi")).collect().await;
        assert!(matches!(events.last(), Some(Err(LlmError::Overloaded(_)))));
        assert!(events.iter().any(|e| matches!(e, Ok(StreamEvent::TextDelta { .. }))));
    }

    #[tokio::test]
    async fn test_stream_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(STREAM_PATH))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "3"))
            .mount(&server)
            .await;

        let events: Vec<_> = provider(&server.uri()).stream(request("hi")).collect().await;
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            Err(LlmError::RateLimited { retry_after_ms: Some(3000) })
        ));
    }

    #[tokio::test]
    async fn test_stream_http_error_keeps_provider_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(STREAM_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "type": "error",
                "error": {"type": "invalid_request_error", "message": "max_tokens: must be at most 8192"}
            })))
            .mount(&server)
            .await;

        let events: Vec<_> = provider(&server.uri()).stream(request("hi")).collect().await;
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            Err(LlmError::InvalidRequest(msg)) if msg == "max_tokens: must be at most 8192"
        ));
    }

    #[tokio::test]
    async fn test_stream_rejects_gcs_reference_without_calling() {
        let provider = provider("http://127.0.0.1:9");
        let mut req = request("look");
        req.messages[0] = Message {
            role: MessageRole::User,
            content: vec![ContentPart::ImageRef {
                media_type: "image/png".to_string(),
                uri: "gs://b/o.png".to_string(),
            }],
        };
        let events: Vec<_> = provider.stream(req).collect().await;
        assert!(matches!(events.as_slice(), [Err(LlmError::InvalidRequest(_))]));
    }
}
