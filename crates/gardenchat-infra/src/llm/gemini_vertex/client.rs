//! GeminiVertexProvider -- concrete [`LlmProvider`] for Gemini models on
//! Vertex AI.

use secrecy::ExposeSecret;

use gardenchat_core::llm::provider::{LlmEventStream, LlmProvider};
use gardenchat_types::llm::{
    CompletionRequest, CompletionResponse, ContentPart, LlmError, MessageRole,
    ProviderCapabilities, StopReason, Usage,
};

use crate::auth::DynTokenSource;
use crate::llm::{VertexEndpoint, bearer_token, map_status};

use super::streaming::{create_gemini_stream, map_finish_reason};
use super::types::{
    GeminiBlob, GeminiContent, GeminiErrorBody, GeminiFileData, GeminiGenerationConfig,
    GeminiPart, GeminiRequest, GeminiResponse, GeminiSystemInstruction,
};

const PUBLISHER: &str = "google";

/// Gemini on Vertex AI.
pub struct GeminiVertexProvider {
    client: reqwest::Client,
    endpoint: VertexEndpoint,
    tokens: DynTokenSource,
    model: String,
    capabilities: ProviderCapabilities,
}

impl GeminiVertexProvider {
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

    fn capabilities_for_model(model: &str) -> ProviderCapabilities {
        let max_context_tokens = if model.contains("1.5-pro") {
            2_097_152
        } else {
            1_048_576
        };
        ProviderCapabilities {
            streaming: true,
            vision: true,
            storage_image_refs: true,
            max_context_tokens,
            max_output_tokens: 8_192,
        }
    }

    fn url(&self, method: &str) -> String {
        self.endpoint.model_url(PUBLISHER, &self.model, method)
    }

    fn to_gemini_request(&self, request: &CompletionRequest) -> GeminiRequest {
        let contents = request
            .messages
            .iter()
            .map(|m| GeminiContent {
                role: match m.role {
                    MessageRole::User => "user".to_string(),
                    MessageRole::Assistant => "model".to_string(),
                },
                parts: m.content.iter().map(to_gemini_part).collect(),
            })
            .collect();

        GeminiRequest {
            contents,
            system_instruction: request.system.as_ref().map(|s| GeminiSystemInstruction {
                parts: vec![GeminiPart::Text { text: s.clone() }],
            }),
            generation_config: Some(GeminiGenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
                stop_sequences: request.stop_sequences.clone(),
            }),
        }
    }
}

fn to_gemini_part(part: &ContentPart) -> GeminiPart {
    match part {
        ContentPart::Text { text } => GeminiPart::Text { text: text.clone() },
        ContentPart::InlineImage { media_type, data } => GeminiPart::InlineData {
            inline_data: GeminiBlob {
                mime_type: media_type.clone(),
                data: data.clone(),
            },
        },
        ContentPart::ImageRef { media_type, uri } => GeminiPart::FileData {
            file_data: GeminiFileData {
                mime_type: media_type.clone(),
                file_uri: uri.clone(),
            },
        },
    }
}

impl LlmProvider for GeminiVertexProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        &self.capabilities
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = self.to_gemini_request(request);
        let token = bearer_token(&self.tokens).await?;

        let response = self
            .client
            .post(self.url("generateContent"))
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
            tracing::warn!(status = %status, body = %error_body, "Gemini API error response");
            let message = serde_json::from_str::<GeminiErrorBody>(&error_body)
                .map(|b| format!("{} ({})", b.error.message, b.error.status))
                .unwrap_or(error_body);
            return Err(map_status(status, &headers, message));
        }

        let resp: GeminiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Deserialization(format!("failed to parse response: {e}")))?;

        let stop_reason = if let Some(reason) = resp.block_reason() {
            tracing::warn!(block_reason = reason, "Gemini blocked the prompt");
            StopReason::ContentFilter
        } else {
            resp.finish_reason().map(map_finish_reason).unwrap_or(StopReason::EndTurn)
        };
        let usage = resp
            .usage_metadata
            .map(|u| Usage {
                input_tokens: u.prompt_token_count,
                output_tokens: u.candidates_token_count,
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            id: resp.response_id.clone().unwrap_or_default(),
            content: resp.text(),
            model: resp.model_version.clone().unwrap_or_else(|| self.model.clone()),
            stop_reason,
            usage,
        })
    }

    fn stream(&self, request: CompletionRequest) -> LlmEventStream {
        let body = self.to_gemini_request(&request);
        create_gemini_stream(&self.client, &self.url("streamGenerateContent"), body, &self.tokens)
    }
}
