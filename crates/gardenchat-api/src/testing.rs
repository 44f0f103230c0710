//! Test doubles for the application layer: a provider that streams a
//! fixed reply, and an [`AppState`] wired to it.

use std::sync::Arc;

use futures_util::stream;

use gardenchat_core::chat::session::SessionContext;
use gardenchat_core::llm::box_provider::BoxLlmProvider;
use gardenchat_core::llm::factory::ProviderFactory;
use gardenchat_core::llm::provider::{LlmEventStream, LlmProvider};
use gardenchat_types::chat::ChatProfile;
use gardenchat_types::config::AppConfig;
use gardenchat_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, ProviderCapabilities, StopReason,
    StreamEvent, Usage,
};

pub struct CannedFactory {
    reply: String,
}

impl ProviderFactory for CannedFactory {
    fn create(&self, _profile: &ChatProfile) -> Result<BoxLlmProvider, LlmError> {
        Ok(BoxLlmProvider::new(CannedProvider {
            reply: self.reply.clone(),
            capabilities: ProviderCapabilities {
                streaming: true,
                vision: true,
                storage_image_refs: false,
                max_context_tokens: 200_000,
                max_output_tokens: 8192,
            },
        }))
    }
}

struct CannedProvider {
    reply: String,
    capabilities: ProviderCapabilities,
}

impl CannedProvider {
    fn usage(&self) -> Usage {
        Usage {
            input_tokens: 5,
            output_tokens: self.reply.split_whitespace().count() as u32,
        }
    }
}

impl LlmProvider for CannedProvider {
    fn name(&self) -> &str {
        "canned"
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        &self.capabilities
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        Ok(CompletionResponse {
            id: "canned-1".to_string(),
            content: self.reply.clone(),
            model: request.model.clone(),
            stop_reason: StopReason::EndTurn,
            usage: self.usage(),
        })
    }

    fn stream(&self, _request: CompletionRequest) -> LlmEventStream {
        Box::pin(stream::iter(vec![
            Ok(StreamEvent::Connected),
            Ok(StreamEvent::TextDelta {
                text: self.reply.clone(),
            }),
            Ok(StreamEvent::MessageDelta {
                stop_reason: StopReason::EndTurn,
            }),
            Ok(StreamEvent::Usage(self.usage())),
            Ok(StreamEvent::Done),
        ]))
    }
}

/// State with default profiles and a provider that always answers `reply`.
pub fn test_state(reply: &str) -> crate::state::AppState {
    let config = AppConfig::with_project("test-project");
    let factory = Arc::new(CannedFactory {
        reply: reply.to_string(),
    });
    let context = SessionContext::new(&config, factory, None);
    crate::state::AppState::from_parts(config, context)
}
