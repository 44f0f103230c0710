//! LlmProvider trait definition.
//!
//! This is the core abstraction that every model garden publisher adapter
//! implements. Uses RPITIT for `complete`, and `Pin<Box<dyn Stream>>` for
//! `stream` (streams need to be object-safe for the BoxLlmProvider wrapper).

use std::pin::Pin;

use futures_util::Stream;

use gardenchat_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, ProviderCapabilities, StreamEvent,
};

/// Boxed stream of provider events.
pub type LlmEventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>>;

/// Trait for LLM provider backends (Anthropic on Vertex, Gemini on Vertex).
///
/// Implementations live in gardenchat-infra.
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g., "anthropic", "gemini").
    fn name(&self) -> &str;

    /// What this provider supports (vision, storage references, limits).
    fn capabilities(&self) -> &ProviderCapabilities;

    /// Send a completion request and receive the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;

    /// Send a streaming completion request. Returns a stream of events.
    ///
    /// Returns a boxed stream (not RPITIT) because streams need to be
    /// object-safe for the `BoxLlmProvider` wrapper.
    fn stream(&self, request: CompletionRequest) -> LlmEventStream;
}
