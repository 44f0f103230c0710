//! LLM provider abstractions for gardenchat.
//!
//! - `LlmProvider`: RPITIT trait for concrete provider implementations
//! - `BoxLlmProvider`: Object-safe wrapper for dynamic dispatch
//! - `ProviderFactory`: builds a provider for a chat profile
//! - `StreamInSpan`: keeps a tracing span entered while a stream is polled

pub mod box_provider;
pub mod factory;
pub mod provider;
pub mod span;
