//! Anthropic Claude on Vertex AI.
//!
//! Same Messages API body as the first-party API, minus `model` (it is in
//! the URL) and with `anthropic_version` in the body instead of a header.

pub mod client;
pub mod streaming;
pub mod types;

pub use client::AnthropicVertexProvider;
