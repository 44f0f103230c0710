//! Chat session logic and port definitions for gardenchat.
//!
//! This crate defines the "ports" (`LlmProvider`, `ObjectStore`,
//! `ProviderFactory`) that the infrastructure layer implements, plus the
//! logic that sits between a front-end and those ports: settings
//! validation, attachment handling, the conversation buffer, and the chat
//! session hooks. It depends only on `gardenchat-types` -- never on
//! `gardenchat-infra` or any HTTP crate.

pub mod attachment;
pub mod chat;
pub mod llm;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;
