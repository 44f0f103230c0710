//! Shared domain types for gardenchat.
//!
//! This crate contains the types shared by every layer: LLM request and
//! streaming types, message content parts, chat settings and profiles,
//! attachments, configuration, and the error enums.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod attachment;
pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
