//! Infrastructure layer for gardenchat.
//!
//! Contains implementations of the ports defined in `gardenchat-core`:
//! Vertex AI model garden providers (Anthropic and Gemini), Google Cloud
//! Storage uploads, OAuth2 access token sources, and the config loader.

pub mod auth;
pub mod config;
pub mod llm;
pub mod storage;
