//! Google Gemini on Vertex AI.
//!
//! Uses `generateContent` and `streamGenerateContent?alt=sse`. Images may
//! be inline or `gs://` references (`fileData`).

pub mod client;
pub mod streaming;
pub mod types;

pub use client::GeminiVertexProvider;
