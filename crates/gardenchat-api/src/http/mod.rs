//! HTTP/REST API layer for gardenchat.
//!
//! Axum-based REST API at `/api/v1/` with envelope responses, SSE message
//! streaming and CORS support.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod router;
