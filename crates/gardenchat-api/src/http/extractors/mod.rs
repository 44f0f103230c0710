//! Request extractors shared by the handlers.

pub mod multipart;
pub mod query;
