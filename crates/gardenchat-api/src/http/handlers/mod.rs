//! HTTP request handlers for the REST API.

pub mod message;
pub mod meta;
pub mod session;
