//! Chat sessions for gardenchat.
//!
//! A session owns its conversation buffer, its settings, and the provider
//! client those settings select. The registry keeps live sessions for the
//! HTTP server.

pub mod buffer;
pub mod registry;
pub mod session;
pub mod settings;
