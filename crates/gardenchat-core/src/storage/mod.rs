//! Object storage abstractions for gardenchat.
//!
//! Large image attachments are uploaded to an object store and referenced
//! by URI instead of being inlined. Implementations live in gardenchat-infra.

pub mod box_store;
pub mod object_store;
