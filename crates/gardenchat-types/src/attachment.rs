//! Attachment and object storage types.

use serde::{Deserialize, Serialize};

/// Largest image sent inline. Base64 inflates by 4/3, so 3.75 MiB of raw
/// bytes stays under the 5 MB encoded image limit of the Messages API.
pub const DEFAULT_INLINE_IMAGE_LIMIT: usize = 3_932_160;

/// Image media types accepted by both publishers.
pub const SUPPORTED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

/// A file attached to a user turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    /// Declared MIME type, if the client sent one.
    pub media_type: Option<String>,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(filename: impl Into<String>, media_type: Option<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            media_type,
            data,
        }
    }
}

/// A stored object returned by an object store upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    /// Storage URI, e.g. `gs://bucket/attachments/...`.
    pub uri: String,
    pub media_type: String,
    pub size_bytes: u64,
}
