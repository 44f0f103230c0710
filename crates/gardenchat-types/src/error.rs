use thiserror::Error;

use crate::llm::LlmError;

/// Errors from validating chat settings.
#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("unknown chat profile: '{0}'")]
    UnknownProfile(String),

    #[error("temperature {0} is outside [{min}, {max}]", min = crate::chat::MIN_TEMPERATURE, max = crate::chat::MAX_TEMPERATURE)]
    TemperatureOutOfRange(f64),

    #[error("max output tokens {0} is outside [{min}, {max}]", min = crate::chat::MIN_MAX_OUTPUT_TOKENS, max = crate::chat::MAX_MAX_OUTPUT_TOKENS)]
    MaxTokensOutOfRange(u32),

    #[error("no chat profiles configured")]
    NoProfiles,
}

/// Errors from turning an attachment into a message part.
#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("attachment '{0}' is empty")]
    Empty(String),

    #[error("attachment '{filename}' has unsupported image type '{media_type}'")]
    UnsupportedMediaType { filename: String, media_type: String },

    #[error("attachment '{filename}' is {size} bytes, over the {limit} byte inline limit, and no object store can take it")]
    TooLarge {
        filename: String,
        size: usize,
        limit: usize,
    },

    #[error("upload of '{filename}' failed: {source}")]
    Upload {
        filename: String,
        #[source]
        source: StorageError,
    },
}

/// Errors from object storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("upload rejected (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),
}

/// Errors from loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("failed to read {path}: {message}")]
    Read { path: String, message: String },

    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors surfaced by a chat session to its front-end.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Attachment(#[from] AttachmentError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("message is empty")]
    EmptyMessage,

    #[error("session not found")]
    SessionNotFound,
}
