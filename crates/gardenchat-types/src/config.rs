//! Configuration types for gardenchat.
//!
//! `FileConfig` is the on-disk `config.toml` shape (every field optional).
//! `AppConfig` is the resolved configuration after environment overrides
//! and defaults have been applied.

use serde::{Deserialize, Serialize};

use crate::attachment::DEFAULT_INLINE_IMAGE_LIMIT;
use crate::chat::{ChatProfile, default_profiles};

pub const DEFAULT_LOCATION: &str = "europe-west1";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful chatbot";
pub const DEFAULT_UPLOAD_PREFIX: &str = "attachments";

/// Contents of `config.toml`. Missing keys fall back to defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    pub project_id: Option<String>,
    pub location: Option<String>,
    pub bucket: Option<String>,
    pub upload_prefix: Option<String>,
    pub system_prompt: Option<String>,
    pub inline_image_limit_bytes: Option<usize>,
    #[serde(default)]
    pub profiles: Vec<ChatProfile>,
}

/// Fully resolved application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Google Cloud project hosting the model garden endpoints.
    pub project_id: String,
    /// Vertex AI region, e.g. `europe-west1` or `us-east5`.
    pub location: String,
    /// Bucket for large image attachments; uploads are disabled when absent.
    pub bucket: Option<String>,
    pub upload_prefix: String,
    pub system_prompt: String,
    pub inline_image_limit_bytes: usize,
    pub profiles: Vec<ChatProfile>,
}

impl AppConfig {
    /// Configuration with defaults for everything except the project.
    pub fn with_project(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            location: DEFAULT_LOCATION.to_string(),
            bucket: None,
            upload_prefix: DEFAULT_UPLOAD_PREFIX.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            inline_image_limit_bytes: DEFAULT_INLINE_IMAGE_LIMIT,
            profiles: default_profiles(),
        }
    }

    /// Look up a profile by id (case-insensitive).
    pub fn profile(&self, id: &str) -> Option<&ChatProfile> {
        self.profiles.iter().find(|p| p.id.eq_ignore_ascii_case(id))
    }

    /// The profile flagged `default`, or the first one.
    pub fn default_profile(&self) -> Option<&ChatProfile> {
        self.profiles
            .iter()
            .find(|p| p.default)
            .or_else(|| self.profiles.first())
    }
}
