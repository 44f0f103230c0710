//! Chat settings, settings schema, and chat profile types.
//!
//! Settings are the per-session knobs a user can change from the UI
//! (profile, temperature, max output tokens). The schema describes those
//! knobs as widgets so any front-end can render them the same way.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::llm::{Message, ProviderType, Usage};

/// Initial slider value for temperature.
pub const DEFAULT_TEMPERATURE: f64 = 0.3;
pub const MIN_TEMPERATURE: f64 = 0.0;
pub const MAX_TEMPERATURE: f64 = 1.0;
pub const TEMPERATURE_STEP: f64 = 0.1;

/// Initial slider value for max output tokens.
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 1024;
pub const MIN_MAX_OUTPUT_TOKENS: u32 = 256;
pub const MAX_MAX_OUTPUT_TOKENS: u32 = 8192;
pub const MAX_OUTPUT_TOKENS_STEP: u32 = 256;

/// Per-session chat settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSettings {
    /// Id of the selected [`ChatProfile`].
    pub profile: String,
    pub temperature: f64,
    pub max_output_tokens: u32,
}

/// Partial settings used by the settings-update hook.
///
/// Absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        self.profile.is_none() && self.temperature.is_none() && self.max_output_tokens.is_none()
    }
}

/// A UI control describing one setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "widget", rename_all = "snake_case")]
pub enum SettingWidget {
    Select {
        id: String,
        label: String,
        values: Vec<String>,
        initial_index: usize,
    },
    Slider {
        id: String,
        label: String,
        initial: f64,
        min: f64,
        max: f64,
        step: f64,
    },
}

impl SettingWidget {
    pub fn id(&self) -> &str {
        match self {
            SettingWidget::Select { id, .. } | SettingWidget::Slider { id, .. } => id,
        }
    }
}

/// The full set of settings widgets shown in a chat settings panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsSchema {
    pub widgets: Vec<SettingWidget>,
}

/// A named preset bundling a model choice and its display metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatProfile {
    /// Stable identifier used in settings and on the command line.
    pub id: String,
    /// Display name (also used as the assistant's author label).
    pub name: String,
    pub provider: ProviderType,
    /// Publisher model id, e.g. `claude-3-5-sonnet@20240620`.
    pub model: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Preselected when the user does not choose.
    #[serde(default)]
    pub default: bool,
}

/// Built-in chat profiles.
pub fn default_profiles() -> Vec<ChatProfile> {
    vec![
        ChatProfile {
            id: "claude-3-5-sonnet".to_string(),
            name: "Claude 3.5 Sonnet".to_string(),
            provider: ProviderType::Anthropic,
            model: "claude-3-5-sonnet@20240620".to_string(),
            description: "Anthropic Claude 3.5 Sonnet on Vertex AI".to_string(),
            icon: None,
            default: true,
        },
        ChatProfile {
            id: "gemini-1.5-pro".to_string(),
            name: "Gemini 1.5 Pro".to_string(),
            provider: ProviderType::Gemini,
            model: "gemini-1.5-pro-002".to_string(),
            description: "Google Gemini 1.5 Pro on Vertex AI".to_string(),
            icon: None,
            default: false,
        },
        ChatProfile {
            id: "gemini-1.5-flash".to_string(),
            name: "Gemini 1.5 Flash".to_string(),
            provider: ProviderType::Gemini,
            model: "gemini-1.5-flash-002".to_string(),
            description: "Google Gemini 1.5 Flash on Vertex AI".to_string(),
            icon: None,
            default: false,
        },
    ]
}

/// Snapshot of a chat session returned to front-ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: Uuid,
    pub profile: ChatProfile,
    pub settings: ChatSettings,
    pub started_at: DateTime<Utc>,
    pub turn_count: usize,
    pub usage: Usage,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<Message>,
}

/// The assistant's reply to one user turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub session_id: Uuid,
    /// Author label, e.g. "Chatbot: Claude 3.5 Sonnet".
    pub author: String,
    pub content: String,
    pub model: String,
    pub stop_reason: Option<String>,
    pub usage: Usage,
    pub response_ms: u64,
}
