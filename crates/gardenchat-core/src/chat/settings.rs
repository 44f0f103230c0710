//! Settings schema, defaults, and validation.
//!
//! Values are snapped to the slider step after range checks, so a stored
//! setting is always one the settings panel could have produced.

use gardenchat_types::chat::{
    ChatProfile, ChatSettings, DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_TEMPERATURE,
    MAX_MAX_OUTPUT_TOKENS, MAX_OUTPUT_TOKENS_STEP, MAX_TEMPERATURE, MIN_MAX_OUTPUT_TOKENS,
    MIN_TEMPERATURE, SettingWidget, SettingsPatch, SettingsSchema, TEMPERATURE_STEP,
};
use gardenchat_types::error::SettingsError;
use gardenchat_types::llm::ProviderCapabilities;

pub const MODEL_SETTING: &str = "model";
pub const TEMPERATURE_SETTING: &str = "temperature";
pub const MAX_TOKENS_SETTING: &str = "max_output_tokens";

/// Widgets for the chat settings panel.
///
/// The model select lists profile ids with the default profile preselected.
pub fn settings_schema(profiles: &[ChatProfile]) -> SettingsSchema {
    let initial_index = profiles.iter().position(|p| p.default).unwrap_or(0);
    SettingsSchema {
        widgets: vec![
            SettingWidget::Select {
                id: MODEL_SETTING.to_string(),
                label: "Model".to_string(),
                values: profiles.iter().map(|p| p.id.clone()).collect(),
                initial_index,
            },
            SettingWidget::Slider {
                id: TEMPERATURE_SETTING.to_string(),
                label: "Temperature".to_string(),
                initial: DEFAULT_TEMPERATURE,
                min: MIN_TEMPERATURE,
                max: MAX_TEMPERATURE,
                step: TEMPERATURE_STEP,
            },
            SettingWidget::Slider {
                id: MAX_TOKENS_SETTING.to_string(),
                label: "Max output tokens".to_string(),
                initial: f64::from(DEFAULT_MAX_OUTPUT_TOKENS),
                min: f64::from(MIN_MAX_OUTPUT_TOKENS),
                max: f64::from(MAX_MAX_OUTPUT_TOKENS),
                step: f64::from(MAX_OUTPUT_TOKENS_STEP),
            },
        ],
    }
}

/// Look up a profile by id, ignoring ASCII case.
pub fn find_profile<'a>(profiles: &'a [ChatProfile], id: &str) -> Option<&'a ChatProfile> {
    profiles.iter().find(|p| p.id.eq_ignore_ascii_case(id))
}

/// Initial settings: the default profile and the slider initial values.
pub fn default_settings(profiles: &[ChatProfile]) -> Result<ChatSettings, SettingsError> {
    let profile = profiles
        .iter()
        .find(|p| p.default)
        .or_else(|| profiles.first())
        .ok_or(SettingsError::NoProfiles)?;
    Ok(ChatSettings {
        profile: profile.id.clone(),
        temperature: DEFAULT_TEMPERATURE,
        max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
    })
}

/// Apply a partial update on top of `current` and validate the result.
pub fn apply_patch(
    current: &ChatSettings,
    patch: &SettingsPatch,
    profiles: &[ChatProfile],
) -> Result<ChatSettings, SettingsError> {
    let candidate = ChatSettings {
        profile: patch.profile.clone().unwrap_or_else(|| current.profile.clone()),
        temperature: patch.temperature.unwrap_or(current.temperature),
        max_output_tokens: patch.max_output_tokens.unwrap_or(current.max_output_tokens),
    };
    validate(&candidate, profiles)
}

/// Validate settings and return the normalized (snapped, canonical id) copy.
pub fn validate(settings: &ChatSettings, profiles: &[ChatProfile]) -> Result<ChatSettings, SettingsError> {
    if profiles.is_empty() {
        return Err(SettingsError::NoProfiles);
    }
    let profile = find_profile(profiles, &settings.profile)
        .ok_or_else(|| SettingsError::UnknownProfile(settings.profile.clone()))?;

    let temperature = settings.temperature;
    if !temperature.is_finite() || !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&temperature) {
        return Err(SettingsError::TemperatureOutOfRange(temperature));
    }

    let max_tokens = settings.max_output_tokens;
    if !(MIN_MAX_OUTPUT_TOKENS..=MAX_MAX_OUTPUT_TOKENS).contains(&max_tokens) {
        return Err(SettingsError::MaxTokensOutOfRange(max_tokens));
    }

    Ok(ChatSettings {
        profile: profile.id.clone(),
        temperature: snap_temperature(temperature),
        max_output_tokens: snap_max_tokens(max_tokens),
    })
}

/// Round to the nearest temperature step, ties upward.
pub fn snap_temperature(value: f64) -> f64 {
    let steps_per_unit = (1.0 / TEMPERATURE_STEP).round();
    // The epsilon absorbs binary representation error (0.25 / 0.1 = 2.4999...).
    let steps = (value * steps_per_unit + 0.5 + 1e-9).floor();
    (steps / steps_per_unit).clamp(MIN_TEMPERATURE, MAX_TEMPERATURE)
}

/// Round to the nearest token step above the minimum, ties upward.
pub fn snap_max_tokens(value: u32) -> u32 {
    let clamped = value.clamp(MIN_MAX_OUTPUT_TOKENS, MAX_MAX_OUTPUT_TOKENS);
    let offset = clamped - MIN_MAX_OUTPUT_TOKENS;
    let steps = (offset + MAX_OUTPUT_TOKENS_STEP / 2) / MAX_OUTPUT_TOKENS_STEP;
    (MIN_MAX_OUTPUT_TOKENS + steps * MAX_OUTPUT_TOKENS_STEP).min(MAX_MAX_OUTPUT_TOKENS)
}

/// Max tokens actually sent: the setting capped to the provider's output limit.
pub fn effective_max_tokens(settings: &ChatSettings, capabilities: &ProviderCapabilities) -> u32 {
    settings.max_output_tokens.min(capabilities.max_output_tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gardenchat_types::chat::default_profiles;

    fn settings(profile: &str, temperature: f64, max_output_tokens: u32) -> ChatSettings {
        ChatSettings {
            profile: profile.to_string(),
            temperature,
            max_output_tokens,
        }
    }

    #[test]
    fn test_schema_matches_panel_constants() {
        let schema = settings_schema(&default_profiles());
        assert_eq!(schema.widgets.len(), 3);
        match &schema.widgets[0] {
            SettingWidget::Select { values, initial_index, .. } => {
                assert_eq!(values[0], "claude-3-5-sonnet");
                assert_eq!(*initial_index, 0);
            }
            other => panic!("expected select, got {other:?}"),
        }
        match &schema.widgets[2] {
            SettingWidget::Slider { initial, min, max, step, .. } => {
                assert_eq!(*initial, 1024.0);
                assert_eq!(*min, 256.0);
                assert_eq!(*max, 8192.0);
                assert_eq!(*step, 256.0);
            }
            other => panic!("expected slider, got {other:?}"),
        }
    }

    #[test]
    fn test_default_settings() {
        let defaults = default_settings(&default_profiles()).unwrap();
        assert_eq!(defaults.profile, "claude-3-5-sonnet");
        assert_eq!(defaults.temperature, 0.3);
        assert_eq!(defaults.max_output_tokens, 1024);
        assert_eq!(default_settings(&[]), Err(SettingsError::NoProfiles));
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let profiles = default_profiles();
        assert_eq!(
            validate(&settings("claude-3-5-sonnet", 1.2, 1024), &profiles),
            Err(SettingsError::TemperatureOutOfRange(1.2))
        );
        assert!(matches!(
            validate(&settings("claude-3-5-sonnet", f64::NAN, 1024), &profiles),
            Err(SettingsError::TemperatureOutOfRange(_))
        ));
        assert_eq!(
            validate(&settings("claude-3-5-sonnet", 0.3, 100), &profiles),
            Err(SettingsError::MaxTokensOutOfRange(100))
        );
        assert_eq!(
            validate(&settings("gpt-4", 0.3, 1024), &profiles),
            Err(SettingsError::UnknownProfile("gpt-4".to_string()))
        );
    }

    #[test]
    fn test_validate_snaps_and_canonicalizes() {
        let profiles = default_profiles();
        let valid = validate(&settings("Gemini-1.5-Pro", 0.25, 1000), &profiles).unwrap();
        assert_eq!(valid.profile, "gemini-1.5-pro");
        assert_eq!(valid.temperature, 0.3);
        assert_eq!(valid.max_output_tokens, 1024);
    }

    #[test]
    fn test_snap_max_tokens() {
        assert_eq!(snap_max_tokens(256), 256);
        assert_eq!(snap_max_tokens(383), 256);
        assert_eq!(snap_max_tokens(384), 512);
        assert_eq!(snap_max_tokens(8191), 8192);
        assert_eq!(snap_max_tokens(8192), 8192);
    }

    #[test]
    fn test_snap_temperature_bounds() {
        assert_eq!(snap_temperature(0.0), 0.0);
        assert_eq!(snap_temperature(0.04), 0.0);
        assert_eq!(snap_temperature(0.96), 1.0);
        assert_eq!(snap_temperature(1.0), 1.0);
        assert_eq!(snap_temperature(0.7), 0.7);
    }

    #[test]
    fn test_apply_patch_keeps_unset_fields() {
        let profiles = default_profiles();
        let current = default_settings(&profiles).unwrap();
        let patch = SettingsPatch {
            max_output_tokens: Some(4096),
            ..Default::default()
        };
        let next = apply_patch(&current, &patch, &profiles).unwrap();
        assert_eq!(next.profile, current.profile);
        assert_eq!(next.temperature, current.temperature);
        assert_eq!(next.max_output_tokens, 4096);
    }

    #[test]
    fn test_effective_max_tokens_capped() {
        let caps = ProviderCapabilities {
            streaming: true,
            vision: true,
            storage_image_refs: false,
            max_context_tokens: 200_000,
            max_output_tokens: 4096,
        };
        assert_eq!(effective_max_tokens(&settings("x", 0.3, 8192), &caps), 4096);
        assert_eq!(effective_max_tokens(&settings("x", 0.3, 1024), &caps), 1024);
    }
}
