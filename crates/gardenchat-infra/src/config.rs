//! Configuration loader for gardenchat.
//!
//! Reads `config.toml` (default `{config_dir}/gardenchat/config.toml`, or the
//! path in `GARDENCHAT_CONFIG`), then applies environment overrides and
//! defaults to produce an [`AppConfig`].

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use gardenchat_types::config::{
    AppConfig, DEFAULT_LOCATION, DEFAULT_SYSTEM_PROMPT, DEFAULT_UPLOAD_PREFIX, FileConfig,
};
use gardenchat_types::attachment::DEFAULT_INLINE_IMAGE_LIMIT;
use gardenchat_types::chat::{ChatProfile, default_profiles};
use gardenchat_types::error::ConfigError;

pub const CONFIG_PATH_ENV: &str = "GARDENCHAT_CONFIG";

const PROJECT_ENV: [&str; 2] = ["GOOGLE_CLOUD_PROJECT", "PROJECT_ID"];
const LOCATION_ENV: [&str; 2] = ["GOOGLE_CLOUD_LOCATION", "LOCATION"];
const BUCKET_ENV: [&str; 2] = ["GARDENCHAT_BUCKET", "GCS_BUCKET"];

/// Default config file location, if the platform has a config directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("gardenchat").join("config.toml"))
}

/// Load `config.toml` from `path`.
///
/// - If the file does not exist, returns [`FileConfig::default()`].
/// - If the file exists but cannot be read or parsed, returns an error.
pub async fn load_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(FileConfig::default());
        }
        Err(err) => {
            return Err(ConfigError::Read {
                path: path.display().to_string(),
                message: err.to_string(),
            });
        }
    };

    toml::from_str(&content).map_err(|err| ConfigError::Parse {
        path: path.display().to_string(),
        message: err.to_string(),
    })
}

/// First non-blank value among `names`.
fn lookup_any(env: &impl Fn(&str) -> Option<String>, names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| env(name))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

/// Merge file values with environment overrides and defaults.
///
/// `env` is the variable lookup (normally `std::env::var(..).ok()`).
pub fn resolve_config(
    file: FileConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Result<AppConfig, ConfigError> {
    let project_id = lookup_any(&env, &PROJECT_ENV)
        .or(file.project_id.filter(|p| !p.trim().is_empty()))
        .ok_or(ConfigError::Missing("GOOGLE_CLOUD_PROJECT"))?;

    let location = lookup_any(&env, &LOCATION_ENV)
        .or(file.location)
        .unwrap_or_else(|| DEFAULT_LOCATION.to_string());

    let bucket = lookup_any(&env, &BUCKET_ENV).or(file.bucket.filter(|b| !b.trim().is_empty()));

    let profiles = resolve_profiles(file.profiles)?;

    let config = AppConfig {
        project_id,
        location,
        bucket,
        upload_prefix: file
            .upload_prefix
            .unwrap_or_else(|| DEFAULT_UPLOAD_PREFIX.to_string()),
        system_prompt: file
            .system_prompt
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
        inline_image_limit_bytes: file
            .inline_image_limit_bytes
            .unwrap_or(DEFAULT_INLINE_IMAGE_LIMIT),
        profiles,
    };

    validate(&config)?;
    Ok(config)
}

/// Profiles from the file, or the built-in set when the file has none.
///
/// Needs no project or credentials, so listing profiles works before the
/// environment is set up.
pub fn resolve_profiles(profiles: Vec<ChatProfile>) -> Result<Vec<ChatProfile>, ConfigError> {
    let profiles = if profiles.is_empty() {
        default_profiles()
    } else {
        profiles
    };
    validate_profiles(&profiles)?;
    Ok(profiles)
}

fn validate(config: &AppConfig) -> Result<(), ConfigError> {
    if config.inline_image_limit_bytes == 0 {
        return Err(ConfigError::Invalid(
            "inline_image_limit_bytes must be greater than zero".to_string(),
        ));
    }
    validate_profiles(&config.profiles)
}

fn validate_profiles(profiles: &[ChatProfile]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for profile in profiles {
        if profile.id.trim().is_empty() || profile.model.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "profile '{}' needs both an id and a model",
                profile.name
            )));
        }
        if !seen.insert(profile.id.to_ascii_lowercase()) {
            return Err(ConfigError::Invalid(format!(
                "duplicate profile id '{}'",
                profile.id
            )));
        }
    }

    Ok(())
}

/// Explicit path, else `GARDENCHAT_CONFIG`, else the platform default.
fn config_path(path_override: Option<&Path>) -> Option<PathBuf> {
    match path_override {
        Some(path) => Some(path.to_path_buf()),
        None => std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .or_else(default_config_path),
    }
}

async fn load_file(path_override: Option<&Path>) -> Result<FileConfig, ConfigError> {
    match config_path(path_override) {
        Some(path) => load_file_config(&path).await,
        None => Ok(FileConfig::default()),
    }
}

/// Load only the chat profiles. The environment is not consulted.
pub async fn load_profiles(path_override: Option<&Path>) -> Result<Vec<ChatProfile>, ConfigError> {
    let file = load_file(path_override).await?;
    resolve_profiles(file.profiles)
}

/// Load the process configuration: file (if any) plus environment.
pub async fn load_config(path_override: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let file = load_file(path_override).await?;

    let config = resolve_config(file, |name| std::env::var(name).ok())?;
    tracing::debug!(
        project = %config.project_id,
        location = %config.location,
        bucket = ?config.bucket,
        profiles = config.profiles.len(),
        "Configuration loaded"
    );
    Ok(config)
}
