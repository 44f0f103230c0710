//! LLM provider implementations for Vertex AI model garden publishers.
//!
//! Contains concrete implementations of the [`LlmProvider`] trait defined in
//! `gardenchat-core`: Anthropic Claude and Google Gemini, both reached
//! through the Vertex AI publisher endpoints with one bearer token.
//!
//! Also provides [`VertexProviderFactory`], which builds the right provider
//! for a chat profile.
//!
//! [`LlmProvider`]: gardenchat_core::llm::provider::LlmProvider

pub mod anthropic_vertex;
pub mod gemini_vertex;

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use secrecy::SecretString;

use gardenchat_core::llm::box_provider::BoxLlmProvider;
use gardenchat_core::llm::factory::ProviderFactory;
use gardenchat_types::chat::ChatProfile;
use gardenchat_types::llm::{LlmError, ProviderType};

use crate::auth::DynTokenSource;

use self::anthropic_vertex::AnthropicVertexProvider;
use self::gemini_vertex::GeminiVertexProvider;

/// Overall request timeout for long generations.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Location of the Vertex AI publisher model endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexEndpoint {
    base_url: String,
    project_id: String,
    location: String,
}

impl VertexEndpoint {
    pub fn new(project_id: impl Into<String>, location: impl Into<String>) -> Self {
        let location = location.into();
        Self {
            base_url: host_for_location(&location),
            project_id: project_id.into(),
            location,
        }
    }

    /// Override the base URL (useful for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// `{base}/v1/projects/{project}/locations/{location}/publishers/{publisher}/models/{model}:{method}`
    pub fn model_url(&self, publisher: &str, model: &str, method: &str) -> String {
        format!(
            "{}/v1/projects/{}/locations/{}/publishers/{}/models/{}:{}",
            self.base_url, self.project_id, self.location, publisher, model, method
        )
    }
}

/// Regional host, or the global host for location `global`.
fn host_for_location(location: &str) -> String {
    if location == "global" {
        "https://aiplatform.googleapis.com".to_string()
    } else {
        format!("https://{location}-aiplatform.googleapis.com")
    }
}

/// Build the shared HTTP client used by every provider.
pub fn http_client() -> Result<reqwest::Client, LlmError> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| LlmError::Provider {
            message: format!("failed to create HTTP client: {e}"),
        })
}

/// Builds Vertex providers for chat profiles.
///
/// The HTTP client and token source are shared by every provider it
/// creates, so rebuilding a provider on a settings change is cheap.
pub struct VertexProviderFactory {
    client: reqwest::Client,
    endpoint: VertexEndpoint,
    tokens: DynTokenSource,
}

impl VertexProviderFactory {
    pub fn new(endpoint: VertexEndpoint, tokens: DynTokenSource) -> Result<Self, LlmError> {
        Ok(Self {
            client: http_client()?,
            endpoint,
            tokens,
        })
    }
}

impl ProviderFactory for VertexProviderFactory {
    fn create(&self, profile: &ChatProfile) -> Result<BoxLlmProvider, LlmError> {
        if profile.model.trim().is_empty() {
            return Err(LlmError::InvalidRequest(format!(
                "profile '{}' has no model",
                profile.id
            )));
        }
        tracing::debug!(profile = %profile.id, provider = %profile.provider, model = %profile.model, "Creating provider");

        let provider = match profile.provider {
            ProviderType::Anthropic => BoxLlmProvider::new(AnthropicVertexProvider::new(
                self.client.clone(),
                self.endpoint.clone(),
                self.tokens.clone(),
                profile.model.clone(),
            )),
            ProviderType::Gemini => BoxLlmProvider::new(GeminiVertexProvider::new(
                self.client.clone(),
                self.endpoint.clone(),
                self.tokens.clone(),
                profile.model.clone(),
            )),
        };
        Ok(provider)
    }
}

/// Fetch a bearer token, mapping failures to `AuthenticationFailed`.
pub(crate) async fn bearer_token(tokens: &DynTokenSource) -> Result<SecretString, LlmError> {
    tokens.token().await.map_err(|e| {
        tracing::warn!(source = tokens.name(), error = %e, "Could not obtain access token");
        LlmError::AuthenticationFailed
    })
}

/// Map a non-success HTTP status to an [`LlmError`].
pub(crate) fn map_status(status: StatusCode, headers: &HeaderMap, body: String) -> LlmError {
    match status.as_u16() {
        401 | 403 => LlmError::AuthenticationFailed,
        429 => LlmError::RateLimited {
            retry_after_ms: retry_after_ms(headers),
        },
        529 => LlmError::Overloaded(body),
        400 | 404 | 413 | 422 => LlmError::InvalidRequest(format!("HTTP {status}: {body}")),
        _ => LlmError::Provider {
            message: format!("HTTP {status}: {body}"),
        },
    }
}

/// `Retry-After` in seconds, converted to milliseconds.
fn retry_after_ms(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(|secs| secs * 1000)
}
