//! Provider construction port.

use gardenchat_types::chat::ChatProfile;
use gardenchat_types::llm::LlmError;

use super::box_provider::BoxLlmProvider;

/// Builds a provider client for a chat profile.
///
/// Chat sessions call this on start and again on every settings change,
/// so implementations should be cheap (share HTTP clients and credentials).
pub trait ProviderFactory: Send + Sync {
    fn create(&self, profile: &ChatProfile) -> Result<BoxLlmProvider, LlmError>;
}
