//! Application state wiring configuration, providers and storage together.
//!
//! AppState holds what both the CLI and the REST API need: the resolved
//! configuration, the shared session context (provider factory, object
//! store, attachment policy) and the registry of live HTTP sessions.

use std::path::Path;
use std::sync::Arc;

use gardenchat_core::chat::registry::SessionRegistry;
use gardenchat_core::chat::session::SessionContext;
use gardenchat_core::storage::box_store::BoxObjectStore;
use gardenchat_infra::auth::default_token_source;
use gardenchat_infra::config::load_config;
use gardenchat_infra::llm::{VertexEndpoint, VertexProviderFactory, http_client};
use gardenchat_infra::storage::gcs::GcsObjectStore;
use gardenchat_types::config::AppConfig;

/// Shared application state.
///
/// Cheap to clone; used as axum router state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub context: Arc<SessionContext>,
    pub sessions: Arc<SessionRegistry>,
}

impl AppState {
    /// Load configuration and build the Vertex providers and GCS store.
    pub async fn init(config_path: Option<&Path>) -> anyhow::Result<Self> {
        let config = load_config(config_path).await?;

        let tokens = default_token_source();
        let endpoint = VertexEndpoint::new(&config.project_id, &config.location);
        let factory = VertexProviderFactory::new(endpoint, tokens.clone())?;

        let store = match &config.bucket {
            Some(bucket) => {
                tracing::info!(bucket = %bucket, "Large image uploads enabled");
                let gcs = GcsObjectStore::new(http_client()?, bucket.clone(), tokens);
                Some(Arc::new(BoxObjectStore::new(gcs)))
            }
            None => {
                tracing::debug!("No bucket configured, large image uploads disabled");
                None
            }
        };

        let context = SessionContext::new(&config, Arc::new(factory), store);
        Ok(Self::from_parts(config, context))
    }

    pub fn from_parts(config: AppConfig, context: SessionContext) -> Self {
        let context = Arc::new(context);
        Self {
            config: Arc::new(config),
            sessions: Arc::new(SessionRegistry::new(context.clone())),
            context,
        }
    }
}
