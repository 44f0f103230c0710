//! Google OAuth2 access tokens for Vertex AI and Cloud Storage.
//!
//! - `env`: static token from `GOOGLE_OAUTH_ACCESS_TOKEN`
//! - `gcloud`: token minted by `gcloud auth print-access-token`
//! - `cache`: reuses a token until it is close to expiry
//! - `chain`: tries sources in order, first token wins
//!
//! Tokens are carried as [`SecretString`] and never logged.

pub mod cache;
pub mod chain;
pub mod env;
pub mod gcloud;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;

use self::cache::CachedTokenSource;
use self::chain::ChainTokenSource;
use self::env::StaticTokenSource;
use self::gcloud::GcloudTokenSource;

/// Lifetime assumed for minted tokens. Google issues them for 60 minutes.
pub const TOKEN_CACHE_TTL: Duration = Duration::from_secs(45 * 60);

/// Errors resolving an access token.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("no access token available ({0})")]
    Unavailable(String),

    #[error("token command failed: {0}")]
    Command(String),
}

/// Boxed future returned by [`TokenSource::token`].
pub type TokenFuture<'a> = Pin<Box<dyn Future<Output = Result<SecretString, AuthError>> + Send + 'a>>;

/// A source of bearer tokens.
///
/// Object-safe so providers and the object store can share one
/// `Arc<dyn TokenSource>`.
pub trait TokenSource: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    fn token(&self) -> TokenFuture<'_>;
}

pub type DynTokenSource = Arc<dyn TokenSource>;

/// Default chain: the static env token if set, then a cached `gcloud` token.
pub fn default_token_source() -> DynTokenSource {
    let mut chain: Vec<DynTokenSource> = Vec::new();

    if let Some(source) = StaticTokenSource::from_env() {
        chain.push(Arc::new(source));
    }
    chain.push(Arc::new(CachedTokenSource::new(
        Arc::new(GcloudTokenSource::new()),
        TOKEN_CACHE_TTL,
    )));

    Arc::new(ChainTokenSource::new(chain))
}
