//! Token caching.

use std::time::{Duration, Instant};

use secrecy::SecretString;
use tokio::sync::Mutex;

use super::{AuthError, DynTokenSource, TokenFuture, TokenSource};

/// Reuses the inner source's token for `ttl`.
///
/// The lock is held while refreshing so concurrent callers wait for one
/// refresh instead of each spawning their own.
pub struct CachedTokenSource {
    inner: DynTokenSource,
    ttl: Duration,
    cached: Mutex<Option<(SecretString, Instant)>>,
}

impl CachedTokenSource {
    pub fn new(inner: DynTokenSource, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            cached: Mutex::new(None),
        }
    }

    async fn get(&self) -> Result<SecretString, AuthError> {
        let mut cached = self.cached.lock().await;
        if let Some((token, fetched_at)) = cached.as_ref()
            && fetched_at.elapsed() < self.ttl
        {
            return Ok(token.clone());
        }

        let token = self.inner.token().await?;
        *cached = Some((token.clone(), Instant::now()));
        Ok(token)
    }
}

impl TokenSource for CachedTokenSource {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn token(&self) -> TokenFuture<'_> {
        Box::pin(self.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use secrecy::ExposeSecret;

    struct Counting(AtomicUsize);

    impl TokenSource for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        fn token(&self) -> TokenFuture<'_> {
            let n = self.0.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move { Ok(SecretString::from(format!("token-{n}"))) })
        }
    }

    #[tokio::test]
    async fn test_token_reused_within_ttl() {
        let inner = Arc::new(Counting(AtomicUsize::new(0)));
        let cache = CachedTokenSource::new(inner.clone(), Duration::from_secs(60));

        assert_eq!(cache.token().await.unwrap().expose_secret(), "token-0");
        assert_eq!(cache.token().await.unwrap().expose_secret(), "token-0");
        assert_eq!(inner.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_token_refreshed_after_ttl() {
        let inner = Arc::new(Counting(AtomicUsize::new(0)));
        let cache = CachedTokenSource::new(inner.clone(), Duration::ZERO);

        cache.token().await.unwrap();
        assert_eq!(cache.token().await.unwrap().expose_secret(), "token-1");
        assert_eq!(cache.name(), "counting");
    }
}
