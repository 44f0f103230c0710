//! Ordered token source chain.

use super::{AuthError, DynTokenSource, TokenFuture, TokenSource};

/// Tries each source in order and returns the first token obtained.
pub struct ChainTokenSource {
    sources: Vec<DynTokenSource>,
}

impl ChainTokenSource {
    pub fn new(sources: Vec<DynTokenSource>) -> Self {
        Self { sources }
    }

    async fn first_token(&self) -> Result<secrecy::SecretString, AuthError> {
        let mut failures = Vec::new();
        for source in &self.sources {
            match source.token().await {
                Ok(token) => return Ok(token),
                Err(e) => {
                    tracing::debug!(source = source.name(), error = %e, "Token source failed");
                    failures.push(format!("{}: {e}", source.name()));
                }
            }
        }
        if failures.is_empty() {
            failures.push("no token sources configured".to_string());
        }
        Err(AuthError::Unavailable(failures.join("; ")))
    }
}

impl TokenSource for ChainTokenSource {
    fn name(&self) -> &str {
        "chain"
    }

    fn token(&self) -> TokenFuture<'_> {
        Box::pin(self.first_token())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use secrecy::{ExposeSecret, SecretString};

    use crate::auth::env::StaticTokenSource;

    struct Failing;

    impl TokenSource for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn token(&self) -> TokenFuture<'_> {
            Box::pin(async { Err(AuthError::Command("boom".to_string())) })
        }
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let chain = ChainTokenSource::new(vec![
            Arc::new(Failing),
            Arc::new(StaticTokenSource::new(SecretString::from("second"))),
            Arc::new(StaticTokenSource::new(SecretString::from("third"))),
        ]);
        assert_eq!(chain.token().await.unwrap().expose_secret(), "second");
    }

    #[tokio::test]
    async fn test_all_failures_reported() {
        let chain = ChainTokenSource::new(vec![Arc::new(Failing)]);
        let err = chain.token().await.unwrap_err();
        assert!(err.to_string().contains("failing: token command failed: boom"));

        let empty = ChainTokenSource::new(Vec::new());
        assert!(matches!(empty.token().await, Err(AuthError::Unavailable(_))));
    }
}
