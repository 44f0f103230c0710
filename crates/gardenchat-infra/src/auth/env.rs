//! Static access token, usually from the environment.

use secrecy::SecretString;

use super::{AuthError, TokenFuture, TokenSource};

pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

/// Hands out the same token every time.
pub struct StaticTokenSource {
    token: SecretString,
}

impl StaticTokenSource {
    pub fn new(token: SecretString) -> Self {
        Self { token }
    }

    /// Read `GOOGLE_OAUTH_ACCESS_TOKEN`. Unset or blank yields `None`.
    pub fn from_env() -> Option<Self> {
        std::env::var(ACCESS_TOKEN_ENV)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(|v| Self::new(SecretString::from(v)))
    }
}

impl TokenSource for StaticTokenSource {
    fn name(&self) -> &str {
        "env"
    }

    fn token(&self) -> TokenFuture<'_> {
        let token = self.token.clone();
        Box::pin(async move { Ok::<_, AuthError>(token) })
    }
}
