//! Access token from the gcloud CLI.

use secrecy::SecretString;
use tokio::process::Command;

use super::{AuthError, TokenFuture, TokenSource};

/// Runs `gcloud auth print-access-token` for each request.
///
/// Wrap it in a [`CachedTokenSource`](super::cache::CachedTokenSource);
/// the subprocess takes around a second.
pub struct GcloudTokenSource {
    program: String,
    args: Vec<String>,
}

impl GcloudTokenSource {
    pub fn new() -> Self {
        Self {
            program: "gcloud".to_string(),
            args: vec!["auth".to_string(), "print-access-token".to_string()],
        }
    }

    /// Use a different command line (tests, wrappers).
    pub fn with_command(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    async fn fetch(&self) -> Result<SecretString, AuthError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .await
            .map_err(|e| AuthError::Command(format!("could not run {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AuthError::Command(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if token.is_empty() {
            return Err(AuthError::Command(format!("{} printed no token", self.program)));
        }
        tracing::debug!(program = %self.program, "Obtained access token from CLI");
        Ok(SecretString::from(token))
    }
}

impl Default for GcloudTokenSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenSource for GcloudTokenSource {
    fn name(&self) -> &str {
        "gcloud"
    }

    fn token(&self) -> TokenFuture<'_> {
        Box::pin(self.fetch())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[tokio::test]
    async fn test_command_output_is_trimmed() {
        let source = GcloudTokenSource::with_command("echo", vec!["  ya29.from-cli  ".to_string()]);
        let token = source.token().await.unwrap();
        assert_eq!(token.expose_secret(), "ya29.from-cli");
    }

    #[tokio::test]
    async fn test_failing_command() {
        let source = GcloudTokenSource::with_command("false", Vec::new());
        assert!(matches!(source.token().await, Err(AuthError::Command(_))));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let source = GcloudTokenSource::with_command("definitely-not-gcloud-xyz", Vec::new());
        assert!(matches!(source.token().await, Err(AuthError::Command(_))));
    }
}
