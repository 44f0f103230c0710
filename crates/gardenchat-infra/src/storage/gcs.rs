//! Google Cloud Storage object store.
//!
//! Uploads with a single `uploadType=media` request, which suits images of
//! a few megabytes. The returned `gs://` URI is readable by Gemini models in
//! the same project.

use secrecy::ExposeSecret;
use serde::Deserialize;

use gardenchat_core::storage::object_store::ObjectStore;
use gardenchat_types::attachment::ObjectRef;
use gardenchat_types::error::StorageError;

use crate::auth::DynTokenSource;

const DEFAULT_BASE_URL: &str = "https://storage.googleapis.com";

/// Subset of the GCS object resource returned by an upload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GcsObject {
    bucket: String,
    name: String,
    content_type: Option<String>,
    /// Decimal string, as the JSON API encodes uint64 values.
    size: Option<String>,
}

/// Object store backed by one GCS bucket.
pub struct GcsObjectStore {
    client: reqwest::Client,
    base_url: String,
    bucket: String,
    tokens: DynTokenSource,
}

impl GcsObjectStore {
    pub fn new(client: reqwest::Client, bucket: impl Into<String>, tokens: DynTokenSource) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            bucket: bucket.into(),
            tokens,
        }
    }

    /// Override the base URL (useful for testing or emulators).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn upload_url(&self) -> String {
        format!("{}/upload/storage/v1/b/{}/o", self.base_url, self.bucket)
    }
}

impl ObjectStore for GcsObjectStore {
    fn name(&self) -> &str {
        "gcs"
    }

    async fn upload(&self, name: &str, media_type: &str, data: &[u8]) -> Result<ObjectRef, StorageError> {
        let token = self
            .tokens
            .token()
            .await
            .map_err(|e| StorageError::Authentication(e.to_string()))?;

        let response = self
            .client
            .post(self.upload_url())
            .query(&[("uploadType", "media"), ("name", name)])
            .bearer_auth(token.expose_secret())
            .header(reqwest::header::CONTENT_TYPE, media_type)
            .body(data.to_vec())
            .send()
            .await
            .map_err(|e| StorageError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, bucket = %self.bucket, object = name, "GCS upload rejected");
            return Err(match status.as_u16() {
                401 | 403 => StorageError::Authentication(format!("HTTP {status}: {body}")),
                code => StorageError::Rejected {
                    status: code,
                    message: body,
                },
            });
        }

        let object: GcsObject = response
            .json()
            .await
            .map_err(|e| StorageError::Transport(format!("invalid upload response: {e}")))?;

        let size_bytes = object
            .size
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or(data.len() as u64);

        tracing::debug!(bucket = %object.bucket, object = %object.name, size_bytes, "Uploaded object");

        Ok(ObjectRef {
            uri: format!("gs://{}/{}", object.bucket, object.name),
            media_type: object.content_type.unwrap_or_else(|| media_type.to_string()),
            size_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use secrecy::SecretString;
    use wiremock::matchers::{body_bytes, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::auth::env::StaticTokenSource;

    fn store(base_url: &str) -> GcsObjectStore {
        GcsObjectStore::new(
            reqwest::Client::new(),
            "chat-uploads",
            Arc::new(StaticTokenSource::new(SecretString::from("test-token"))),
        )
        .with_base_url(base_url)
    }

    #[tokio::test]
    async fn test_upload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload/storage/v1/b/chat-uploads/o"))
            .and(query_param("uploadType", "media"))
            .and(query_param("name", "attachments/s1/abc.png"))
            .and(header("authorization", "Bearer test-token"))
            .and(header("content-type", "image/png"))
            .and(body_bytes(b"png-bytes".to_vec()))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "kind": "storage#object",
                "bucket": "chat-uploads",
                "name": "attachments/s1/abc.png",
                "contentType": "image/png",
                "size": "9"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let object = store(&server.uri())
            .upload("attachments/s1/abc.png", "image/png", b"png-bytes")
            .await
            .unwrap();
        assert_eq!(object.uri, "gs://chat-uploads/attachments/s1/abc.png");
        assert_eq!(object.media_type, "image/png");
        assert_eq!(object.size_bytes, 9);
    }

    #[tokio::test]
    async fn test_upload_forbidden() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("no access"))
            .mount(&server)
            .await;

        let err = store(&server.uri())
            .upload("a.png", "image/png", b"x")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Authentication(msg) if msg.contains("no access")));
    }

    #[tokio::test]
    async fn test_upload_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404).set_body_string("bucket not found"))
            .mount(&server)
            .await;

        let err = store(&server.uri())
            .upload("a.png", "image/png", b"x")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Rejected { status: 404, .. }));
    }

    #[test]
    fn test_accessors() {
        let store = store("http://localhost/");
        assert_eq!(store.bucket(), "chat-uploads");
        assert_eq!(store.name(), "gcs");
        assert_eq!(store.upload_url(), "http://localhost/upload/storage/v1/b/chat-uploads/o");
    }
}
