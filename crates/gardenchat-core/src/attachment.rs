//! Attachment policy: turns files attached to a user turn into image parts.
//!
//! Only images are forwarded to the model. Small images travel inline as
//! base64; larger ones are uploaded to the object store and referenced by
//! URI when both the store and the provider allow it.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use uuid::Uuid;

use gardenchat_types::attachment::{
    Attachment, DEFAULT_INLINE_IMAGE_LIMIT, SUPPORTED_IMAGE_TYPES,
};
use gardenchat_types::config::{AppConfig, DEFAULT_UPLOAD_PREFIX};
use gardenchat_types::error::AttachmentError;
use gardenchat_types::llm::ContentPart;

use crate::storage::box_store::BoxObjectStore;

/// Declared types that carry no information and trigger byte sniffing.
const GENERIC_MEDIA_TYPES: &[&str] = &["application/octet-stream", "binary/octet-stream"];

/// Limits and naming for attachment handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentPolicy {
    /// Largest image (raw bytes) that is sent inline.
    pub inline_limit: usize,
    /// Object name prefix for uploaded images.
    pub upload_prefix: String,
}

impl Default for AttachmentPolicy {
    fn default() -> Self {
        Self {
            inline_limit: DEFAULT_INLINE_IMAGE_LIMIT,
            upload_prefix: DEFAULT_UPLOAD_PREFIX.to_string(),
        }
    }
}

impl AttachmentPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            inline_limit: config.inline_image_limit_bytes,
            upload_prefix: config.upload_prefix.clone(),
        }
    }

    /// Convert attachments into image content parts, in attachment order.
    ///
    /// Non-image files are skipped with a warning. `store` is only used when
    /// `accepts_refs` is true, i.e. the provider can read storage URIs.
    pub async fn prepare(
        &self,
        session_id: Uuid,
        attachments: &[Attachment],
        store: Option<&BoxObjectStore>,
        accepts_refs: bool,
    ) -> Result<Vec<ContentPart>, AttachmentError> {
        let mut parts = Vec::with_capacity(attachments.len());

        for attachment in attachments {
            let Some(media_type) = classify(attachment)? else {
                warn!(
                    filename = %attachment.filename,
                    media_type = ?attachment.media_type,
                    "Skipping non-image attachment"
                );
                continue;
            };

            let size = attachment.data.len();
            if size <= self.inline_limit {
                debug!(filename = %attachment.filename, size, %media_type, "Inlining image");
                parts.push(ContentPart::InlineImage {
                    media_type,
                    data: BASE64.encode(&attachment.data),
                });
                continue;
            }

            let store = match store {
                Some(store) if accepts_refs => store,
                _ => {
                    return Err(AttachmentError::TooLarge {
                        filename: attachment.filename.clone(),
                        size,
                        limit: self.inline_limit,
                    });
                }
            };

            let name = object_name(&self.upload_prefix, session_id, &attachment.data, &media_type);
            let object = store
                .upload(&name, &media_type, &attachment.data)
                .await
                .map_err(|source| AttachmentError::Upload {
                    filename: attachment.filename.clone(),
                    source,
                })?;

            info!(
                filename = %attachment.filename,
                size,
                store = store.name(),
                uri = %object.uri,
                "Uploaded image attachment"
            );
            parts.push(ContentPart::ImageRef {
                media_type: object.media_type,
                uri: object.uri,
            });
        }

        Ok(parts)
    }
}

/// Decide whether an attachment is an image and, if so, its media type.
///
/// Returns `Ok(None)` for files that are not images.
fn classify(attachment: &Attachment) -> Result<Option<String>, AttachmentError> {
    let declared = attachment
        .media_type
        .as_deref()
        .map(normalize_media_type)
        .filter(|mt| !mt.is_empty() && !GENERIC_MEDIA_TYPES.contains(&mt.as_str()));

    if let Some(declared) = &declared
        && !declared.starts_with("image/")
    {
        return Ok(None);
    }

    if attachment.data.is_empty() {
        return Err(AttachmentError::Empty(attachment.filename.clone()));
    }

    let media_type = match declared {
        Some(declared) => declared,
        None => match sniff_media_type(&attachment.data) {
            Some(sniffed) => sniffed.to_string(),
            None => return Ok(None),
        },
    };

    if !SUPPORTED_IMAGE_TYPES.contains(&media_type.as_str()) {
        return Err(AttachmentError::UnsupportedMediaType {
            filename: attachment.filename.clone(),
            media_type,
        });
    }

    Ok(Some(media_type))
}

/// Lowercase, drop parameters, and fold the common `image/jpg` alias.
fn normalize_media_type(raw: &str) -> String {
    let essence = raw.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    match essence.as_str() {
        "image/jpg" | "image/pjpeg" => "image/jpeg".to_string(),
        _ => essence,
    }
}

/// Identify a supported image format from its magic bytes.
pub fn sniff_media_type(data: &[u8]) -> Option<&'static str> {
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if data.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("image/png")
    } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if data.len() >= 12 && &data[..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        Some("image/webp")
    } else {
        None
    }
}

/// File extension used for uploaded objects of a media type.
pub fn extension_for(media_type: &str) -> &'static str {
    match media_type {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "bin",
    }
}

/// Object name `{prefix}/{session_id}/{sha256}.{ext}`.
///
/// Content-addressed within a session, so re-sending an image reuses its object.
pub fn object_name(prefix: &str, session_id: Uuid, data: &[u8], media_type: &str) -> String {
    let digest = Sha256::digest(data);
    let ext = extension_for(media_type);
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        format!("{session_id}/{digest:x}.{ext}")
    } else {
        format!("{prefix}/{session_id}/{digest:x}.{ext}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];

    fn small_policy(limit: usize) -> AttachmentPolicy {
        AttachmentPolicy {
            inline_limit: limit,
            upload_prefix: "uploads".to_string(),
        }
    }

    #[test]
    fn test_sniff_media_type() {
        assert_eq!(sniff_media_type(PNG), Some("image/png"));
        assert_eq!(sniff_media_type(JPEG), Some("image/jpeg"));
        assert_eq!(sniff_media_type(b"GIF89a...."), Some("image/gif"));
        assert_eq!(sniff_media_type(b"RIFF\0\0\0\0WEBPVP8 "), Some("image/webp"));
        assert_eq!(sniff_media_type(b"%PDF-1.7"), None);
        assert_eq!(sniff_media_type(b""), None);
    }

    #[test]
    fn test_object_name_is_content_addressed() {
        let id = Uuid::now_v7();
        let a = object_name("/uploads/", id, PNG, "image/png");
        let b = object_name("uploads", id, PNG, "image/png");
        assert_eq!(a, b);
        assert!(a.starts_with(&format!("uploads/{id}/")));
        assert!(a.ends_with(".png"));
        // 64 hex chars of sha256
        let file = a.rsplit('/').next().unwrap();
        assert_eq!(file.len(), 64 + ".png".len());

        let other = object_name("uploads", id, JPEG, "image/jpeg");
        assert_ne!(a, other);
        assert!(object_name("", id, PNG, "image/png").starts_with(&id.to_string()));
    }

    #[tokio::test]
    async fn test_small_image_is_inlined() {
        let policy = AttachmentPolicy::default();
        let attachments = vec![Attachment::new("cat.png", Some("image/png".into()), PNG.to_vec())];
        let parts = policy
            .prepare(Uuid::now_v7(), &attachments, None, false)
            .await
            .unwrap();
        assert_eq!(parts.len(), 1);
        match &parts[0] {
            ContentPart::InlineImage { media_type, data } => {
                assert_eq!(media_type, "image/png");
                assert_eq!(BASE64.decode(data).unwrap(), PNG);
            }
            other => panic!("expected inline image, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_images_are_skipped() {
        let policy = AttachmentPolicy::default();
        let attachments = vec![
            Attachment::new("notes.txt", Some("text/plain".into()), b"hello".to_vec()),
            Attachment::new("doc.pdf", None, b"%PDF-1.7".to_vec()),
            Attachment::new("dog.jpg", Some("image/jpg".into()), JPEG.to_vec()),
        ];
        let parts = policy
            .prepare(Uuid::now_v7(), &attachments, None, false)
            .await
            .unwrap();
        assert_eq!(parts.len(), 1);
        assert!(matches!(
            &parts[0],
            ContentPart::InlineImage { media_type, .. } if media_type == "image/jpeg"
        ));
    }

    #[tokio::test]
    async fn test_missing_media_type_is_sniffed() {
        let policy = AttachmentPolicy::default();
        let attachments = vec![Attachment::new(
            "blob",
            Some("application/octet-stream".into()),
            PNG.to_vec(),
        )];
        let parts = policy
            .prepare(Uuid::now_v7(), &attachments, None, false)
            .await
            .unwrap();
        assert!(matches!(
            &parts[0],
            ContentPart::InlineImage { media_type, .. } if media_type == "image/png"
        ));
    }

    #[tokio::test]
    async fn test_unsupported_image_type_rejected() {
        let policy = AttachmentPolicy::default();
        let attachments = vec![Attachment::new("a.tiff", Some("image/tiff".into()), vec![1, 2, 3])];
        let err = policy
            .prepare(Uuid::now_v7(), &attachments, None, false)
            .await
            .unwrap_err();
        assert!(matches!(err, AttachmentError::UnsupportedMediaType { media_type, .. } if media_type == "image/tiff"));
    }

    #[tokio::test]
    async fn test_empty_image_rejected() {
        let policy = AttachmentPolicy::default();
        let attachments = vec![Attachment::new("a.png", Some("image/png".into()), Vec::new())];
        let err = policy
            .prepare(Uuid::now_v7(), &attachments, None, false)
            .await
            .unwrap_err();
        assert!(matches!(err, AttachmentError::Empty(name) if name == "a.png"));
    }

    #[tokio::test]
    async fn test_large_image_uploaded_when_refs_accepted() {
        let policy = small_policy(4);
        let store = BoxObjectStore::new(MemoryStore::new("bucket"));
        let session_id = Uuid::now_v7();
        let attachments = vec![Attachment::new("big.png", Some("image/png".into()), PNG.to_vec())];

        let parts = policy
            .prepare(session_id, &attachments, Some(&store), true)
            .await
            .unwrap();

        match &parts[0] {
            ContentPart::ImageRef { media_type, uri } => {
                assert_eq!(media_type, "image/png");
                assert!(uri.starts_with(&format!("mem://bucket/uploads/{session_id}/")));
            }
            other => panic!("expected image ref, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_large_image_too_large_without_ref_support() {
        let policy = small_policy(4);
        let store = BoxObjectStore::new(MemoryStore::new("bucket"));
        let attachments = vec![Attachment::new("big.png", Some("image/png".into()), PNG.to_vec())];

        let err = policy
            .prepare(Uuid::now_v7(), &attachments, Some(&store), false)
            .await
            .unwrap_err();
        assert!(matches!(err, AttachmentError::TooLarge { size, limit: 4, .. } if size == PNG.len()));

        let err = policy
            .prepare(Uuid::now_v7(), &attachments, None, true)
            .await
            .unwrap_err();
        assert!(matches!(err, AttachmentError::TooLarge { .. }));
    }

    #[tokio::test]
    async fn test_upload_failure_is_reported() {
        let policy = small_policy(4);
        let store = BoxObjectStore::new(MemoryStore::failing());
        let attachments = vec![Attachment::new("big.png", Some("image/png".into()), PNG.to_vec())];

        let err = policy
            .prepare(Uuid::now_v7(), &attachments, Some(&store), true)
            .await
            .unwrap_err();
        assert!(matches!(err, AttachmentError::Upload { filename, .. } if filename == "big.png"));
    }
}
