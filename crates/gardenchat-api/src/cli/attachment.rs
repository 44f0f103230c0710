//! Reading local files as chat attachments.

use std::path::Path;

use anyhow::Context;

use gardenchat_types::attachment::Attachment;

/// Declared media type from the file extension, if it is a known image type.
///
/// Anything else is left undeclared so the attachment policy can sniff it.
pub fn media_type_for_path(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let media_type = match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => return None,
    };
    Some(media_type.to_string())
}

/// Load a file into an [`Attachment`].
pub async fn read_attachment(path: &Path) -> anyhow::Result<Attachment> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(Attachment::new(filename, media_type_for_path(path), data))
}
