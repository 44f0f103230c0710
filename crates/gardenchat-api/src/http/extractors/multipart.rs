//! Multipart form parsing for message uploads.
//!
//! Form fields:
//! - `content`: the message text (at most one)
//! - `file` / `files`: attached files, any number

use axum::extract::Multipart;

use gardenchat_core::chat::session::UserTurn;
use gardenchat_types::attachment::Attachment;

use crate::http::error::AppError;

/// Read a user turn from a multipart form.
///
/// Unknown fields are ignored.
pub async fn read_turn(mut multipart: Multipart) -> Result<UserTurn, AppError> {
    let mut turn = UserTurn::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "content" => {
                turn.text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("invalid content field: {e}")))?;
            }
            "file" | "files" => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let media_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("invalid file '{filename}': {e}")))?;
                tracing::debug!(filename = %filename, media_type = ?media_type, size = data.len(), "Received attachment");
                turn.attachments
                    .push(Attachment::new(filename, media_type, data.to_vec()));
            }
            other => {
                tracing::debug!(field = other, "Ignoring unknown multipart field");
            }
        }
    }

    Ok(turn)
}
