use std::time::Duration;

use axum::{
    Json,
    extract::{Multipart, Path, State, multipart::MultipartError},
    http::StatusCode,
};

use crate::dto::session::SessionResponse;
use crate::errors::AppError;
use crate::services::{pdf, text_extract};
use crate::session::{Session, SessionStore};
use crate::state::AppState;

/// Replaces the session's document with an uploaded PDF and extracts its text.
pub async fn upload(
    State(state): State<AppState>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<SessionResponse>, AppError> {
    // 404 before reading the body
    state.sessions.get(&id).await?;

    let field = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("Invalid multipart data", e))?
        .ok_or_else(|| AppError::Validation("No file provided".to_string()))?;

    let original_filename = field.file_name().unwrap_or("unnamed.pdf").to_string();

    let content_type = field
        .content_type()
        .unwrap_or("application/pdf")
        .to_string();

    if !text_extract::is_supported(&content_type, &original_filename) {
        return Err(AppError::Validation(
            "Only PDF files are supported".to_string(),
        ));
    }

    let data = field
        .bytes()
        .await
        .map_err(|e| multipart_error("Failed to read file", e))?;

    let max_size = state.config.upload.max_file_size_bytes();
    if data.len() > max_size {
        return Err(AppError::PayloadTooLarge(format!(
            "File too large. Maximum size is {} MB",
            state.config.upload.max_file_size_mb
        )));
    }

    if !pdf::looks_like_pdf(&data) {
        return Err(AppError::Validation(
            "Uploaded file is not a PDF".to_string(),
        ));
    }

    state
        .sessions
        .begin_extraction(&id, &original_filename)
        .await?;

    // The session must leave Extracting even if the client goes away.
    let timeout = Duration::from_secs(state.config.upload.extraction_timeout_secs);
    let task = tokio::spawn(extract_into_session(
        state.sessions.clone(),
        id,
        original_filename,
        data.to_vec(),
        timeout,
    ));

    let session = task
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Extraction task failed: {e}")))??;

    Ok(Json(session.into()))
}

async fn extract_into_session(
    sessions: SessionStore,
    id: String,
    filename: String,
    data: Vec<u8>,
    timeout: Duration,
) -> Result<Session, AppError> {
    match text_extract::extract_text(data, &filename, timeout).await {
        Ok(text) => {
            let session = sessions.complete_extraction(&id, text).await?;
            if let Some(warning) = &session.warning {
                tracing::warn!("Session {id}: '{filename}': {warning}");
            }
            Ok(session)
        }
        Err(e) => {
            let message = format!("Error processing PDF: {e:#}");
            sessions.fail_extraction(&id, &message).await?;
            Err(AppError::Unprocessable(message))
        }
    }
}

fn multipart_error(context: &str, e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(format!("{context}: {e}"))
    } else {
        AppError::Validation(format!("{context}: {e}"))
    }
}
