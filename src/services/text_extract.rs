use std::time::Duration;

use anyhow::{Context, Result};

use crate::services::pdf;

/// Check that an upload is a PDF by MIME type, or by extension when the
/// client sent a generic type.
pub fn is_supported(content_type: &str, filename: &str) -> bool {
    match content_type {
        "application/pdf" => true,
        "application/octet-stream" | "" => extension_from_filename(filename)
            .is_some_and(|ext| ext == "pdf"),
        _ => false,
    }
}

/// Extract the text of an uploaded PDF.
///
/// Extraction is CPU-bound, so it runs on the blocking pool and is abandoned
/// after `timeout`.
pub async fn extract_text(bytes: Vec<u8>, filename: &str, timeout: Duration) -> Result<String> {
    let fname = filename.to_string();

    tracing::info!(
        "extract_text: starting blocking extraction for '{fname}' ({} bytes)",
        bytes.len()
    );

    let handle = tokio::task::spawn_blocking(move || {
        let result = pdf::extract_text(&bytes);
        match &result {
            Ok(text) => {
                tracing::info!("extract_text: '{fname}' extraction succeeded, {} chars", text.len())
            }
            Err(e) => tracing::error!("extract_text: '{fname}' extraction failed: {e:#}"),
        }
        result
    });

    match tokio::time::timeout(timeout, handle).await {
        Ok(join_result) => join_result.context("Text extraction task panicked")?,
        Err(_) => anyhow::bail!(
            "Text extraction timed out after {}s for '{filename}'",
            timeout.as_secs()
        ),
    }
}

fn extension_from_filename(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    Some(ext.to_lowercase())
}
