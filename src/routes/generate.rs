use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::dto::session::SessionResponse;
use crate::errors::AppError;
use crate::services::pipeline::Pipeline;
use crate::session::SessionStore;
use crate::state::AppState;

/// Starts a generation run and returns right away; clients poll the session.
pub async fn generate(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let (session, text) = state.sessions.begin_generation(&id).await?;
    tracing::info!("Session {id}: generation started ({} chars)", text.len());

    // Detached so a dropped request never cancels a run half way.
    let pipeline = state.pipeline.clone();
    let sessions = state.sessions.clone();
    tokio::spawn(run_generation(pipeline, sessions, id, text));

    Ok((StatusCode::ACCEPTED, Json(session.into())))
}

async fn run_generation(pipeline: Arc<Pipeline>, sessions: SessionStore, id: String, text: String) {
    let recorded = match pipeline.run(&text).await {
        Ok(output) => {
            tracing::info!("Session {id}: generated {} chunks", output.chunk_count);
            sessions.complete_generation(&id, output).await
        }
        Err(e) => {
            let message = format!("Error generating notes and quiz: {e:#}");
            tracing::error!("Session {id}: {message}");
            sessions.fail_generation(&id, &message).await
        }
    };

    if let Err(e) = recorded {
        tracing::warn!("Session {id}: could not record generation result: {e}");
    }
}
