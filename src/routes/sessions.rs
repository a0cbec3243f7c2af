use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::dto::session::SessionResponse;
use crate::errors::AppError;
use crate::state::AppState;

pub async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<SessionResponse>) {
    let session = state.sessions.create().await;
    tracing::info!("Session {} created", session.id);
    (StatusCode::CREATED, Json(session.into()))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = state.sessions.get(&id).await?;
    Ok(Json(session.into()))
}

pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.sessions.delete(&id).await?;
    tracing::info!("Session {id} deleted");
    Ok(StatusCode::NO_CONTENT)
}
