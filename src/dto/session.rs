use serde::Serialize;

use crate::session::{Session, SessionStatus};

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: String,
    pub status: SessionStatus,
    pub filename: Option<String>,
    pub text: Option<String>,
    pub chunk_count: Option<usize>,
    pub notes: Option<String>,
    pub quizzes: Option<String>,
    pub merged: Option<String>,
    pub error_message: Option<String>,
    pub warning: Option<String>,
    /// Generation is offered only once a document with text is loaded.
    pub can_generate: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        let can_generate = session.text.is_some() && !session.status.is_busy();
        let (chunk_count, notes, quizzes, merged) = match session.output {
            Some(out) => (
                Some(out.chunk_count),
                Some(out.notes),
                Some(out.quizzes),
                Some(out.merged),
            ),
            None => (None, None, None, None),
        };

        Self {
            id: session.id,
            status: session.status,
            filename: session.filename,
            text: session.text,
            chunk_count,
            notes,
            quizzes,
            merged,
            error_message: session.error_message,
            warning: session.warning,
            can_generate,
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }
}
