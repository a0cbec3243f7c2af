use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use uuid::Uuid;

use crate::errors::AppError;
use crate::services::pipeline::PipelineOutput;

pub const NO_TEXT_WARNING: &str = "No text extracted from the PDF. Please upload a valid PDF.";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Idle,
    Extracting,
    Ready,
    Generating,
    Done,
    Failed,
}

impl SessionStatus {
    /// A busy session accepts neither uploads nor new runs.
    pub fn is_busy(self) -> bool {
        matches!(self, SessionStatus::Extracting | SessionStatus::Generating)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Idle => write!(f, "idle"),
            SessionStatus::Extracting => write!(f, "extracting"),
            SessionStatus::Ready => write!(f, "ready"),
            SessionStatus::Generating => write!(f, "generating"),
            SessionStatus::Done => write!(f, "done"),
            SessionStatus::Failed => write!(f, "failed"),
        }
    }
}

/// One upload-and-generate workspace.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub status: SessionStatus,
    pub filename: Option<String>,
    pub text: Option<String>,
    pub output: Option<PipelineOutput>,
    pub error_message: Option<String>,
    pub warning: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    /// Last time the session was read or changed; drives idle eviction.
    last_active: Instant,
}

impl Session {
    fn new() -> Self {
        let now = now();
        Self {
            id: Uuid::new_v4().to_string(),
            status: SessionStatus::Idle,
            filename: None,
            text: None,
            output: None,
            error_message: None,
            warning: None,
            created_at: now.clone(),
            updated_at: now,
            last_active: Instant::now(),
        }
    }

    fn touch(&mut self, status: SessionStatus) {
        self.status = status;
        self.updated_at = now();
        self.last_active = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.last_active.elapsed()
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// In-memory session registry. Nothing survives a restart.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self) -> Session {
        let session = Session::new();
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        session
    }

    /// Returns a snapshot of the session. Reading counts as activity, so a
    /// client polling for results keeps its session alive.
    pub async fn get(&self, id: &str) -> Result<Session, AppError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(id).ok_or_else(|| not_found(id))?;
        session.last_active = Instant::now();
        Ok(session.clone())
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get(id).ok_or_else(|| not_found(id))?;
        if session.status.is_busy() {
            return Err(AppError::Conflict(format!(
                "Session is {}; try again when it finishes",
                session.status
            )));
        }
        sessions.remove(id);
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drops sessions untouched for longer than `ttl`. Busy sessions are kept
    /// because a background task still owns them.
    pub async fn evict_idle(&self, ttl: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.status.is_busy() || session.idle_for() <= ttl);
        before - sessions.len()
    }

    /// Runs [`Self::evict_idle`] every `period` until the runtime shuts down.
    pub fn spawn_sweeper(&self, ttl: Duration, period: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let evicted = store.evict_idle(ttl).await;
                if evicted > 0 {
                    tracing::info!(
                        "Evicted {evicted} idle sessions ({} remaining)",
                        store.len().await
                    );
                }
            }
        })
    }

    /// Starts a new upload, discarding the previous document and results.
    pub async fn begin_extraction(&self, id: &str, filename: &str) -> Result<Session, AppError> {
        self.update(id, |session| {
            if session.status.is_busy() {
                return Err(AppError::Conflict(format!(
                    "Cannot upload while the session is {}",
                    session.status
                )));
            }
            session.filename = Some(filename.to_string());
            session.text = None;
            session.output = None;
            session.error_message = None;
            session.warning = None;
            session.touch(SessionStatus::Extracting);
            Ok(())
        })
        .await
    }

    /// Stores the extracted text. Text with nothing but whitespace leaves the
    /// session idle with a warning instead of offering generation.
    pub async fn complete_extraction(&self, id: &str, text: String) -> Result<Session, AppError> {
        self.update(id, |session| {
            if text.trim().is_empty() {
                session.warning = Some(NO_TEXT_WARNING.to_string());
                session.touch(SessionStatus::Idle);
            } else {
                session.text = Some(text);
                session.touch(SessionStatus::Ready);
            }
            Ok(())
        })
        .await
    }

    pub async fn fail_extraction(&self, id: &str, message: &str) -> Result<Session, AppError> {
        self.update(id, |session| {
            session.text = None;
            session.error_message = Some(message.to_string());
            session.touch(SessionStatus::Failed);
            Ok(())
        })
        .await
    }

    /// Moves the session to `Generating` and hands back the text to process.
    pub async fn begin_generation(&self, id: &str) -> Result<(Session, String), AppError> {
        let session = self
            .update(id, |session| {
                if session.status.is_busy() {
                    return Err(AppError::Conflict(format!(
                        "Cannot generate while the session is {}",
                        session.status
                    )));
                }
                if session.text.is_none() {
                    return Err(AppError::Conflict(
                        "No document text available; upload a PDF first".to_string(),
                    ));
                }
                session.output = None;
                session.error_message = None;
                session.touch(SessionStatus::Generating);
                Ok(())
            })
            .await?;

        let text = session.text.clone().unwrap_or_default();
        Ok((session, text))
    }

    pub async fn complete_generation(
        &self,
        id: &str,
        output: PipelineOutput,
    ) -> Result<Session, AppError> {
        self.update(id, |session| {
            session.output = Some(output);
            session.touch(SessionStatus::Done);
            Ok(())
        })
        .await
    }

    /// Records a failed run. Partial results are never kept; the text stays so
    /// the run can be triggered again.
    pub async fn fail_generation(&self, id: &str, message: &str) -> Result<Session, AppError> {
        self.update(id, |session| {
            session.output = None;
            session.error_message = Some(message.to_string());
            session.touch(SessionStatus::Failed);
            Ok(())
        })
        .await
    }

    async fn update<F>(&self, id: &str, f: F) -> Result<Session, AppError>
    where
        F: FnOnce(&mut Session) -> Result<(), AppError>,
    {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(id).ok_or_else(|| not_found(id))?;
        f(session)?;
        Ok(session.clone())
    }
}

fn not_found(id: &str) -> AppError {
    AppError::NotFound(format!("Session {id} not found"))
}
