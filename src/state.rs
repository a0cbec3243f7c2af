use crate::config::AppConfig;
use crate::services::pipeline::Pipeline;
use crate::session::SessionStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sessions: SessionStore,
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(config: AppConfig, pipeline: Pipeline) -> Self {
        Self {
            config: Arc::new(config),
            sessions: SessionStore::new(),
            pipeline: Arc::new(pipeline),
        }
    }
}
