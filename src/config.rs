use std::time::Duration;

use anyhow::{Result, ensure};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::services::llm_provider;

/// Environment variable the provider key is read from before falling back to
/// `APP__LLM__API_KEY` / the config files.
pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub pipeline: PipelineConfig,
    pub upload: UploadConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    pub provider: String,
    #[serde(default)]
    pub api_key: String,
    pub notes_model: String,
    pub quiz_model: String,
    /// Falls back to `notes_model` when unset.
    pub merge_model: Option<String>,
    pub max_tokens: u64,
    pub temperature: f64,
}

impl LlmConfig {
    pub fn merge_model(&self) -> &str {
        self.merge_model.as_deref().unwrap_or(&self.notes_model)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    /// Approximate maximum characters per chunk sent to the backends.
    pub chunk_size: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    pub max_file_size_mb: usize,
    pub extraction_timeout_secs: u64,
}

impl UploadConfig {
    pub fn max_file_size_bytes(&self) -> usize {
        self.max_file_size_mb * 1024 * 1024
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    /// Sessions neither read nor changed for this long are dropped.
    pub ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

impl SessionConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());
        let api_key = std::env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty());

        Self::load_with(
            &environment,
            Environment::with_prefix("APP").separator("__"),
            api_key,
        )
    }

    pub fn load_with(
        environment: &str,
        env_source: Environment,
        api_key: Option<String>,
    ) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name("config/default"))
            .add_source(File::with_name(&format!("config/{environment}")).required(false))
            .add_source(env_source)
            .set_override_option("llm.api_key", api_key)?
            .build()?
            .try_deserialize()
    }

    /// Checks the values the service cannot start without.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.llm.api_key.trim().is_empty(),
            "No LLM API key configured. Set {API_KEY_ENV} or APP__LLM__API_KEY."
        );
        ensure!(
            llm_provider::is_supported_provider(&self.llm.provider),
            "Unsupported LLM provider '{}'",
            self.llm.provider
        );
        ensure!(self.pipeline.chunk_size > 0, "pipeline.chunk_size must be at least 1");
        ensure!(self.llm.max_tokens > 0, "llm.max_tokens must be at least 1");
        ensure!(
            self.upload.max_file_size_mb > 0,
            "upload.max_file_size_mb must be at least 1"
        );
        ensure!(self.session.ttl_secs > 0, "session.ttl_secs must be at least 1");
        ensure!(
            self.session.sweep_interval_secs > 0,
            "session.sweep_interval_secs must be at least 1"
        );
        Ok(())
    }
}
