use anyhow::Result;
use async_trait::async_trait;
use rig::client::completion::CompletionClientDyn;
use rig::completion::Prompt;

use crate::config::LlmConfig;
use crate::services::llm_provider;

/// A remote model that turns one prompt into one block of text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Model identifier, used in logs and error messages.
    fn model(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Chat-completion backend reached through rig.
///
/// The provider client, and with it the HTTP connection pool, is built once
/// and reused for every request.
pub struct RigGenerator {
    client: Box<dyn CompletionClientDyn>,
    model: String,
    max_tokens: u64,
    temperature: f64,
}

impl RigGenerator {
    /// Builds a backend for `model`, checking up front that the provider
    /// client can be constructed.
    pub fn new(llm: &LlmConfig, model: &str) -> Result<Self> {
        let client = llm_provider::create_completion_client(&llm.provider, &llm.api_key)?;

        Ok(Self {
            client,
            model: model.to_string(),
            max_tokens: llm.max_tokens,
            temperature: llm.temperature,
        })
    }
}

impl std::fmt::Debug for RigGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RigGenerator")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TextGenerator for RigGenerator {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let agent = self
            .client
            .agent(&self.model)
            .max_tokens(self.max_tokens)
            .temperature(self.temperature)
            .build();

        let response = agent
            .prompt(prompt)
            .await
            .map_err(|e| anyhow::anyhow!("LLM error from '{}': {e}", self.model))?;

        Ok(response)
    }
}
