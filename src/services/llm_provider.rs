use anyhow::{Context, Result};
use rig::client::completion::CompletionClientDyn;
use rig::client::{ProviderClient, ProviderValue};
use rig::providers::{
    anthropic, deepseek, gemini, groq, mistral, ollama, openai, openrouter, together, xai,
};

/// Provider ids accepted in `llm.provider`.
pub const SUPPORTED_PROVIDERS: &[&str] = &[
    "openrouter",
    "openai",
    "anthropic",
    "groq",
    "deepseek",
    "gemini",
    "mistral",
    "together",
    "xai",
    "ollama",
];

fn create_provider_boxed(provider: &str, api_key: &str) -> Result<Box<dyn ProviderClient>> {
    let value = ProviderValue::Simple(api_key.to_string());

    let boxed: Box<dyn ProviderClient> = match provider.to_lowercase().as_str() {
        "openrouter" => {
            let c: openrouter::Client<reqwest::Client> = openrouter::Client::from_val(value);
            c.boxed()
        }
        "openai" => {
            let c: openai::Client<reqwest::Client> = openai::Client::from_val(value);
            c.boxed()
        }
        "anthropic" => {
            let c: anthropic::Client<reqwest::Client> = anthropic::Client::from_val(value);
            c.boxed()
        }
        "groq" => {
            let c: groq::Client<reqwest::Client> = groq::Client::from_val(value);
            c.boxed()
        }
        "deepseek" => {
            let c: deepseek::Client<reqwest::Client> = deepseek::Client::from_val(value);
            c.boxed()
        }
        "gemini" | "google" => {
            let c: gemini::Client<reqwest::Client> = gemini::Client::from_val(value);
            c.boxed()
        }
        "mistral" => {
            let c: mistral::Client<reqwest::Client> = mistral::Client::from_val(value);
            c.boxed()
        }
        "together" => {
            let c: together::Client<reqwest::Client> = together::Client::from_val(value);
            c.boxed()
        }
        "xai" => {
            let c: xai::Client<reqwest::Client> = xai::Client::from_val(value);
            c.boxed()
        }
        "ollama" => {
            let c: ollama::Client<reqwest::Client> = ollama::Client::from_val(value);
            c.boxed()
        }
        other => return Err(anyhow::anyhow!("Unsupported provider: {other}")),
    };

    Ok(boxed)
}

pub fn create_completion_client(
    provider: &str,
    api_key: &str,
) -> Result<Box<dyn CompletionClientDyn>> {
    let boxed = create_provider_boxed(provider, api_key)?;
    boxed
        .as_completion()
        .context(format!("Provider '{provider}' does not support completions"))
}

pub fn is_supported_provider(provider: &str) -> bool {
    let provider = provider.to_lowercase();
    provider == "google" || SUPPORTED_PROVIDERS.contains(&provider.as_str())
}
