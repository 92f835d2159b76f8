//! LLM integration for memo-tune.
//!
//! Classification only needs a single-token answer from a raw completion
//! model, so the provider speaks the OpenAI `/completions` API directly over
//! reqwest. Everything above this module depends on `LlmProvider` only.

pub mod openai;
pub mod provider;

pub use openai::OpenAiCompletions;
pub use provider::*;

use std::sync::Arc;

use crate::error::{ConfigError, LlmError};

/// Default completion model.
pub const DEFAULT_MODEL: &str = "text-davinci-003";

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: secrecy::SecretString,
    pub model: String,
    pub base_url: String,
}

impl LlmConfig {
    /// Read `OPENAI_API_KEY`, `MEMO_TUNE_MODEL` and `MEMO_TUNE_API_BASE`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("OPENAI_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("OPENAI_API_KEY".into()))?;

        Ok(Self {
            api_key: secrecy::SecretString::from(api_key),
            model: lookup("MEMO_TUNE_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: lookup("MEMO_TUNE_API_BASE").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }
}

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    tracing::info!(model = %config.model, base_url = %config.base_url, "Using OpenAI completions");
    Ok(Arc::new(OpenAiCompletions::new(
        config.api_key.clone(),
        &config.model,
        &config.base_url,
    )))
}
