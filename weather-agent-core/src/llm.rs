//! LLM host abstraction.
//!
//! The host accepts a prompt plus a set of callable tools, resolves any tool
//! calls the model makes, and returns the final generated text.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

use crate::{
    config::{Config, LlmSettings},
    tool::Tool,
};

pub mod azure;

pub use azure::AzureOpenAiHost;

/// Generation parameters for a single invocation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecutionSettings {
    pub temperature: f32,
    pub max_tokens: u32,
    /// Let the model call registered tools and feed their results back automatically.
    pub auto_invoke_tools: bool,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            temperature: crate::config::DEFAULT_TEMPERATURE,
            max_tokens: crate::config::DEFAULT_MAX_TOKENS,
            auto_invoke_tools: true,
        }
    }
}

impl From<&LlmSettings> for ExecutionSettings {
    fn from(settings: &LlmSettings) -> Self {
        Self {
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            auto_invoke_tools: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("LLM endpoint returned status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("failed to parse LLM response: {0}")]
    Decode(String),

    #[error("LLM response contained no choices")]
    EmptyChoices,

    #[error("model kept calling tools after {0} rounds")]
    ToolLoop(usize),
}

#[async_trait]
pub trait LlmHost: Send + Sync {
    /// Run `prompt` to completion. `Ok(None)` means the model produced no text.
    async fn invoke_prompt(
        &self,
        prompt: &str,
        tools: &[&dyn Tool],
        settings: &ExecutionSettings,
    ) -> Result<Option<String>, LlmError>;
}

/// Construct the Azure OpenAI host from config. Missing credentials are a hard error.
pub fn llm_host_from_config(config: &Config) -> anyhow::Result<Arc<dyn LlmHost>> {
    let settings = config.llm_settings()?;
    Ok(Arc::new(AzureOpenAiHost::new(&settings)?))
}
