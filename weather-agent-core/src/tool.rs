use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub mod current_weather;

pub use current_weather::CurrentWeatherTool;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
}

pub type ToolResult<T> = Result<T, ToolError>;

/// A function the LLM host may call while generating an answer.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    /// Natural-language description the model uses to decide when to call it.
    fn description(&self) -> &str;

    /// JSON Schema for the arguments object.
    fn parameters(&self) -> Value;

    async fn call(&self, arguments: Value) -> ToolResult<String>;
}

/// Function declaration in the shape chat-completion APIs expect.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolDeclaration {
    pub fn of(tool: &dyn Tool) -> Self {
        Self {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            parameters: tool.parameters(),
        }
    }
}

/// Dispatch a model-issued call to the tool registered under `name`.
pub async fn invoke(tools: &[&dyn Tool], name: &str, arguments: Value) -> ToolResult<String> {
    let tool = tools
        .iter()
        .find(|t| t.name() == name)
        .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
    tool.call(arguments).await
}
