//! Core library for the weather AI agent.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The OpenWeatherMap client and its payload mapping
//! - The `GetCurrentWeather` tool exposed to the language model
//! - The LLM host abstraction and its Azure OpenAI implementation
//! - The query orchestrator that ties them together
//!
//! It is used by the `weather-agent` binary, but can also be embedded in other services.

pub mod agent;
pub mod config;
pub mod llm;
pub mod model;
pub mod provider;
pub mod tool;

mod util;

pub use agent::{QueryProcessor, WeatherAgent};
pub use config::Config;
pub use llm::{ExecutionSettings, LlmError, LlmHost};
pub use model::{QueryRequest, QueryResponse, WeatherRecord};
pub use provider::WeatherService;
pub use tool::{Tool, ToolError};
