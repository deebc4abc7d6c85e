use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use crate::{
    config::Config,
    llm::{ExecutionSettings, LlmHost, llm_host_from_config},
    model::QueryResponse,
    provider::{WeatherService, weather_service_from_config},
    tool::{CurrentWeatherTool, Tool},
};

pub const SYSTEM_PROMPT: &str = "\
You are a helpful weather assistant. You can help users get current weather information for any city.
When a user asks about weather, extract the city name and use the available weather functions to get current weather data.
Then provide a natural, conversational response that includes the weather information.

If the user asks about weather forecasts or future weather, explain that you currently only have access to current weather data.
Always be helpful and provide the most relevant information available.

Available functions:
- GetCurrentWeather: Gets current weather for a specified city";

/// Answer used when the model returns no text.
pub const NO_ANSWER_TEXT: &str = "I'm sorry, I couldn't process your weather query.";

/// Answer used when the LLM host fails.
pub const ERROR_TEXT: &str =
    "I'm sorry, I encountered an error while processing your weather query. Please try again.";

/// Turns a natural-language query into a [`QueryResponse`]. Never fails.
#[async_trait]
pub trait QueryProcessor: Send + Sync {
    async fn process(&self, query: &str) -> QueryResponse;
}

pub fn build_prompt(query: &str) -> String {
    format!("{SYSTEM_PROMPT}\n\nUser: {query}\nAssistant:")
}

pub struct WeatherAgent {
    llm: Arc<dyn LlmHost>,
    weather: Arc<dyn WeatherService>,
    settings: ExecutionSettings,
}

impl WeatherAgent {
    pub fn new(
        llm: Arc<dyn LlmHost>,
        weather: Arc<dyn WeatherService>,
        settings: ExecutionSettings,
    ) -> Self {
        Self {
            llm,
            weather,
            settings,
        }
    }

    /// Build the provider client and LLM host, failing if either lacks credentials.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let weather = weather_service_from_config(config)?;
        let llm_settings = config.llm_settings()?;
        let llm = llm_host_from_config(config)?;
        Ok(Self::new(llm, weather, ExecutionSettings::from(&llm_settings)))
    }
}

#[async_trait]
impl QueryProcessor for WeatherAgent {
    async fn process(&self, query: &str) -> QueryResponse {
        info!(target: "agent", query = %query, "Processing weather query");

        let tool = CurrentWeatherTool::new(self.weather.clone());
        let tools: [&dyn Tool; 1] = [&tool];
        let prompt = build_prompt(query);

        match self.llm.invoke_prompt(&prompt, &tools, &self.settings).await {
            Ok(text) => {
                let text = text
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or_else(|| NO_ANSWER_TEXT.to_string());
                info!(target: "agent", "AI response generated successfully");
                QueryResponse::success(text, tool.take_record())
            }
            Err(err) => {
                error!(target: "agent", query = %query, error = %err, "Error processing weather query");
                QueryResponse::failure(ERROR_TEXT, err.to_string())
            }
        }
    }
}
