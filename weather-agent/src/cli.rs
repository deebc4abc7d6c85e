use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use inquire::{Password, PasswordDisplayMode, Text};
use weather_agent_core::{
    Config, QueryProcessor, QueryRequest, WeatherAgent,
    config::{DEFAULT_DEPLOYMENT, DEFAULT_WEATHER_BASE_URL},
};

use crate::server;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-agent", version, about = "AI-powered weather assistant")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the HTTP API.
    Serve {
        /// Address to listen on, e.g. "0.0.0.0:8080". Overrides the config file.
        #[arg(long)]
        addr: Option<String>,
    },

    /// Answer a single weather question and print the reply.
    Ask {
        /// Natural-language question, e.g. "What's the weather in Tokyo?".
        query: String,
    },

    /// Configure credentials for one collaborator.
    Configure {
        #[arg(value_enum)]
        section: Section,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Section {
    /// OpenWeatherMap API key and base URL.
    Weather,
    /// Azure OpenAI endpoint, key and deployment.
    Llm,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Serve { addr } => {
                let config = Config::resolve()?;
                let agent = WeatherAgent::from_config(&config)?;
                let addr = addr.unwrap_or_else(|| config.server_addr().to_string());
                server::serve(&addr, Arc::new(agent)).await?;
            }
            Command::Ask { query } => {
                let request = QueryRequest { query: Some(query) };
                let Some(query) = request.non_blank_query() else {
                    bail!("Query cannot be empty");
                };

                let config = Config::resolve()?;
                let agent = WeatherAgent::from_config(&config)?;
                let response = agent.process(query).await;

                println!("{}", response.response_text);
                if !response.success {
                    bail!(
                        "Weather query failed: {}",
                        response.error_message.unwrap_or_default()
                    );
                }
            }
            Command::Configure { section } => {
                let mut config = Config::load()?;
                match section {
                    Section::Weather => configure_weather(&mut config)?,
                    Section::Llm => configure_llm(&mut config)?,
                }
                let path = config.save()?;
                println!("Configuration saved to {}", path.display());
            }
        }

        Ok(())
    }
}

fn configure_weather(config: &mut Config) -> anyhow::Result<()> {
    let api_key = prompt_secret("OpenWeatherMap API key:")?;
    let base_url = Text::new("OpenWeatherMap base URL:")
        .with_default(
            config
                .weather
                .base_url
                .as_deref()
                .unwrap_or(DEFAULT_WEATHER_BASE_URL),
        )
        .prompt()
        .context("Failed to read base URL")?;

    config.weather.api_key = Some(api_key);
    config.weather.base_url = Some(base_url);
    Ok(())
}

fn configure_llm(config: &mut Config) -> anyhow::Result<()> {
    let mut endpoint = Text::new("Azure OpenAI endpoint:")
        .with_placeholder("https://<resource>.openai.azure.com");
    if let Some(current) = config.llm.endpoint.as_deref() {
        endpoint = endpoint.with_default(current);
    }
    let endpoint = endpoint.prompt().context("Failed to read endpoint")?;

    let api_key = prompt_secret("Azure OpenAI API key:")?;

    let deployment = Text::new("Deployment name:")
        .with_default(config.llm.deployment.as_deref().unwrap_or(DEFAULT_DEPLOYMENT))
        .prompt()
        .context("Failed to read deployment name")?;

    config.llm.endpoint = Some(endpoint);
    config.llm.api_key = Some(api_key);
    config.llm.deployment = Some(deployment);
    Ok(())
}

fn prompt_secret(message: &str) -> anyhow::Result<String> {
    let value = Password::new(message)
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read secret")?;

    if value.trim().is_empty() {
        bail!("Value cannot be empty");
    }
    Ok(value.trim().to_string())
}
