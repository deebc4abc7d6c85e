use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

pub const DEFAULT_WEATHER_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
pub const DEFAULT_DEPLOYMENT: &str = "gpt-4";
pub const DEFAULT_API_VERSION: &str = "2024-02-01";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 500;
pub const DEFAULT_ADDR: &str = "127.0.0.1:5000";

/// Overrides the location of the config file.
pub const CONFIG_PATH_ENV: &str = "WEATHER_AGENT_CONFIG";

/// `[weather]` table: OpenWeatherMap credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeatherConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

/// `[llm]` table: Azure OpenAI deployment and generation knobs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub deployment: Option<String>,
    pub api_version: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    pub addr: Option<String>,
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// [weather]
/// api_key = "..."
///
/// [llm]
/// endpoint = "https://my-resource.openai.azure.com"
/// api_key = "..."
/// deployment = "gpt-4"
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Fully resolved OpenWeatherMap settings.
#[derive(Debug, Clone)]
pub struct WeatherSettings {
    pub api_key: String,
    pub base_url: String,
}

/// Fully resolved LLM host settings.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub endpoint: String,
    pub api_key: String,
    pub deployment: String,
    pub api_version: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Config {
    /// Load the config file and apply environment overrides on top.
    pub fn resolve() -> Result<Self> {
        let mut cfg = Self::load()?;
        cfg.apply_env();
        Ok(cfg)
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(path)
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
            return Ok(PathBuf::from(path));
        }

        let dirs = ProjectDirs::from("dev", "weather-agent", "weather-agent")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Overlay values from `lookup` (normally the process environment).
    /// Empty values are ignored; unparsable numbers keep the file value.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("OPENWEATHERMAP_API_KEY") {
            self.weather.api_key = Some(v);
        }
        if let Some(v) = get("OPENWEATHERMAP_BASE_URL") {
            self.weather.base_url = Some(v);
        }
        if let Some(v) = get("AZURE_OPENAI_ENDPOINT") {
            self.llm.endpoint = Some(v);
        }
        if let Some(v) = get("AZURE_OPENAI_API_KEY") {
            self.llm.api_key = Some(v);
        }
        if let Some(v) = get("AZURE_OPENAI_DEPLOYMENT_NAME") {
            self.llm.deployment = Some(v);
        }
        if let Some(v) = get("AZURE_OPENAI_API_VERSION") {
            self.llm.api_version = Some(v);
        }
        if let Some(v) = get("AZURE_OPENAI_TEMPERATURE").and_then(|v| v.parse().ok()) {
            self.llm.temperature = Some(v);
        }
        if let Some(v) = get("AZURE_OPENAI_MAX_TOKENS").and_then(|v| v.parse().ok()) {
            self.llm.max_tokens = Some(v);
        }
        if let Some(v) = get("WEATHER_AGENT_ADDR") {
            self.server.addr = Some(v);
        }
    }

    pub fn weather_settings(&self) -> Result<WeatherSettings> {
        let api_key = non_empty(&self.weather.api_key).ok_or_else(|| {
            anyhow!(
                "No OpenWeatherMap API key configured.\n\
                 Hint: set OPENWEATHERMAP_API_KEY or run `weather-agent configure weather`."
            )
        })?;

        Ok(WeatherSettings {
            api_key: api_key.to_string(),
            base_url: non_empty(&self.weather.base_url)
                .unwrap_or(DEFAULT_WEATHER_BASE_URL)
                .to_string(),
        })
    }

    pub fn llm_settings(&self) -> Result<LlmSettings> {
        let endpoint = non_empty(&self.llm.endpoint);
        let api_key = non_empty(&self.llm.api_key);

        let (Some(endpoint), Some(api_key)) = (endpoint, api_key) else {
            return Err(anyhow!(
                "Azure OpenAI configuration is required. Please set:\n\
                 - AZURE_OPENAI_ENDPOINT: your Azure OpenAI resource endpoint\n\
                 - AZURE_OPENAI_API_KEY: your Azure OpenAI API key\n\
                 - AZURE_OPENAI_DEPLOYMENT_NAME: your deployment name (optional, defaults to '{DEFAULT_DEPLOYMENT}')\n\
                 Hint: or run `weather-agent configure llm`."
            ));
        };

        Ok(LlmSettings {
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            deployment: non_empty(&self.llm.deployment)
                .unwrap_or(DEFAULT_DEPLOYMENT)
                .to_string(),
            api_version: non_empty(&self.llm.api_version)
                .unwrap_or(DEFAULT_API_VERSION)
                .to_string(),
            temperature: self.llm.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: self.llm.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        })
    }

    pub fn server_addr(&self) -> &str {
        non_empty(&self.server.addr).unwrap_or(DEFAULT_ADDR)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
