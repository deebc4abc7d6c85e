use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{info, warn};

use crate::{config::WeatherSettings, model::WeatherRecord, util::truncate_body};

use super::{
    WeatherService, location_query,
    mapper::{OwCurrentResponse, to_weather_record},
};

/// Internal failure of a single provider round trip. Never leaves this module.
#[derive(Debug, Error)]
enum ProviderError {
    #[error("request to OpenWeatherMap failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("OpenWeatherMap returned status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("failed to parse OpenWeatherMap JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherClient {
    pub fn new(settings: WeatherSettings) -> anyhow::Result<Self> {
        let http = Client::builder()
            .build()
            .context("Failed to build HTTP client for OpenWeatherMap")?;

        Ok(Self {
            api_key: settings.api_key,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    async fn fetch_current(&self, query: &str) -> Result<OwCurrentResponse, ProviderError> {
        let url = format!("{}/weather", self.base_url);

        let res = self
            .http
            .get(&url)
            .query(&[
                ("q", query),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(ProviderError::Status {
                status,
                body: truncate_body(&body),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl WeatherService for OpenWeatherClient {
    async fn current_weather(
        &self,
        city: &str,
        country_code: Option<&str>,
    ) -> Option<WeatherRecord> {
        let query = location_query(city, country_code);
        info!(target: "openweather", query = %query, "Fetching current weather");

        match self.fetch_current(&query).await {
            Ok(payload) => Some(to_weather_record(&payload)),
            Err(err @ ProviderError::Status { .. }) => {
                warn!(target: "openweather", query = %query, error = %err, "Weather lookup rejected");
                None
            }
            Err(err) => {
                warn!(target: "openweather", query = %query, error = %err, "Weather lookup failed");
                None
            }
        }
    }

    async fn weather_forecast(
        &self,
        city: &str,
        country_code: Option<&str>,
    ) -> Option<WeatherRecord> {
        info!(
            target: "openweather",
            city = %city,
            "Forecast lookup requested; answering with current weather"
        );
        self.current_weather(city, country_code).await
    }
}
