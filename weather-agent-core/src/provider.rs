use crate::{Config, WeatherRecord, provider::openweather::OpenWeatherClient};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

pub mod mapper;
pub mod openweather;

/// Weather lookups by city name.
///
/// Implementations absorb every provider fault: a failed lookup of any kind
/// is reported as `None` ("not found") and logged, never returned as an error.
#[async_trait]
pub trait WeatherService: Send + Sync + Debug {
    async fn current_weather(&self, city: &str, country_code: Option<&str>)
    -> Option<WeatherRecord>;

    /// Forecast lookup. Currently answers with the current observation.
    async fn weather_forecast(
        &self,
        city: &str,
        country_code: Option<&str>,
    ) -> Option<WeatherRecord>;
}

/// Construct the OpenWeatherMap-backed service from config.
pub fn weather_service_from_config(config: &Config) -> anyhow::Result<Arc<dyn WeatherService>> {
    let settings = config.weather_settings()?;
    let client = OpenWeatherClient::new(settings)?;
    Ok(Arc::new(client))
}

/// Location string sent to the provider: `city` or `city,CC`.
pub(crate) fn location_query(city: &str, country_code: Option<&str>) -> String {
    match country_code.map(str::trim).filter(|cc| !cc.is_empty()) {
        Some(cc) => format!("{city},{cc}"),
        None => city.to_string(),
    }
}
