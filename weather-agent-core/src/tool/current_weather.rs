use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::{model::WeatherRecord, provider::WeatherService};

use super::{Tool, ToolError, ToolResult};

pub const TOOL_NAME: &str = "GetCurrentWeather";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Arguments {
    city_name: String,
    #[serde(default)]
    country_code: Option<String>,
}

/// `GetCurrentWeather(cityName, countryCode?)`.
///
/// Scoped to one query: it remembers the last record it fetched successfully
/// so the caller can return it alongside the model's answer.
#[derive(Debug)]
pub struct CurrentWeatherTool {
    weather: Arc<dyn WeatherService>,
    last_record: Mutex<Option<WeatherRecord>>,
}

impl CurrentWeatherTool {
    pub fn new(weather: Arc<dyn WeatherService>) -> Self {
        Self {
            weather,
            last_record: Mutex::new(None),
        }
    }

    /// Look up `city` and render the answer the model sees.
    pub async fn get_current_weather(&self, city: &str, country_code: Option<&str>) -> String {
        match self.weather.current_weather(city, country_code).await {
            Some(record) => {
                let text = render_weather(&record);
                *self.last_record.lock() = Some(record);
                text
            }
            None => render_not_found(city),
        }
    }

    pub fn take_record(&self) -> Option<WeatherRecord> {
        self.last_record.lock().take()
    }
}

#[async_trait]
impl Tool for CurrentWeatherTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Gets the current weather for a specified city"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "cityName": {
                    "type": "string",
                    "description": "The name of the city"
                },
                "countryCode": {
                    "type": "string",
                    "description": "Optional country code (e.g., US, JP, GB)"
                }
            },
            "required": ["cityName"]
        })
    }

    async fn call(&self, arguments: Value) -> ToolResult<String> {
        let args: Arguments = serde_json::from_value(arguments)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

        debug!(
            target: "weather_tool",
            city = %args.city_name,
            country = ?args.country_code,
            "GetCurrentWeather invoked"
        );

        Ok(self
            .get_current_weather(&args.city_name, args.country_code.as_deref())
            .await)
    }
}

pub fn render_weather(record: &WeatherRecord) -> String {
    format!(
        "The current weather in {}, {} is {} with a temperature of {:.1}°C (feels like {:.1}°C). \
         Humidity is {}%, wind speed is {:.1} m/s, and atmospheric pressure is {} hPa.",
        record.city,
        record.country,
        record.description,
        record.temperature_c,
        record.feels_like_c,
        record.humidity_pct,
        record.wind_speed_ms,
        record.pressure_hpa,
    )
}

pub fn render_not_found(city: &str) -> String {
    format!("I couldn't find weather information for {city}. Please check the city name and try again.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn tokyo() -> WeatherRecord {
        WeatherRecord {
            city: "Tokyo".into(),
            country: "JP".into(),
            temperature_c: 21.456,
            feels_like_c: 20.1,
            description: "clear sky".into(),
            humidity_pct: 40,
            wind_speed_ms: 3.26,
            pressure_hpa: 1013,
            observed_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    #[derive(Debug, Default)]
    struct FakeWeather {
        record: Option<WeatherRecord>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl WeatherService for FakeWeather {
        async fn current_weather(&self, _city: &str, _cc: Option<&str>) -> Option<WeatherRecord> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.record.clone()
        }

        async fn weather_forecast(&self, city: &str, cc: Option<&str>) -> Option<WeatherRecord> {
            self.current_weather(city, cc).await
        }
    }

    #[test]
    fn renders_every_field() {
        let text = render_weather(&tokyo());

        for needle in [
            "Tokyo, JP",
            "clear sky",
            "21.5°C",
            "20.1°C",
            "40%",
            "3.3 m/s",
            "1013 hPa",
        ] {
            assert!(text.contains(needle), "missing {needle:?} in {text:?}");
        }
    }

    #[test]
    fn renders_not_found_sentence() {
        assert_eq!(
            render_not_found("Atlantis"),
            "I couldn't find weather information for Atlantis. Please check the city name and try again."
        );
    }

    #[tokio::test]
    async fn not_found_lookup_renders_sentence_and_keeps_no_record() {
        let weather = Arc::new(FakeWeather::default());
        let tool = CurrentWeatherTool::new(weather.clone());

        let out = tool.call(json!({"cityName": "Atlantis"})).await.unwrap();

        assert_eq!(out, render_not_found("Atlantis"));
        assert_eq!(weather.calls.load(Ordering::SeqCst), 1);
        assert!(tool.take_record().is_none());
    }

    #[tokio::test]
    async fn successful_lookup_is_remembered() {
        let weather = Arc::new(FakeWeather {
            record: Some(tokyo()),
            ..Default::default()
        });
        let tool = CurrentWeatherTool::new(weather);

        let out = tool
            .call(json!({"cityName": "Tokyo", "countryCode": "JP"}))
            .await
            .unwrap();

        assert!(out.starts_with("The current weather in Tokyo, JP"));
        assert_eq!(tool.take_record(), Some(tokyo()));
        assert!(tool.take_record().is_none());
    }

    #[tokio::test]
    async fn missing_city_is_invalid() {
        let tool = CurrentWeatherTool::new(Arc::new(FakeWeather::default()));

        let err = tool.call(json!({"countryCode": "JP"})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
