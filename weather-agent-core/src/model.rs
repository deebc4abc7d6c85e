use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Provider-independent weather observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub city: String,
    /// Country code, or `"Unknown"` when the provider omitted it.
    pub country: String,
    #[serde(rename = "temperature")]
    pub temperature_c: f64,
    #[serde(rename = "feelsLike")]
    pub feels_like_c: f64,
    pub description: String,
    #[serde(rename = "humidity")]
    pub humidity_pct: u8,
    #[serde(rename = "windSpeed")]
    pub wind_speed_ms: f64,
    #[serde(rename = "pressure")]
    pub pressure_hpa: i32,
    #[serde(rename = "timestamp")]
    pub observed_at: DateTime<Utc>,
}

/// Inbound body of `POST /api/weather/query`.
///
/// `query` is optional on the wire so that a missing field is reported as a
/// blank query rather than as a deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub query: Option<String>,
}

impl QueryRequest {
    /// Returns the query when it contains something other than whitespace.
    pub fn non_blank_query(&self) -> Option<&str> {
        self.query.as_deref().filter(|q| !q.trim().is_empty())
    }
}

/// Envelope returned for every processed query, successful or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    #[serde(rename = "response")]
    pub response_text: String,
    #[serde(rename = "weatherData")]
    pub weather_record: Option<WeatherRecord>,
    pub success: bool,
    pub error_message: Option<String>,
}

impl QueryResponse {
    pub fn success(response_text: String, weather_record: Option<WeatherRecord>) -> Self {
        Self {
            response_text,
            weather_record,
            success: true,
            error_message: None,
        }
    }

    /// A failed envelope always carries an error message.
    pub fn failure(response_text: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            response_text: response_text.into(),
            weather_record: None,
            success: false,
            error_message: Some(error_message.into()),
        }
    }
}
