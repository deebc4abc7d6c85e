//! OpenWeatherMap current-weather payload and its mapping to [`WeatherRecord`].
//!
//! Every sub-object and field is optional; mapping never fails.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::model::WeatherRecord;

const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct OwMain {
    pub temp: f64,
    pub feels_like: f64,
    pub pressure: i32,
    pub humidity: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct OwWeather {
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct OwWind {
    pub speed: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct OwSys {
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct OwCurrentResponse {
    pub name: Option<String>,
    pub dt: Option<i64>,
    pub main: Option<OwMain>,
    pub weather: Option<Vec<OwWeather>>,
    pub wind: Option<OwWind>,
    pub sys: Option<OwSys>,
}

/// Map a provider payload to a record, defaulting absent strings to
/// `"Unknown"` and absent numbers to zero.
///
/// A missing or out-of-range `dt` maps to the Unix epoch so the result stays a
/// pure function of the payload.
pub fn to_weather_record(payload: &OwCurrentResponse) -> WeatherRecord {
    let main = payload.main.clone().unwrap_or_default();

    let description = payload
        .weather
        .as_ref()
        .and_then(|w| w.first())
        .and_then(|w| w.description.clone())
        .unwrap_or_else(|| UNKNOWN.to_string());

    let observed_at = payload
        .dt
        .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

    WeatherRecord {
        city: non_empty_or_unknown(payload.name.as_deref()),
        country: non_empty_or_unknown(payload.sys.as_ref().and_then(|s| s.country.as_deref())),
        temperature_c: main.temp,
        feels_like_c: main.feels_like,
        description,
        humidity_pct: main.humidity.clamp(0, 100) as u8,
        wind_speed_ms: payload.wind.as_ref().map_or(0.0, |w| w.speed.max(0.0)),
        pressure_hpa: main.pressure,
        observed_at,
    }
}

fn non_empty_or_unknown(value: Option<&str>) -> String {
    value
        .filter(|s| !s.is_empty())
        .unwrap_or(UNKNOWN)
        .to_string()
}
