// src/sources/air_quality.rs
//! Air quality index (OpenWeather air pollution endpoint).

use serde::Deserialize;
use serde_json::Value;

use crate::config::{AirQualityConfig, WeatherConfig};
use crate::error::{FetchError, FetchResult};
use crate::http::{HttpFetch, Request};
use crate::model::AirQualityRecord;
use crate::sources::geocoding::GeoLocation;
use crate::sources::{decode, OPENWEATHER_BASE};

#[derive(Debug, Deserialize)]
struct Pollution {
    list: Vec<PollutionEntry>,
}

#[derive(Debug, Deserialize)]
struct PollutionEntry {
    main: PollutionMain,
}

#[derive(Debug, Deserialize)]
struct PollutionMain {
    aqi: u8,
}

pub async fn fetch(
    http: &dyn HttpFetch,
    cfg: &AirQualityConfig,
    weather: &WeatherConfig,
    geo: &FetchResult<GeoLocation>,
) -> FetchResult<AirQualityRecord> {
    if !cfg.enabled || weather.api_key.trim().is_empty() {
        return Err(FetchError::unconfigured("air quality needs the weather api key"));
    }
    let loc = geo.as_ref().map_err(Clone::clone)?;
    let req = Request::get(format!("{OPENWEATHER_BASE}/data/2.5/air_pollution"))
        .query("lat", loc.lat)
        .query("lon", loc.lon)
        .query("appid", &weather.api_key);
    let body = http.get_json(&req).await?;
    parse_air_quality(body)
}

pub fn parse_air_quality(body: Value) -> FetchResult<AirQualityRecord> {
    let p: Pollution = decode("air pollution", body)?;
    let aqi = p
        .list
        .first()
        .map(|e| e.main.aqi)
        .ok_or_else(|| FetchError::invalid("air pollution: empty list"))?;
    let status = category_label(aqi)
        .ok_or_else(|| FetchError::invalid(format!("air pollution: aqi {aqi} out of range")))?;
    Ok(AirQualityRecord {
        aqi,
        aqi_value: aqi as u32 * 50,
        status: status.to_string(),
    })
}

/// Provider's 1..=5 categories.
pub fn category_label(aqi: u8) -> Option<&'static str> {
    match aqi {
        1 => Some("Good"),
        2 => Some("Fair"),
        3 => Some("Moderate"),
        4 => Some("Poor"),
        5 => Some("Very Poor"),
        _ => None,
    }
}

/// US EPA style label for a 0..=500 value.
pub fn epa_status(value: u32) -> &'static str {
    match value {
        0..=50 => "Good",
        51..=100 => "Moderate",
        101..=150 => "Unhealthy for Sensitive Groups",
        _ => "Unhealthy",
    }
}
