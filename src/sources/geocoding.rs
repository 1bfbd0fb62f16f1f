// src/sources/geocoding.rs
//! Free-text location -> coordinates (OpenWeather direct geocoding).

use serde::Deserialize;
use serde_json::Value;

use crate::config::WeatherConfig;
use crate::error::{FetchError, FetchResult};
use crate::http::{HttpFetch, Request};
use crate::sources::{decode, OPENWEATHER_BASE};

#[derive(Debug, Clone, PartialEq)]
pub struct GeoLocation {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Deserialize)]
struct GeoHit {
    name: String,
    lat: f64,
    lon: f64,
    #[serde(default)]
    country: String,
}

pub async fn resolve(http: &dyn HttpFetch, cfg: &WeatherConfig) -> FetchResult<GeoLocation> {
    if !cfg.enabled || cfg.api_key.trim().is_empty() {
        return Err(FetchError::unconfigured("weather api key"));
    }
    let req = Request::get(format!("{OPENWEATHER_BASE}/geo/1.0/direct"))
        .query("q", &cfg.location)
        .query("limit", 1)
        .query("appid", &cfg.api_key);
    let body = http.get_json(&req).await?;
    parse_geocoding(body)
}

pub fn parse_geocoding(body: Value) -> FetchResult<GeoLocation> {
    let hits: Vec<GeoHit> = decode("geocoding", body)?;
    let hit = hits
        .into_iter()
        .next()
        .ok_or_else(|| FetchError::invalid("geocoding: no match for location"))?;
    let name = if hit.country.is_empty() {
        hit.name
    } else {
        format!("{}, {}", hit.name, hit.country)
    };
    Ok(GeoLocation {
        name,
        lat: hit.lat,
        lon: hit.lon,
    })
}
