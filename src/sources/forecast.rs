// src/sources/forecast.rs
//! Five-day outlook from the 3-hourly OpenWeather forecast series.

use chrono::{DateTime, FixedOffset, Local};
use serde::Deserialize;
use serde_json::Value;

use crate::config::WeatherConfig;
use crate::error::{FetchError, FetchResult};
use crate::http::{HttpFetch, Request};
use crate::model::{ForecastDay, ForecastRecord};
use crate::sources::geocoding::GeoLocation;
use crate::sources::{decode, OPENWEATHER_BASE};
use crate::text::title_case;

pub const FORECAST_DAYS: usize = 5;
/// Minimum width of the bar-chart scale in degrees.
pub const MIN_RANGE_SPAN: i64 = 10;

#[derive(Debug, Deserialize)]
struct Series {
    list: Vec<Entry>,
    #[serde(default)]
    city: City,
}

#[derive(Debug, Default, Deserialize)]
struct City {
    #[serde(default)]
    timezone: i32,
}

#[derive(Debug, Deserialize)]
struct Entry {
    dt: i64,
    main: EntryMain,
    #[serde(default)]
    weather: Vec<EntryCondition>,
}

#[derive(Debug, Deserialize)]
struct EntryMain {
    temp: f64,
    #[serde(default)]
    temp_min: Option<f64>,
    #[serde(default)]
    temp_max: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct EntryCondition {
    #[serde(default)]
    description: String,
    #[serde(default)]
    icon: String,
}

pub async fn fetch(
    http: &dyn HttpFetch,
    cfg: &WeatherConfig,
    geo: &FetchResult<GeoLocation>,
    now: DateTime<Local>,
) -> FetchResult<ForecastRecord> {
    if !cfg.enabled || cfg.api_key.trim().is_empty() {
        return Err(FetchError::unconfigured("weather api key"));
    }
    let mut req = Request::get(format!("{OPENWEATHER_BASE}/data/2.5/forecast"));
    req = match geo {
        Ok(loc) => req.query("lat", loc.lat).query("lon", loc.lon),
        Err(_) => req.query("q", &cfg.location),
    };
    let req = req
        .query("appid", &cfg.api_key)
        .query("units", cfg.units.as_param());
    let body = http.get_json(&req).await?;
    parse_forecast(body, now)
}

/// Group the series by local day, keep running max/min per day and the
/// first condition seen, label today `TODAY`, keep the first five days.
pub fn parse_forecast(body: Value, now: DateTime<Local>) -> FetchResult<ForecastRecord> {
    let series: Series = decode("forecast", body)?;
    let offset = FixedOffset::east_opt(series.city.timezone)
        .or_else(|| FixedOffset::east_opt(0))
        .ok_or_else(|| FetchError::invalid("forecast: bad timezone"))?;
    let today_key = now.with_timezone(&offset).format("%Y-%m-%d").to_string();

    // (day key, weekday abbreviation, high, low, icon, description)
    let mut groups: Vec<(String, String, f64, f64, String, String)> = Vec::new();
    for e in &series.list {
        let Some(dt) = DateTime::from_timestamp(e.dt, 0) else {
            continue;
        };
        let local = dt.with_timezone(&offset);
        let key = local.format("%Y-%m-%d").to_string();
        let hi = e.main.temp_max.unwrap_or(e.main.temp);
        let lo = e.main.temp_min.unwrap_or(e.main.temp);

        match groups.iter_mut().find(|g| g.0 == key) {
            Some(g) => {
                g.2 = g.2.max(hi);
                g.3 = g.3.min(lo);
            }
            None => {
                let (icon, desc) = e
                    .weather
                    .first()
                    .map(|c| (c.icon.clone(), title_case(&c.description)))
                    .unwrap_or_default();
                groups.push((key, local.format("%a").to_string(), hi, lo, icon, desc));
            }
        }
    }

    let days: Vec<ForecastDay> = groups
        .into_iter()
        .take(FORECAST_DAYS)
        .map(|(key, weekday, hi, lo, icon, description)| ForecastDay {
            label: if key == today_key {
                "TODAY".to_string()
            } else {
                weekday
            },
            day_key: key,
            high: hi.round() as i64,
            low: lo.round() as i64,
            icon,
            description,
        })
        .collect();

    if days.is_empty() {
        return Err(FetchError::invalid("forecast: empty series"));
    }
    Ok(with_range(days))
}

/// Attach the global high/low across `days`, widened to at least
/// [`MIN_RANGE_SPAN`] by raising the high.
pub fn with_range(days: Vec<ForecastDay>) -> ForecastRecord {
    let low = days.iter().map(|d| d.low).min().unwrap_or(0);
    let mut high = days.iter().map(|d| d.high).max().unwrap_or(low);
    if high - low < MIN_RANGE_SPAN {
        high = low + MIN_RANGE_SPAN;
    }
    ForecastRecord {
        days,
        range_high: high,
        range_low: low,
    }
}
