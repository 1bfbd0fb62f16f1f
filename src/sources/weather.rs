// src/sources/weather.rs
//! Current conditions (OpenWeather).
//!
//! Primary variant: One Call by coordinates (includes UV and alerts).
//! Fallback variant: the plain "current weather" endpoint by location name.
//! Both are normalized into the same [`WeatherRecord`].

use chrono::{DateTime, Datelike, FixedOffset, Local, Timelike};
use serde::Deserialize;
use serde_json::Value;

use crate::config::{Units, WeatherConfig};
use crate::error::{FetchError, FetchResult};
use crate::http::{HttpFetch, Request};
use crate::model::{WeatherAlert, WeatherRecord};
use crate::sources::geocoding::GeoLocation;
use crate::sources::{decode, OPENWEATHER_BASE};
use crate::text::{round1, title_case};

#[derive(Debug, Deserialize)]
struct Condition {
    #[serde(default)]
    description: String,
    #[serde(default)]
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OneCall {
    #[serde(default)]
    timezone_offset: i32,
    current: OneCallCurrent,
    #[serde(default)]
    alerts: Vec<OneCallAlert>,
}

#[derive(Debug, Deserialize)]
struct OneCallCurrent {
    temp: f64,
    #[serde(default)]
    feels_like: Option<f64>,
    humidity: f64,
    #[serde(default)]
    wind_speed: f64,
    #[serde(default)]
    sunrise: Option<i64>,
    #[serde(default)]
    sunset: Option<i64>,
    #[serde(default)]
    uvi: Option<f64>,
    weather: Vec<Condition>,
}

#[derive(Debug, Deserialize)]
struct OneCallAlert {
    #[serde(default)]
    sender_name: String,
    #[serde(default)]
    event: String,
    #[serde(default)]
    start: Option<i64>,
    #[serde(default)]
    end: Option<i64>,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct Current {
    #[serde(default)]
    name: String,
    #[serde(default)]
    timezone: i32,
    main: CurrentMain,
    #[serde(default)]
    wind: CurrentWind,
    #[serde(default)]
    sys: CurrentSys,
    weather: Vec<Condition>,
}

#[derive(Debug, Deserialize)]
struct CurrentMain {
    temp: f64,
    #[serde(default)]
    feels_like: Option<f64>,
    humidity: f64,
}

#[derive(Debug, Default, Deserialize)]
struct CurrentWind {
    #[serde(default)]
    speed: f64,
}

#[derive(Debug, Default, Deserialize)]
struct CurrentSys {
    #[serde(default)]
    sunrise: Option<i64>,
    #[serde(default)]
    sunset: Option<i64>,
}

/// Fetch and normalize current conditions, trying the simpler endpoint when
/// the primary one fails.
pub async fn fetch(
    http: &dyn HttpFetch,
    cfg: &WeatherConfig,
    geo: &FetchResult<GeoLocation>,
    now: DateTime<Local>,
) -> FetchResult<WeatherRecord> {
    if !cfg.enabled || cfg.api_key.trim().is_empty() {
        return Err(FetchError::unconfigured("weather api key"));
    }

    let primary = match geo {
        Ok(loc) => fetch_one_call(http, cfg, loc, now).await,
        Err(e) => Err(e.clone()),
    };
    match primary {
        Ok(rec) => Ok(rec),
        Err(e) => {
            tracing::warn!(
                error = %e,
                source = "weather",
                stage = "one_call",
                "primary weather endpoint failed, trying current weather"
            );
            let req = Request::get(format!("{OPENWEATHER_BASE}/data/2.5/weather"))
                .query("q", &cfg.location)
                .query("appid", &cfg.api_key)
                .query("units", cfg.units.as_param());
            let body = http.get_json(&req).await?;
            parse_current(body, cfg.units, now)
        }
    }
}

async fn fetch_one_call(
    http: &dyn HttpFetch,
    cfg: &WeatherConfig,
    loc: &GeoLocation,
    now: DateTime<Local>,
) -> FetchResult<WeatherRecord> {
    let req = Request::get(format!("{OPENWEATHER_BASE}/data/3.0/onecall"))
        .query("lat", loc.lat)
        .query("lon", loc.lon)
        .query("exclude", "minutely,hourly,daily")
        .query("appid", &cfg.api_key)
        .query("units", cfg.units.as_param());
    let body = http.get_json(&req).await?;
    parse_one_call(body, &loc.name, cfg.units, now)
}

pub fn parse_one_call(
    body: Value,
    location: &str,
    units: Units,
    now: DateTime<Local>,
) -> FetchResult<WeatherRecord> {
    let oc: OneCall = decode("one call", body)?;
    let cond = oc
        .current
        .weather
        .first()
        .ok_or_else(|| FetchError::invalid("one call: empty weather list"))?;
    let c = &oc.current;
    let uv_index = match c.uvi {
        Some(uvi) => clamp_uv(uvi.round()),
        None => estimate_uv_index(now.month(), now.hour()),
    };
    let alerts = oc
        .alerts
        .iter()
        .map(|a| WeatherAlert {
            event: a.event.clone(),
            description: a.description.trim().to_string(),
            sender: a.sender_name.clone(),
            start: a
                .start
                .map(|t| format_local_time(t, oc.timezone_offset, "%a %H:%M"))
                .unwrap_or_default(),
            end: a
                .end
                .map(|t| format_local_time(t, oc.timezone_offset, "%a %H:%M"))
                .unwrap_or_default(),
        })
        .collect();

    Ok(WeatherRecord {
        location: location.to_string(),
        temp: c.temp.round() as i64,
        feels_like: c.feels_like.unwrap_or(c.temp).round() as i64,
        temp_unit: units.temp_unit().to_string(),
        humidity: c.humidity.round() as i64,
        wind_speed: convert_wind_speed(c.wind_speed, units),
        wind_unit: units.wind_unit().to_string(),
        description: title_case(&cond.description),
        icon: cond.icon.clone(),
        sunrise: c
            .sunrise
            .map(|t| format_local_time(t, oc.timezone_offset, "%H:%M"))
            .unwrap_or_default(),
        sunset: c
            .sunset
            .map(|t| format_local_time(t, oc.timezone_offset, "%H:%M"))
            .unwrap_or_default(),
        utc_offset: Some(oc.timezone_offset),
        uv_index,
        alerts,
    })
}

pub fn parse_current(body: Value, units: Units, now: DateTime<Local>) -> FetchResult<WeatherRecord> {
    let cur: Current = decode("current weather", body)?;
    let cond = cur
        .weather
        .first()
        .ok_or_else(|| FetchError::invalid("current weather: empty weather list"))?;
    Ok(WeatherRecord {
        location: cur.name.clone(),
        temp: cur.main.temp.round() as i64,
        feels_like: cur.main.feels_like.unwrap_or(cur.main.temp).round() as i64,
        temp_unit: units.temp_unit().to_string(),
        humidity: cur.main.humidity.round() as i64,
        wind_speed: convert_wind_speed(cur.wind.speed, units),
        wind_unit: units.wind_unit().to_string(),
        description: title_case(&cond.description),
        icon: cond.icon.clone(),
        sunrise: cur
            .sys
            .sunrise
            .map(|t| format_local_time(t, cur.timezone, "%H:%M"))
            .unwrap_or_default(),
        sunset: cur
            .sys
            .sunset
            .map(|t| format_local_time(t, cur.timezone, "%H:%M"))
            .unwrap_or_default(),
        utc_offset: Some(cur.timezone),
        uv_index: estimate_uv_index(now.month(), now.hour()),
        alerts: Vec::new(),
    })
}

/// Imperial speeds arrive in mph and are kept; metric arrive in m/s and are
/// converted to km/h. Both rounded to one decimal.
pub fn convert_wind_speed(speed: f64, units: Units) -> f64 {
    match units {
        Units::Imperial => round1(speed),
        Units::Metric => round1(speed * 3.6),
    }
}

/// Epoch seconds rendered in the location's UTC offset.
pub fn format_local_time(epoch: i64, offset_secs: i32, fmt: &str) -> String {
    FixedOffset::east_opt(offset_secs)
        .or_else(|| FixedOffset::east_opt(0))
        .zip(DateTime::from_timestamp(epoch, 0))
        .map(|(offset, dt)| dt.with_timezone(&offset).format(fmt).to_string())
        .unwrap_or_default()
}

// Hourly share of the daily peak, index = hour of day.
const UV_HOUR_FACTOR: [f64; 24] = [
    0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, // 00-06
    0.1, 0.25, 0.45, 0.7, 0.9, 1.0, 1.0, // 07-13
    0.9, 0.7, 0.45, 0.25, 0.1, // 14-18
    0.0, 0.0, 0.0, 0.0, 0.0, // 19-23
];

/// Deterministic UV estimate when the provider has none: a seasonal peak
/// value scaled by time of day.
pub fn estimate_uv_index(month: u32, hour: u32) -> u8 {
    let peak = match month {
        5..=8 => 8.0,
        3 | 4 | 9 | 10 => 5.0,
        _ => 2.0,
    };
    let factor = UV_HOUR_FACTOR.get(hour as usize).copied().unwrap_or(0.0);
    clamp_uv((peak * factor).round())
}

fn clamp_uv(v: f64) -> u8 {
    v.clamp(0.0, 11.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn noon() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 7, 2, 12, 0, 0).unwrap()
    }

    #[test]
    fn wind_conversion_per_unit_system() {
        assert_eq!(convert_wind_speed(3.5, Units::Metric), 12.6);
        assert_eq!(convert_wind_speed(3.5, Units::Imperial), 3.5);
        assert_eq!(convert_wind_speed(10.04, Units::Imperial), 10.0);
        for tenth in 0..500 {
            let s = tenth as f64 / 10.0;
            assert_eq!(convert_wind_speed(s, Units::Metric), round1(s * 3.6));
            assert_eq!(convert_wind_speed(s, Units::Imperial), round1(s));
        }
    }

    #[test]
    fn uv_estimate_stays_in_range() {
        for month in 1..=12 {
            for hour in 0..24 {
                let uv = estimate_uv_index(month, hour);
                assert!(uv <= 11, "month {month} hour {hour} -> {uv}");
            }
        }
        assert_eq!(estimate_uv_index(7, 12), 8);
        assert_eq!(estimate_uv_index(1, 12), 2);
        assert_eq!(estimate_uv_index(7, 2), 0);
        // out of table hours are treated as night
        assert_eq!(estimate_uv_index(7, 30), 0);
    }

    #[test]
    fn one_call_normalizes_fields() {
        let body = json!({
            "timezone_offset": 3600,
            "current": {
                "temp": 21.6, "feels_like": 21.2, "humidity": 65,
                "wind_speed": 3.5, "uvi": 6.4,
                "sunrise": 1751427000, "sunset": 1751486400,
                "weather": [{"description": "light rain", "icon": "10d"}]
            },
            "alerts": [{
                "sender_name": "Met Office", "event": "Yellow rain warning",
                "start": 1751450400, "end": 1751472000, "description": " Heavy showers "
            }]
        });
        let rec = parse_one_call(body, "London, GB", Units::Metric, noon()).unwrap();
        assert_eq!(rec.temp, 22);
        assert_eq!(rec.feels_like, 21);
        assert_eq!(rec.wind_speed, 12.6);
        assert_eq!(rec.wind_unit, "km/h");
        assert_eq!(rec.description, "Light Rain");
        assert_eq!(rec.uv_index, 6);
        assert_eq!(rec.sunrise, format_local_time(1751427000, 3600, "%H:%M"));
        assert_eq!(rec.alerts.len(), 1);
        assert_eq!(rec.alerts[0].description, "Heavy showers");
    }

    #[test]
    fn one_call_without_weather_entry_is_invalid() {
        let body = json!({"current": {"temp": 1.0, "humidity": 5, "weather": []}});
        let err = parse_one_call(body, "x", Units::Metric, noon()).unwrap_err();
        assert_eq!(err.kind(), "invalid_response");
    }

    #[test]
    fn current_variant_estimates_uv() {
        let body = json!({
            "name": "Leeds", "timezone": 0,
            "main": {"temp": 295.15, "humidity": 40},
            "wind": {"speed": 2.0},
            "sys": {"sunrise": 1751427000, "sunset": 1751486400},
            "weather": [{"description": "clear sky", "icon": "01d"}]
        });
        let rec = parse_current(body, Units::Imperial, noon()).unwrap();
        assert_eq!(rec.temp, 295);
        assert_eq!(rec.feels_like, 295);
        assert_eq!(rec.wind_speed, 2.0);
        assert_eq!(rec.wind_unit, "mph");
        assert_eq!(rec.uv_index, estimate_uv_index(7, 12));
        assert!(rec.alerts.is_empty());
    }

    #[test]
    fn local_time_uses_payload_offset() {
        // 2025-01-01T00:00:00Z
        assert_eq!(format_local_time(1735689600, 0, "%H:%M"), "00:00");
        assert_eq!(format_local_time(1735689600, 5 * 3600 + 1800, "%H:%M"), "05:30");
        assert_eq!(format_local_time(1735689600, -3600, "%H:%M"), "23:00");
    }
}
