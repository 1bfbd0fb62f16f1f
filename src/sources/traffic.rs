// src/sources/traffic.rs
//! Travel times from home to named destinations.
//!
//! Live path: Mapbox driving-traffic matrix, memoized for five minutes.
//! Fallback path: travel times synthesized from a fixed route table.

use chrono::{DateTime, Datelike, Duration, Local, Timelike, Weekday};
use serde::Deserialize;
use serde_json::Value;

use crate::config::TrafficConfig;
use crate::error::{FetchError, FetchResult};
use crate::http::{HttpFetch, Request};
use crate::memo::TtlCache;
use crate::model::{TrafficRoute, TrafficStatus};
use crate::sources::decode;

const MATRIX_BASE: &str = "https://api.mapbox.com/directions-matrix/v1/mapbox/driving-traffic";

/// How long a matrix duration is reused.
pub fn memo_ttl() -> Duration {
    Duration::minutes(5)
}

pub type DurationMemo = TtlCache<String, u32>;

#[derive(Debug, Deserialize)]
struct Matrix {
    #[serde(default)]
    code: String,
    #[serde(default)]
    durations: Vec<Vec<Option<f64>>>,
}

/// Query the matrix for every destination not already memoized.
pub async fn fetch(
    http: &dyn HttpFetch,
    cfg: &TrafficConfig,
    memo: &mut DurationMemo,
    now: DateTime<Local>,
) -> FetchResult<Vec<TrafficRoute>> {
    if !cfg.has_matrix() {
        return Err(FetchError::unconfigured("traffic matrix needs token, home and destinations"));
    }
    let Some(home) = cfg.home else {
        return Err(FetchError::unconfigured("traffic home coordinate"));
    };

    let keys: Vec<String> = cfg
        .destinations
        .iter()
        .map(|d| format!("{}|{:.5},{:.5}", d.name, d.lat, d.lon))
        .collect();
    let cached: Vec<Option<u32>> = keys.iter().map(|k| memo.get(k, now)).collect();

    let minutes: Vec<Option<u32>> = if cached.iter().all(Option::is_some) {
        tracing::debug!(source = "traffic", "all durations memoized");
        cached
    } else {
        let coords: Vec<String> = std::iter::once(format!("{},{}", home.lon, home.lat))
            .chain(cfg.destinations.iter().map(|d| format!("{},{}", d.lon, d.lat)))
            .collect();
        let req = Request::get(format!("{MATRIX_BASE}/{}", coords.join(";")))
            .query("sources", 0)
            .query("annotations", "duration")
            .query("access_token", &cfg.access_token);
        let body = http.get_json(&req).await?;
        let fresh = parse_matrix(body, cfg.destinations.len())?;
        for (key, m) in keys.iter().zip(&fresh) {
            if let Some(m) = m {
                memo.insert(key.clone(), *m, now);
            }
        }
        fresh
    };

    let routes: Vec<TrafficRoute> = cfg
        .destinations
        .iter()
        .zip(minutes)
        .filter_map(|(d, m)| {
            let m = m?;
            Some(TrafficRoute::new(d.name.clone(), m, m, classify_minutes(m)))
        })
        .collect();
    if routes.is_empty() {
        return Err(FetchError::invalid("traffic matrix: no routable destination"));
    }
    Ok(routes)
}

/// First row of the matrix (from home) in whole minutes, one slot per
/// destination. Unroutable pairs come back as `None`.
pub fn parse_matrix(body: Value, destinations: usize) -> FetchResult<Vec<Option<u32>>> {
    let m: Matrix = decode("traffic matrix", body)?;
    if m.code != "Ok" {
        return Err(FetchError::invalid(format!("traffic matrix: code {:?}", m.code)));
    }
    let row = m
        .durations
        .first()
        .ok_or_else(|| FetchError::invalid("traffic matrix: no durations"))?;
    if row.len() < destinations + 1 {
        return Err(FetchError::invalid(format!(
            "traffic matrix: expected {} columns, got {}",
            destinations + 1,
            row.len()
        )));
    }
    Ok(row[1..=destinations]
        .iter()
        .map(|secs| secs.map(|s| (s / 60.0).round() as u32))
        .collect())
}

pub fn classify_minutes(minutes: u32) -> TrafficStatus {
    match minutes {
        0..=10 => TrafficStatus::Light,
        11..=20 => TrafficStatus::Moderate,
        21..=30 => TrafficStatus::Heavy,
        _ => TrafficStatus::Severe,
    }
}

// ---------------------------------------------------------------------------
// Synthesized travel times
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoadClass {
    Highway,
    Local,
}

impl RoadClass {
    pub fn factor(self) -> f64 {
        match self {
            RoadClass::Highway => 1.1,
            RoadClass::Local => 0.95,
        }
    }
}

/// (name, free-flow minutes, class)
pub const ROUTES: &[(&str, u32, RoadClass)] = &[
    ("Downtown", 18, RoadClass::Highway),
    ("Airport", 32, RoadClass::Highway),
    ("University", 12, RoadClass::Local),
    ("Shopping Center", 9, RoadClass::Local),
];

fn is_late_night(hour: u32) -> bool {
    hour >= 22 || hour < 5
}

/// Time-of-day multiplier, separate tables for weekdays and weekends.
pub fn time_multiplier(weekday: Weekday, hour: u32) -> f64 {
    let weekend = matches!(weekday, Weekday::Sat | Weekday::Sun);
    if weekend {
        match hour {
            10..=18 => 1.2,
            h if is_late_night(h) => 0.8,
            _ => 1.0,
        }
    } else {
        match hour {
            7..=9 => 1.5,
            16..=18 => 1.6,
            10..=15 => 1.1,
            h if is_late_night(h) => 0.8,
            _ => 1.0,
        }
    }
}

pub fn ratio_status(ratio: f64) -> TrafficStatus {
    if ratio <= 1.1 {
        TrafficStatus::Normal
    } else if ratio <= 1.3 {
        TrafficStatus::Slow
    } else {
        TrafficStatus::Heavy
    }
}

/// Deterministic routes for `now`.
pub fn synthesize_routes(now: DateTime<Local>) -> Vec<TrafficRoute> {
    let mult = time_multiplier(now.weekday(), now.hour());
    ROUTES
        .iter()
        .map(|(name, base, class)| {
            let ratio = mult * class.factor();
            let adjusted = (*base as f64 * ratio).round() as u32;
            TrafficRoute::new(*name, adjusted, *base, ratio_status(ratio))
        })
        .collect()
}
