// src/sources/mod.rs
//! Per-source clients and normalizers.
//!
//! Each module turns one provider's raw payload into the records in
//! [`crate::model`]. Network access goes through [`crate::http::HttpFetch`];
//! parsing is split out into plain functions so it can be tested on fixtures.

pub mod air_quality;
pub mod calendar;
pub mod canvas;
pub mod forecast;
pub mod geocoding;
pub mod rss;
pub mod traffic;
pub mod weather;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{FetchError, FetchResult};

pub(crate) const OPENWEATHER_BASE: &str = "https://api.openweathermap.org";

/// Deserialize a provider payload, tagging shape errors with the source stage.
pub(crate) fn decode<T: DeserializeOwned>(what: &str, value: Value) -> FetchResult<T> {
    serde_json::from_value(value).map_err(|e| FetchError::invalid(format!("{what}: {e}")))
}
