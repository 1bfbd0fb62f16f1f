// src/config.rs
//! Dashboard configuration: one section per source plus display and paths.
//!
//! Loaded once at startup from TOML or JSON, then patched from environment
//! variables. Every section has defaults so a missing file still yields a
//! runnable (all-mock) configuration.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_CONFIG_PATH: &str = "DASHBOARD_CONFIG_PATH";
pub const DEFAULT_TOML_PATH: &str = "config/dashboard.toml";
pub const DEFAULT_JSON_PATH: &str = "config/dashboard.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub weather: WeatherConfig,
    pub air_quality: AirQualityConfig,
    pub calendar: CalendarConfig,
    pub canvas: CanvasConfig,
    pub traffic: TrafficConfig,
    pub rss: RssConfig,
    pub display: DisplayConfig,
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

impl Units {
    /// Value of the provider's `units` query parameter.
    pub fn as_param(self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
        }
    }

    pub fn temp_unit(self) -> &'static str {
        match self {
            Units::Metric => "°C",
            Units::Imperial => "°F",
        }
    }

    pub fn wind_unit(self) -> &'static str {
        match self {
            Units::Metric => "km/h",
            Units::Imperial => "mph",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub enabled: bool,
    /// "ENV" means: read from OPENWEATHER_API_KEY
    pub api_key: String,
    pub location: String,
    pub units: Units,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: String::new(),
            location: "London,UK".to_string(),
            units: Units::Metric,
        }
    }
}

/// Air quality reuses the weather key and location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AirQualityConfig {
    pub enabled: bool,
}

impl Default for AirQualityConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    pub enabled: bool,
    pub token_path: PathBuf,
    pub calendars: Vec<SubCalendar>,
    /// Cap for the flat event list.
    pub max_events: usize,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            token_path: PathBuf::from("token.json"),
            calendars: vec![SubCalendar::default()],
            max_events: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SubCalendar {
    pub id: String,
    pub name: String,
    pub color: String,
    pub enabled: bool,
}

impl Default for SubCalendar {
    fn default() -> Self {
        Self {
            id: "primary".to_string(),
            name: "Personal".to_string(),
            color: "#4285f4".to_string(),
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub enabled: bool,
    /// e.g. https://school.instructure.com
    pub base_url: String,
    /// "ENV" means: read from CANVAS_API_TOKEN
    pub api_token: String,
    /// Empty means: every active course of the token owner.
    pub course_ids: Vec<u64>,
    pub days_ahead: i64,
    pub max_assignments: usize,
    pub max_announcements: usize,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: String::new(),
            api_token: String::new(),
            course_ids: Vec::new(),
            days_ahead: 7,
            max_assignments: 5,
            max_announcements: 3,
        }
    }
}

impl CanvasConfig {
    pub fn is_configured(&self) -> bool {
        self.enabled && !self.base_url.trim().is_empty() && !self.api_token.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrafficConfig {
    pub enabled: bool,
    /// "ENV" means: read from MAPBOX_ACCESS_TOKEN
    pub access_token: String,
    pub home: Option<Coordinates>,
    pub destinations: Vec<Destination>,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            access_token: String::new(),
            home: None,
            destinations: Vec::new(),
        }
    }
}

impl TrafficConfig {
    /// Whether the routing-matrix integration can be used.
    pub fn has_matrix(&self) -> bool {
        self.enabled
            && !self.access_token.trim().is_empty()
            && self.home.is_some()
            && !self.destinations.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feed {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RssConfig {
    pub enabled: bool,
    pub feeds: Vec<Feed>,
    pub items_per_feed: usize,
}

impl Default for RssConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            feeds: Vec::new(),
            items_per_feed: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub title: String,
    /// Seconds between generation cycles in loop mode.
    pub refresh_interval: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            title: "Dashboard".to_string(),
            refresh_interval: 900,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub output_dir: PathBuf,
    pub template: PathBuf,
    pub static_dir: PathBuf,
    pub cache_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            template: PathBuf::from("templates/dashboard.html"),
            static_dir: PathBuf::from("static"),
            cache_file: PathBuf::from("cache/calendar_cache.json"),
        }
    }
}

/// Load configuration from an explicit path. Supports TOML or JSON.
pub fn load_config_from(path: &Path) -> Result<DashboardConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_config(&content, ext.as_str())
        .with_context(|| format!("parsing config {}", path.display()))
}

/// Load configuration using env var + fallbacks, then apply env overrides:
/// 1) explicit path (CLI)
/// 2) $DASHBOARD_CONFIG_PATH
/// 3) config/dashboard.toml
/// 4) config/dashboard.json
/// 5) built-in defaults
pub fn load_config(explicit: Option<&Path>) -> Result<DashboardConfig> {
    let mut cfg = resolve_and_load(explicit)?;
    apply_env_overrides(&mut cfg, |k| std::env::var(k).ok());
    Ok(cfg)
}

fn resolve_and_load(explicit: Option<&Path>) -> Result<DashboardConfig> {
    if let Some(p) = explicit {
        return load_config_from(p);
    }
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_config_from(&pb);
        } else {
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
    }
    for candidate in [DEFAULT_TOML_PATH, DEFAULT_JSON_PATH] {
        let pb = PathBuf::from(candidate);
        if pb.exists() {
            return load_config_from(&pb);
        }
    }
    tracing::warn!("no config file found, using defaults");
    Ok(DashboardConfig::default())
}

fn parse_config(s: &str, hint_ext: &str) -> Result<DashboardConfig> {
    match hint_ext {
        "toml" => Ok(toml::from_str(s)?),
        "json" => Ok(serde_json::from_str(s)?),
        _ => {
            if let Ok(cfg) = toml::from_str(s) {
                return Ok(cfg);
            }
            serde_json::from_str(s).map_err(|_| anyhow!("unsupported config format"))
        }
    }
}

/// Environment values win over the file. A literal "ENV" in the file with no
/// matching variable resolves to an empty key (the source then runs on mock).
pub fn apply_env_overrides<F>(cfg: &mut DashboardConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    fn patch<F: Fn(&str) -> Option<String>>(slot: &mut String, var: &str, lookup: &F) {
        match lookup(var).filter(|v| !v.trim().is_empty()) {
            Some(v) => *slot = v,
            None if slot.trim().eq_ignore_ascii_case("env") => slot.clear(),
            None => {}
        }
    }

    patch(&mut cfg.weather.api_key, "OPENWEATHER_API_KEY", &lookup);
    patch(&mut cfg.canvas.api_token, "CANVAS_API_TOKEN", &lookup);
    patch(&mut cfg.canvas.base_url, "CANVAS_BASE_URL", &lookup);
    patch(&mut cfg.traffic.access_token, "MAPBOX_ACCESS_TOKEN", &lookup);

    if let Some(p) = lookup("GOOGLE_CALENDAR_TOKEN_PATH").filter(|v| !v.trim().is_empty()) {
        cfg.calendar.token_path = PathBuf::from(p);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn toml_sections_fill_in_defaults() {
        let toml = r##"
[weather]
api_key = "abc"
location = "Oslo,NO"
units = "imperial"

[[calendar.calendars]]
id = "work@example.com"
name = "Work"
color = "#ff0000"

[[rss.feeds]]
name = "BBC News"
url = "https://feeds.bbci.co.uk/news/rss.xml"
"##;
        let cfg = parse_config(toml, "toml").unwrap();
        assert_eq!(cfg.weather.units, Units::Imperial);
        assert_eq!(cfg.weather.location, "Oslo,NO");
        assert!(cfg.weather.enabled);
        assert_eq!(cfg.calendar.calendars.len(), 1);
        assert!(cfg.calendar.calendars[0].enabled);
        assert_eq!(cfg.calendar.calendars[0].color, "#ff0000");
        assert_eq!(cfg.calendar.max_events, 10);
        assert_eq!(cfg.rss.items_per_feed, 3);
        assert!(!cfg.canvas.enabled);
        assert_eq!(cfg.display.refresh_interval, 900);
    }

    #[test]
    fn json_without_hint_is_accepted() {
        let json = r#"{"weather": {"location": "Paris,FR"}, "display": {"title": "Hall"}}"#;
        let cfg = parse_config(json, "").unwrap();
        assert_eq!(cfg.weather.location, "Paris,FR");
        assert_eq!(cfg.display.title, "Hall");
    }

    #[test]
    fn env_overrides_and_env_sentinel() {
        let mut cfg = DashboardConfig::default();
        cfg.weather.api_key = "from-file".into();
        cfg.canvas.api_token = "ENV".into();
        cfg.traffic.access_token = "ENV".into();

        let vars: HashMap<&str, &str> = [
            ("OPENWEATHER_API_KEY", "from-env"),
            ("MAPBOX_ACCESS_TOKEN", "pk.123"),
        ]
        .into_iter()
        .collect();
        apply_env_overrides(&mut cfg, |k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(cfg.weather.api_key, "from-env");
        assert_eq!(cfg.traffic.access_token, "pk.123");
        // ENV with no variable set resolves to "not configured"
        assert_eq!(cfg.canvas.api_token, "");
    }

    #[test]
    fn matrix_needs_token_home_and_destinations() {
        let mut t = TrafficConfig::default();
        assert!(!t.has_matrix());
        t.access_token = "pk".into();
        t.home = Some(Coordinates { lat: 1.0, lon: 2.0 });
        assert!(!t.has_matrix());
        t.destinations.push(Destination {
            name: "Work".into(),
            lat: 1.1,
            lon: 2.1,
        });
        assert!(t.has_matrix());
        t.enabled = false;
        assert!(!t.has_matrix());
    }
}
