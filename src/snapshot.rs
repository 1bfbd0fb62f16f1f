// src/snapshot.rs
//! The assembled, read-only result of one generation cycle.

use chrono::{DateTime, Local, NaiveDate};
use serde::Serialize;

use crate::config::DisplayConfig;
use crate::display::{
    clock_at_offset, month_grid, parse_clock, sun_arc_percent, uv_level, week_info, GridDay, WeekInfo,
};
use crate::model::{
    AirQualityRecord, Article, CalendarData, CourseData, ForecastRecord, Origin, SourceKind, Sourced,
    TrafficRoute, WeatherRecord,
};

/// Fields derived from the assembled data and `now`; nothing here is fetched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayFields {
    pub sun_arc_percent: f64,
    pub uv_level: String,
    pub month_label: String,
    pub month_grid: Vec<Vec<GridDay>>,
    pub week: WeekInfo,
    pub today: NaiveDate,
    pub date_display: String,
    pub last_updated: String,
}

impl DisplayFields {
    pub fn derive(weather: &WeatherRecord, now: DateTime<Local>) -> Self {
        let today = now.date_naive();
        Self {
            sun_arc_percent: sun_arc_percent(
                parse_clock(&weather.sunrise),
                parse_clock(&weather.sunset),
                clock_at_offset(now, weather.utc_offset),
            ),
            uv_level: uv_level(weather.uv_index).to_string(),
            month_label: now.format("%B %Y").to_string(),
            month_grid: month_grid(today),
            week: week_info(today),
            today,
            date_display: now.format("%A, %B %-d").to_string(),
            last_updated: now.format("%H:%M:%S").to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub generated_at: DateTime<Local>,
    pub config: DisplayConfig,
    pub mock_mode: bool,
    pub weather: Sourced<WeatherRecord>,
    pub forecast: Sourced<ForecastRecord>,
    pub air_quality: Sourced<AirQualityRecord>,
    pub calendar: Sourced<CalendarData>,
    pub courses: CourseData,
    pub traffic: Sourced<Vec<TrafficRoute>>,
    pub articles: Sourced<Vec<Article>>,
    pub display: DisplayFields,
}

impl Snapshot {
    /// Origin of every section, in a fixed order.
    pub fn origins(&self) -> Vec<(SourceKind, Origin)> {
        let c = &self.courses;
        vec![
            (self.weather.source, self.weather.origin),
            (self.forecast.source, self.forecast.origin),
            (self.air_quality.source, self.air_quality.origin),
            (self.calendar.source, self.calendar.origin),
            (c.assignments.source, c.assignments.origin),
            (c.announcements.source, c.announcements.origin),
            (c.grading_queue.source, c.grading_queue.origin),
            (c.at_risk.source, c.at_risk.origin),
            (c.discussions.source, c.discussions.origin),
            (c.performance.source, c.performance.origin),
            (self.traffic.source, self.traffic.origin),
            (self.articles.source, self.articles.origin),
        ]
    }

    pub fn origin_of(&self, source: SourceKind) -> Option<Origin> {
        self.origins()
            .into_iter()
            .find(|(s, _)| *s == source)
            .map(|(_, o)| o)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
