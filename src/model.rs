// src/model.rs
//! Normalized per-source records.
//!
//! Every optional provider field is defaulted (empty string, zero, empty list)
//! at construction so the renderer can assume field presence.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Which pipeline produced a snapshot section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Weather,
    Forecast,
    AirQuality,
    Calendar,
    Assignments,
    Announcements,
    GradingQueue,
    AtRiskStudents,
    Discussions,
    Performance,
    Traffic,
    Rss,
}

impl SourceKind {
    pub fn name(self) -> &'static str {
        match self {
            SourceKind::Weather => "weather",
            SourceKind::Forecast => "forecast",
            SourceKind::AirQuality => "air_quality",
            SourceKind::Calendar => "calendar",
            SourceKind::Assignments => "canvas_assignments",
            SourceKind::Announcements => "canvas_announcements",
            SourceKind::GradingQueue => "canvas_grading_queue",
            SourceKind::AtRiskStudents => "canvas_at_risk",
            SourceKind::Discussions => "canvas_discussions",
            SourceKind::Performance => "canvas_performance",
            SourceKind::Traffic => "traffic",
            SourceKind::Rss => "rss",
        }
    }
}

/// Where the data in a section came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Live,
    Cached,
    Mock,
}

/// A snapshot section tagged with its source and origin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sourced<T> {
    pub source: SourceKind,
    pub origin: Origin,
    pub data: T,
}

impl<T> Sourced<T> {
    pub fn live(source: SourceKind, data: T) -> Self {
        Self {
            source,
            origin: Origin::Live,
            data,
        }
    }

    pub fn is_live(&self) -> bool {
        self.origin == Origin::Live
    }

    /// Transform the payload, keeping source and origin.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Sourced<U> {
        Sourced {
            source: self.source,
            origin: self.origin,
            data: f(self.data),
        }
    }
}

// ---------------------------------------------------------------------------
// Weather
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub location: String,
    pub temp: i64,
    pub feels_like: i64,
    pub temp_unit: String,
    pub humidity: i64,
    pub wind_speed: f64,
    pub wind_unit: String,
    pub description: String,
    pub icon: String,
    /// Clock time `HH:MM` at the location, empty when the provider gave none.
    pub sunrise: String,
    pub sunset: String,
    /// UTC offset of the location in seconds. `None` means the host's zone.
    #[serde(default)]
    pub utc_offset: Option<i32>,
    pub uv_index: u8,
    pub alerts: Vec<WeatherAlert>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherAlert {
    pub event: String,
    pub description: String,
    pub sender: String,
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    /// `YYYY-MM-DD` in the location's local time.
    pub day_key: String,
    /// `TODAY` or weekday abbreviation.
    pub label: String,
    pub high: i64,
    pub low: i64,
    pub icon: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    pub days: Vec<ForecastDay>,
    /// Bar-chart scale, at least 10 degrees wide.
    pub range_high: i64,
    pub range_low: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirQualityRecord {
    /// Provider category 1..=5, 0 for synthesized values.
    pub aqi: u8,
    /// Approximation on the 0..=500 scale.
    pub aqi_value: u32,
    pub status: String,
}

// ---------------------------------------------------------------------------
// Calendar
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub summary: String,
    /// Local start; midnight for all-day events.
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub all_day: bool,
    /// `HH:MM`, empty for all-day events.
    pub start_time: String,
    pub end_time: String,
    pub location: String,
    pub calendar_name: String,
    pub calendar_color: String,
}

impl CalendarEvent {
    pub fn date(&self) -> NaiveDate {
        self.start.date()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekDay {
    pub date: NaiveDate,
    pub day_name: String,
    pub day_number: u32,
    pub is_today: bool,
    pub all_day: Vec<CalendarEvent>,
    pub timed: Vec<CalendarEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgendaDay {
    pub label: String,
    pub date: NaiveDate,
    pub events: Vec<CalendarEvent>,
}

/// All three calendar views, derived from one resolved event list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarData {
    pub events: Vec<CalendarEvent>,
    pub week: Vec<WeekDay>,
    pub agenda: Vec<AgendaDay>,
}

// ---------------------------------------------------------------------------
// Canvas (LMS)
// ---------------------------------------------------------------------------

/// Ordering is urgency: `High < Medium < Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityLevel {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    pub title: String,
    pub course: String,
    pub due_at: DateTime<Local>,
    pub due_display: String,
    pub points_possible: f64,
    pub priority: Priority,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Announcement {
    pub title: String,
    pub course: String,
    pub posted_at: DateTime<Local>,
    pub posted_display: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradingItem {
    pub title: String,
    pub course: String,
    pub due_at: Option<DateTime<Local>>,
    pub due_display: String,
    pub needs_grading: u32,
    pub priority: Priority,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AtRiskStudent {
    pub name: String,
    pub course: String,
    pub missing: u32,
    pub late: u32,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscussionHotspot {
    pub title: String,
    pub course: String,
    pub unread: u32,
    pub posts: u32,
    pub activity: ActivityLevel,
    pub last_reply: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GradeHistogram {
    pub a: u32,
    pub b: u32,
    pub c: u32,
    pub d: u32,
    pub f: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceSummary {
    pub assignment: String,
    pub course: String,
    pub due_display: String,
    pub points_possible: f64,
    pub graded: u32,
    pub mean: f64,
    pub max: f64,
    pub min: f64,
    pub histogram: GradeHistogram,
}

/// The six course views, each resolved independently.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseData {
    pub assignments: Sourced<Vec<Assignment>>,
    pub announcements: Sourced<Vec<Announcement>>,
    pub grading_queue: Sourced<Vec<GradingItem>>,
    pub at_risk: Sourced<Vec<AtRiskStudent>>,
    pub discussions: Sourced<Vec<DiscussionHotspot>>,
    pub performance: Sourced<PerformanceSummary>,
}

// ---------------------------------------------------------------------------
// Traffic / RSS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrafficStatus {
    Light,
    Moderate,
    Heavy,
    Severe,
    Normal,
    Slow,
}

impl TrafficStatus {
    pub fn label(self) -> &'static str {
        match self {
            TrafficStatus::Light => "Light traffic",
            TrafficStatus::Moderate => "Moderate traffic",
            TrafficStatus::Heavy => "Heavy traffic",
            TrafficStatus::Severe => "Severe traffic",
            TrafficStatus::Normal => "Normal",
            TrafficStatus::Slow => "Slow",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrafficRoute {
    pub name: String,
    pub duration_minutes: u32,
    /// Free-flow reference time; equals the duration for live matrix data.
    pub base_minutes: u32,
    pub status: TrafficStatus,
    pub traffic_status: String,
}

impl TrafficRoute {
    pub fn new(name: impl Into<String>, duration: u32, base: u32, status: TrafficStatus) -> Self {
        Self {
            name: name.into(),
            duration_minutes: duration,
            base_minutes: base,
            status,
            traffic_status: status.label().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Article {
    pub source: String,
    pub title: String,
    pub link: String,
    pub published: String,
    pub summary: String,
}
