// src/mock.rs
//! Deterministic substitute datasets, one per source.
//!
//! Used when a source is unconfigured, failing without a usable cache, or
//! when the whole run is in mock mode. Values depend only on config and
//! `now`.

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveTime, Timelike};

use crate::config::{Units, WeatherConfig};
use crate::model::{
    ActivityLevel, AirQualityRecord, Announcement, Article, Assignment, AtRiskStudent, CalendarEvent,
    DiscussionHotspot, ForecastDay, ForecastRecord, GradeHistogram, GradingItem, PerformanceSummary,
    TrafficRoute, WeatherRecord,
};
use crate::sources::air_quality::epa_status;
use crate::sources::canvas::classify_priority;
use crate::sources::forecast::with_range;
use crate::sources::traffic::synthesize_routes;
use crate::sources::weather::{convert_wind_speed, estimate_uv_index};

pub const AQ_BASE: f64 = 35.0;

pub fn weather(cfg: &WeatherConfig, now: DateTime<Local>) -> WeatherRecord {
    let (temp, feels_like) = match cfg.units {
        Units::Metric => (18, 17),
        Units::Imperial => (64, 63),
    };
    // provider-native wind: m/s for metric, mph for imperial
    let raw_wind = match cfg.units {
        Units::Metric => 3.5,
        Units::Imperial => 7.8,
    };
    WeatherRecord {
        location: cfg.location.clone(),
        temp,
        feels_like,
        temp_unit: cfg.units.temp_unit().to_string(),
        humidity: 65,
        wind_speed: convert_wind_speed(raw_wind, cfg.units),
        wind_unit: cfg.units.wind_unit().to_string(),
        description: "Partly Cloudy".to_string(),
        icon: "02d".to_string(),
        sunrise: "06:45".to_string(),
        sunset: "19:30".to_string(),
        utc_offset: None,
        uv_index: estimate_uv_index(now.month(), now.hour()),
        alerts: Vec::new(),
    }
}

pub fn forecast(units: Units, now: DateTime<Local>) -> ForecastRecord {
    const HIGHS: [i64; 5] = [18, 20, 17, 15, 19];
    const LOWS: [i64; 5] = [10, 12, 11, 9, 11];
    const SKIES: [(&str, &str); 5] = [
        ("02d", "Partly Cloudy"),
        ("01d", "Clear Sky"),
        ("10d", "Light Rain"),
        ("04d", "Overcast Clouds"),
        ("02d", "Few Clouds"),
    ];
    let to_unit = |c: i64| match units {
        Units::Metric => c,
        Units::Imperial => (c as f64 * 9.0 / 5.0 + 32.0).round() as i64,
    };

    let today = now.date_naive();
    let days = (0..5)
        .map(|i| {
            let date = today + Duration::days(i as i64);
            ForecastDay {
                day_key: date.format("%Y-%m-%d").to_string(),
                label: if i == 0 {
                    "TODAY".to_string()
                } else {
                    date.format("%a").to_string()
                },
                high: to_unit(HIGHS[i]),
                low: to_unit(LOWS[i]),
                icon: SKIES[i].0.to_string(),
                description: SKIES[i].1.to_string(),
            }
        })
        .collect();
    with_range(days)
}

/// Base value scaled by season and rush hour, labelled on the EPA scale.
pub fn air_quality(now: DateTime<Local>) -> AirQualityRecord {
    let season = match now.month() {
        6..=8 => 1.3,
        12 | 1 | 2 => 1.1,
        _ => 1.0,
    };
    let rush = match now.hour() {
        7..=9 | 16..=19 => 1.4,
        _ => 0.9,
    };
    let value = (AQ_BASE * season * rush).round() as u32;
    AirQualityRecord {
        aqi: 0,
        aqi_value: value,
        status: epa_status(value).to_string(),
    }
}

fn event(
    summary: &str,
    date: NaiveDate,
    times: Option<(u32, u32, u32, u32)>,
    location: &str,
    calendar: (&str, &str),
) -> CalendarEvent {
    let (start, end, all_day) = match times {
        Some((sh, sm, eh, em)) => (
            date.and_time(NaiveTime::from_hms_opt(sh, sm, 0).unwrap_or(NaiveTime::MIN)),
            date.and_time(NaiveTime::from_hms_opt(eh, em, 0).unwrap_or(NaiveTime::MIN)),
            false,
        ),
        None => (
            date.and_time(NaiveTime::MIN),
            (date + Duration::days(1)).and_time(NaiveTime::MIN),
            true,
        ),
    };
    let clock = |t: chrono::NaiveDateTime| if all_day { String::new() } else { t.format("%H:%M").to_string() };
    CalendarEvent {
        summary: summary.to_string(),
        start,
        end,
        all_day,
        start_time: clock(start),
        end_time: clock(end),
        location: location.to_string(),
        calendar_name: calendar.0.to_string(),
        calendar_color: calendar.1.to_string(),
    }
}

/// A few days of meetings across two calendars, anchored on `today`.
pub fn calendar_events(today: NaiveDate) -> Vec<CalendarEvent> {
    const WORK: (&str, &str) = ("Work", "#0b8043");
    const PERSONAL: (&str, &str) = ("Personal", "#4285f4");
    let day = |n: i64| today + Duration::days(n);
    vec![
        event("Team Standup", day(0), Some((9, 0, 9, 30)), "", WORK),
        event("Project Review", day(0), Some((14, 0, 15, 0)), "Room 2", WORK),
        event("Client Call", day(0), Some((16, 0, 17, 0)), "", WORK),
        event("Team Standup", day(1), Some((9, 0, 9, 30)), "", WORK),
        event("Dentist", day(2), Some((11, 0, 12, 0)), "Main St", PERSONAL),
        event("Planning Day", day(3), None, "", WORK),
        event("Dinner with friends", day(4), Some((19, 0, 21, 0)), "", PERSONAL),
    ]
}

pub fn assignments(now: DateTime<Local>) -> Vec<Assignment> {
    [
        ("Lab Report 3", "Biology 101", Duration::hours(20), 20.0),
        ("Problem Set 5", "Calculus II", Duration::days(2), 10.0),
        ("Reading Response", "English Composition", Duration::days(5), 5.0),
    ]
    .into_iter()
    .map(|(title, course, due_in, points)| {
        let due = now + due_in;
        Assignment {
            title: title.to_string(),
            course: course.to_string(),
            due_at: due,
            due_display: due.format("%a %b %-d, %H:%M").to_string(),
            points_possible: points,
            priority: classify_priority(Some(due), now),
            url: String::new(),
        }
    })
    .collect()
}

pub fn announcements(now: DateTime<Local>) -> Vec<Announcement> {
    [
        ("Midterm review session", "Calculus II", Duration::hours(5), "Review session Thursday at 4pm in the library."),
        ("Lab safety reminder", "Biology 101", Duration::days(1), "Closed-toe shoes are required for all lab sessions."),
        ("Essay rubric posted", "English Composition", Duration::days(3), "The rubric for the final essay is now on the course page."),
    ]
    .into_iter()
    .map(|(title, course, ago, message)| {
        let posted = now - ago;
        Announcement {
            title: title.to_string(),
            course: course.to_string(),
            posted_at: posted,
            posted_display: posted.format("%b %-d").to_string(),
            message: message.to_string(),
        }
    })
    .collect()
}

pub fn grading_queue(now: DateTime<Local>) -> Vec<GradingItem> {
    [
        ("Quiz 4", "Calculus II", Duration::hours(12), 5u32),
        ("Lab Report 2", "Biology 101", Duration::days(2), 12),
        ("Essay Draft", "English Composition", Duration::days(10), 8),
    ]
    .into_iter()
    .map(|(title, course, due_in, needs)| {
        let due = now + due_in;
        GradingItem {
            title: title.to_string(),
            course: course.to_string(),
            due_at: Some(due),
            due_display: due.format("%a %b %-d, %H:%M").to_string(),
            needs_grading: needs,
            priority: classify_priority(Some(due), now),
        }
    })
    .collect()
}

pub fn at_risk() -> Vec<AtRiskStudent> {
    vec![
        AtRiskStudent {
            name: "Jordan Lee".to_string(),
            course: "Calculus II".to_string(),
            missing: 3,
            late: 1,
            reason: "3 missing".to_string(),
        },
        AtRiskStudent {
            name: "Sam Rivera".to_string(),
            course: "Biology 101".to_string(),
            missing: 0,
            late: 4,
            reason: "4 late".to_string(),
        },
    ]
}

pub fn discussions() -> Vec<DiscussionHotspot> {
    vec![
        DiscussionHotspot {
            title: "Week 6 questions".to_string(),
            course: "Calculus II".to_string(),
            unread: 5,
            posts: 18,
            activity: ActivityLevel::High,
            last_reply: String::new(),
        },
        DiscussionHotspot {
            title: "Field trip ideas".to_string(),
            course: "Biology 101".to_string(),
            unread: 2,
            posts: 7,
            activity: ActivityLevel::Medium,
            last_reply: String::new(),
        },
    ]
}

pub fn performance() -> PerformanceSummary {
    PerformanceSummary {
        assignment: "Quiz 3".to_string(),
        course: "Calculus II".to_string(),
        due_display: String::new(),
        points_possible: 20.0,
        graded: 24,
        mean: 15.8,
        max: 20.0,
        min: 9.0,
        histogram: GradeHistogram {
            a: 6,
            b: 8,
            c: 5,
            d: 3,
            f: 2,
        },
    }
}

pub fn articles() -> Vec<Article> {
    [
        ("Local News", "City council approves new bike lanes", "Construction begins next month on the riverside corridor..."),
        ("Local News", "Weekend farmers market returns", "Over forty vendors are expected at the opening weekend..."),
        ("Tech", "Open-source project reaches 1.0", "After three years of development the maintainers have tagged a stable release..."),
    ]
    .into_iter()
    .map(|(source, title, summary)| Article {
        source: source.to_string(),
        title: title.to_string(),
        link: "#".to_string(),
        published: String::new(),
        summary: summary.to_string(),
    })
    .collect()
}

pub fn traffic(now: DateTime<Local>) -> Vec<TrafficRoute> {
    synthesize_routes(now)
}
