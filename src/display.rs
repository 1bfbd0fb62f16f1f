// src/display.rs
//! Display-only derivations computed from already-assembled data and `now`.
//! No I/O here.

use chrono::{DateTime, Datelike, Duration, FixedOffset, Local, NaiveDate, NaiveTime};
use serde::Serialize;

use crate::text::round1;

// ---------------------------------------------------------------------------
// Sun arc
// ---------------------------------------------------------------------------

/// Position of the sun along its daily arc in percent.
///
/// With sunrise and sunset: 0 at/before sunrise, 100 at/after sunset,
/// otherwise linear and clamped to `[5, 95]`. Without them: a 06:00–20:00
/// ramp clamped to `[0, 100]`.
pub fn sun_arc_percent(sunrise: Option<NaiveTime>, sunset: Option<NaiveTime>, now: NaiveTime) -> f64 {
    if let (Some(rise), Some(set)) = (sunrise, sunset) {
        if set > rise {
            if now <= rise {
                return 0.0;
            }
            if now >= set {
                return 100.0;
            }
            let elapsed = (now - rise).num_seconds() as f64;
            let span = (set - rise).num_seconds() as f64;
            return round1((elapsed / span * 100.0).clamp(5.0, 95.0));
        }
    }
    let start = NaiveTime::from_hms_opt(6, 0, 0).unwrap_or(NaiveTime::MIN);
    let elapsed = (now - start).num_seconds() as f64;
    let span = 14.0 * 3600.0;
    round1((elapsed / span * 100.0).clamp(0.0, 100.0))
}

/// Wall-clock time of `now` at a location `offset_secs` east of UTC, so it
/// compares with sunrise and sunset rendered in that same offset. Without an
/// offset the host's clock is used.
pub fn clock_at_offset(now: DateTime<Local>, offset_secs: Option<i32>) -> NaiveTime {
    match offset_secs.and_then(FixedOffset::east_opt) {
        Some(offset) => now.with_timezone(&offset).time(),
        None => now.time(),
    }
}

/// Parse a `HH:MM` clock string as produced by the weather normalizer.
pub fn parse_clock(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").ok()
}

// ---------------------------------------------------------------------------
// UV
// ---------------------------------------------------------------------------

/// WHO UV index bands.
pub fn uv_level(index: u8) -> &'static str {
    match index {
        0..=2 => "Low",
        3..=5 => "Moderate",
        6..=7 => "High",
        8..=10 => "Very High",
        _ => "Extreme",
    }
}

// ---------------------------------------------------------------------------
// Month grid / week
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridDay {
    pub date: NaiveDate,
    pub day: u32,
    pub is_other_month: bool,
    pub is_today: bool,
}

/// Monday-first weeks covering the month of `today`, padded with days of the
/// neighbouring months.
pub fn month_grid(today: NaiveDate) -> Vec<Vec<GridDay>> {
    let first = today.with_day(1).unwrap_or(today);
    let last = last_day_of_month(first);
    let start = first - Duration::days(first.weekday().num_days_from_monday() as i64);
    let end = last + Duration::days(6 - last.weekday().num_days_from_monday() as i64);

    let mut weeks = Vec::new();
    let mut week = Vec::with_capacity(7);
    let mut d = start;
    while d <= end {
        week.push(GridDay {
            date: d,
            day: d.day(),
            is_other_month: d.month() != first.month(),
            is_today: d == today,
        });
        if week.len() == 7 {
            weeks.push(std::mem::replace(&mut week, Vec::with_capacity(7)));
        }
        d += Duration::days(1);
    }
    weeks
}

fn last_day_of_month(first: NaiveDate) -> NaiveDate {
    let (y, m) = if first.month() == 12 {
        (first.year() + 1, 1)
    } else {
        (first.year(), first.month() + 1)
    };
    NaiveDate::from_ymd_opt(y, m, 1)
        .and_then(|next| next.pred_opt())
        .unwrap_or(first)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekInfo {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub number: u32,
}

/// Monday..Sunday of the ISO week containing `today`.
pub fn week_info(today: NaiveDate) -> WeekInfo {
    let start = week_start(today);
    WeekInfo {
        start,
        end: start + Duration::days(6),
        number: today.iso_week().week(),
    }
}

pub fn week_start(today: NaiveDate) -> NaiveDate {
    today - Duration::days(today.weekday().num_days_from_monday() as i64)
}
