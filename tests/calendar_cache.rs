// tests/calendar_cache.rs
mod common;

use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveTime};
use common::{context, quiet_config, wednesday_morning, StubHttp};
use kiosk_dashboard::cache::CacheStore;
use kiosk_dashboard::config::{DashboardConfig, SubCalendar};
use kiosk_dashboard::model::{CalendarEvent, Origin};
use kiosk_dashboard::sources::calendar::{agenda, flat_list, week_grid};
use kiosk_dashboard::{Aggregator, FetchError};
use serde_json::json;

fn calendar_config(dir: &std::path::Path) -> DashboardConfig {
    let mut cfg = quiet_config(dir);
    cfg.calendar.enabled = true;
    cfg.calendar.calendars = vec![
        SubCalendar {
            id: "work@example.com".into(),
            name: "Work".into(),
            color: "#0b8043".into(),
            enabled: true,
        },
        SubCalendar {
            id: "home@example.com".into(),
            name: "Home".into(),
            color: "#4285f4".into(),
            enabled: true,
        },
    ];
    cfg
}

fn home_events() -> serde_json::Value {
    json!({"items": [
        {"summary": "Dinner", "start": {"dateTime": "2025-05-15T19:00:00Z"},
         "end": {"dateTime": "2025-05-15T21:00:00Z"}}
    ]})
}

fn work_events() -> serde_json::Value {
    json!({"items": [
        {"summary": "Offsite", "start": {"date": "2025-05-14"}, "end": {"date": "2025-05-15"}},
        {"summary": "Review", "start": {"date": "2025-05-16"}, "end": {"date": "2025-05-17"}},
        {"summary": "Next week", "start": {"date": "2025-05-20"}, "end": {"date": "2025-05-21"}}
    ]})
}

#[tokio::test]
async fn live_then_cached_then_stale() {
    let dir = tempfile::tempdir().unwrap();
    let now = wednesday_morning();

    // 1) live from both sub-calendars
    let live = Arc::new(
        StubHttp::new()
            .json("/work@example.com/events", work_events())
            .json("/home@example.com/events", home_events()),
    );
    let mut agg = Aggregator::new(context(calendar_config(dir.path()), live, Some("tok")));
    let snap = agg.collect(now).await;
    assert_eq!(snap.calendar.origin, Origin::Live);
    assert_eq!(snap.calendar.data.events.len(), 4);
    assert!(dir.path().join("cache/calendar_cache.json").exists());

    // 2) every sub-calendar down, an hour later: cache
    let down = Arc::new(StubHttp::new());
    let mut agg = Aggregator::new(context(calendar_config(dir.path()), down.clone(), Some("tok")));
    let snap = agg.collect(now + Duration::hours(1)).await;
    assert_eq!(snap.calendar.origin, Origin::Cached);
    assert_eq!(snap.calendar.data.events.len(), 4);
    assert_eq!(down.count("/events"), 2);

    // 3) a day and an hour later the cache is stale: mock
    let snap = agg.collect(now + Duration::hours(25)).await;
    assert_eq!(snap.calendar.origin, Origin::Mock);
}

#[tokio::test]
async fn partial_result_is_shown_but_not_cached() {
    let dir = tempfile::tempdir().unwrap();
    let now = wednesday_morning();
    let cache: CacheStore<CalendarEvent> = CacheStore::new(dir.path().join("cache/calendar_cache.json"));

    let both = Arc::new(
        StubHttp::new()
            .json("/work@example.com/events", work_events())
            .json("/home@example.com/events", home_events()),
    );
    let mut agg = Aggregator::new(context(calendar_config(dir.path()), both, Some("tok")));
    agg.collect(now).await;
    assert_eq!(cache.load(now).map(|v| v.len()), Some(4));

    // home times out: the page shows what work returned
    let partial = Arc::new(
        StubHttp::new()
            .json("/work@example.com/events", work_events())
            .fail("/home@example.com/events", FetchError::Transport("timeout".into())),
    );
    let mut agg = Aggregator::new(context(calendar_config(dir.path()), partial, Some("tok")));
    let snap = agg.collect(now + Duration::minutes(15)).await;
    assert_eq!(snap.calendar.origin, Origin::Live);
    assert_eq!(snap.calendar.data.events.len(), 3);
    assert!(snap.calendar.data.events.iter().all(|e| e.calendar_name == "Work"));

    // the complete set from the first cycle is still the fallback
    let kept = cache.load(now + Duration::minutes(15)).unwrap();
    assert_eq!(kept.len(), 4);
    assert!(kept.iter().any(|e| e.calendar_name == "Home"));

    let mut agg = Aggregator::new(context(calendar_config(dir.path()), Arc::new(StubHttp::new()), Some("tok")));
    let snap = agg.collect(now + Duration::hours(1)).await;
    assert_eq!(snap.calendar.origin, Origin::Cached);
    assert!(snap.calendar.data.events.iter().any(|e| e.summary == "Dinner"));
}

#[tokio::test]
async fn missing_credentials_skip_cache_and_network() {
    let dir = tempfile::tempdir().unwrap();
    let now = wednesday_morning();

    let live = Arc::new(StubHttp::new().json("/events", work_events()));
    let mut agg = Aggregator::new(context(calendar_config(dir.path()), live, Some("tok")));
    assert_eq!(agg.collect(now).await.calendar.origin, Origin::Live);

    let http = Arc::new(StubHttp::new().json("/events", work_events()));
    let mut agg = Aggregator::new(context(calendar_config(dir.path()), http.clone(), None));
    let snap = agg.collect(now).await;
    assert_eq!(snap.calendar.origin, Origin::Mock);
    assert!(http.calls().is_empty());
}

#[test]
fn cache_round_trip_respects_24_hours() {
    let dir = tempfile::tempdir().unwrap();
    let store: CacheStore<CalendarEvent> = CacheStore::new(dir.path().join("c.json"));
    let now = wednesday_morning();
    let events = kiosk_dashboard::mock::calendar_events(now.date_naive());

    store.save(&events, now);
    assert_eq!(store.load(now + Duration::hours(23)), Some(events.clone()));
    assert_eq!(store.load(now + Duration::hours(24) + Duration::minutes(1)), None);
}

fn all_day(summary: &str, date: NaiveDate) -> CalendarEvent {
    CalendarEvent {
        summary: summary.into(),
        start: date.and_time(NaiveTime::MIN),
        end: (date + Duration::days(1)).and_time(NaiveTime::MIN),
        all_day: true,
        start_time: String::new(),
        end_time: String::new(),
        location: String::new(),
        calendar_name: "Work".into(),
        calendar_color: "#000".into(),
    }
}

#[test]
fn agenda_bucket_membership_by_offset() {
    let today = NaiveDate::from_ymd_opt(2025, 5, 14).unwrap();
    let events: Vec<CalendarEvent> = (-3..10)
        .map(|d| all_day(&format!("d{d}"), today + Duration::days(d)))
        .collect();

    let buckets = agenda(&events, today);
    assert_eq!(buckets.len(), 5);
    assert_eq!(buckets[0].label, "Today");
    assert_eq!(buckets[1].label, "Tomorrow");
    assert_eq!(buckets[2].label, "Friday");

    for d in -3i64..10 {
        let name = format!("d{d}");
        let found: Vec<usize> = buckets
            .iter()
            .enumerate()
            .filter(|(_, b)| b.events.iter().any(|e| e.summary == name))
            .map(|(i, _)| i)
            .collect();
        if (0..5).contains(&d) {
            assert_eq!(found, vec![d as usize], "offset {d}");
        } else {
            assert!(found.is_empty(), "offset {d} should be dropped");
        }
    }
}

#[test]
fn week_grid_concatenates_calendars_per_day() {
    let today = NaiveDate::from_ymd_opt(2025, 5, 14).unwrap();
    let mut a = all_day("Same", today);
    let mut b = all_day("Same", today);
    a.calendar_name = "Work".into();
    b.calendar_name = "Home".into();

    let week = week_grid(&[a, b], today);
    assert_eq!(week.len(), 7);
    assert_eq!(week[0].day_name, "Mon");
    assert!(week[2].is_today);
    assert_eq!(week[2].all_day.len(), 2);
    assert!(week[2].timed.is_empty());
}

fn timed(summary: &str, calendar: &str, date: NaiveDate, hour: u32) -> CalendarEvent {
    let start = date.and_time(NaiveTime::from_hms_opt(hour, 0, 0).unwrap());
    CalendarEvent {
        summary: summary.into(),
        start,
        end: start + Duration::hours(1),
        all_day: false,
        start_time: start.format("%H:%M").to_string(),
        end_time: (start + Duration::hours(1)).format("%H:%M").to_string(),
        location: String::new(),
        calendar_name: calendar.into(),
        calendar_color: "#000".into(),
    }
}

#[test]
fn flat_list_merges_sorts_and_caps() {
    let today = NaiveDate::from_ymd_opt(2025, 5, 14).unwrap();
    let day = |n: i64| today + Duration::days(n);
    // concatenated per calendar, as fetched
    let events = vec![
        timed("Standup", "Work", day(0), 9),
        timed("Retro", "Work", day(1), 10),
        timed("Sync", "Work", day(2), 8),
        timed("Yesterday", "Work", day(-1), 9),
        timed("Next Wednesday", "Work", day(7), 9),
        timed("Breakfast", "Home", day(0), 9),
        timed("Gym", "Home", day(2), 18),
        timed("Sync", "Home", day(2), 8),
    ];

    let all = flat_list(&events, today, 50);
    let got: Vec<(&str, &str)> = all
        .iter()
        .map(|e| (e.summary.as_str(), e.calendar_name.as_str()))
        .collect();
    assert_eq!(
        got,
        vec![
            ("Breakfast", "Home"),
            ("Standup", "Work"),
            ("Retro", "Work"),
            ("Sync", "Work"),
            ("Sync", "Home"),
            ("Gym", "Home"),
        ]
    );

    let capped = flat_list(&events, today, 3);
    let titles: Vec<&str> = capped.iter().map(|e| e.summary.as_str()).collect();
    assert_eq!(titles, vec!["Breakfast", "Standup", "Retro"]);

    assert!(flat_list(&events, today, 0).is_empty());
}
