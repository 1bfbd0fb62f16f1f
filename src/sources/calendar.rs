// src/sources/calendar.rs
//! Google Calendar events from several named sub-calendars, and the three
//! views built from them (flat list, week grid, five-day agenda).

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;
use serde_json::Value;

use crate::config::{CalendarConfig, SubCalendar};
use crate::credentials::CredentialProvider;
use crate::display::week_start;
use crate::error::{FetchError, FetchResult};
use crate::http::{HttpFetch, Request};
use crate::model::{AgendaDay, CalendarData, CalendarEvent, WeekDay};
use crate::sources::decode;

const EVENTS_BASE: &str = "https://www.googleapis.com/calendar/v3/calendars";
pub const AGENDA_DAYS: i64 = 5;
pub const FLAT_LIST_DAYS: i64 = 7;

/// Date windows `[start, end)` of the three views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarView {
    /// today → +7d
    Flat,
    /// Monday → Sunday of the current week
    Week,
    /// today → +5d
    Agenda,
}

impl CalendarView {
    pub fn window(self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self {
            CalendarView::Flat => (today, today + Duration::days(FLAT_LIST_DAYS)),
            CalendarView::Week => {
                let monday = week_start(today);
                (monday, monday + Duration::days(7))
            }
            CalendarView::Agenda => (today, today + Duration::days(AGENDA_DAYS)),
        }
    }
}

/// Union of all view windows, queried once per sub-calendar.
pub fn fetch_window(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    [CalendarView::Flat, CalendarView::Week, CalendarView::Agenda]
        .iter()
        .map(|v| v.window(today))
        .fold((today, today), |(lo, hi), (s, e)| (lo.min(s), hi.max(e)))
}

#[derive(Debug, Deserialize)]
struct EventList {
    #[serde(default)]
    items: Vec<RawEvent>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    location: Option<String>,
    start: Option<EventTime>,
    #[serde(default)]
    end: Option<EventTime>,
}

#[derive(Debug, Deserialize)]
struct EventTime {
    #[serde(rename = "dateTime", default)]
    date_time: Option<String>,
    #[serde(default)]
    date: Option<String>,
}

/// Events gathered from the enabled sub-calendars in one cycle.
#[derive(Debug, Clone, Default)]
pub struct CalendarFetch {
    pub events: Vec<CalendarEvent>,
    /// Names of the sub-calendars whose request failed.
    pub failed: Vec<String>,
}

impl CalendarFetch {
    /// Every enabled sub-calendar answered. Only such a result may replace
    /// the last-known-good cache.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Query every enabled sub-calendar. Individual failures are logged and
/// recorded in [`CalendarFetch::failed`]; the call fails only when every
/// enabled sub-calendar failed.
pub async fn fetch_events(
    http: &dyn HttpFetch,
    cfg: &CalendarConfig,
    credentials: &dyn CredentialProvider,
    now: DateTime<Local>,
) -> FetchResult<CalendarFetch> {
    if !cfg.enabled {
        return Err(FetchError::unconfigured("calendar disabled"));
    }
    let enabled: Vec<&SubCalendar> = cfg.calendars.iter().filter(|c| c.enabled).collect();
    if enabled.is_empty() {
        return Err(FetchError::unconfigured("no enabled calendars"));
    }
    let token = credentials
        .access_token()
        .ok_or_else(|| FetchError::unconfigured("calendar credentials unavailable"))?;

    let (start, end) = fetch_window(now.date_naive());
    let time_min = local_midnight_rfc3339(start);
    let time_max = local_midnight_rfc3339(end);

    let mut fetched = CalendarFetch::default();
    let mut last_err = None;
    let mut succeeded = 0usize;
    for cal in enabled {
        let req = Request::get(events_url(&cal.id)?)
            .query("timeMin", &time_min)
            .query("timeMax", &time_max)
            .query("singleEvents", "true")
            .query("orderBy", "startTime")
            .query("maxResults", 250)
            .bearer(token.clone());
        match http.get_json(&req).await.and_then(|body| parse_events(body, cal)) {
            Ok(mut v) => {
                succeeded += 1;
                fetched.events.append(&mut v);
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    source = "calendar",
                    calendar = %cal.name,
                    stage = "fetch",
                    "sub-calendar fetch failed"
                );
                fetched.failed.push(cal.name.clone());
                last_err = Some(e);
            }
        }
    }

    match (succeeded, last_err) {
        (0, Some(e)) => Err(e),
        _ => Ok(fetched),
    }
}

/// Normalize one sub-calendar's event list, tagging every event with the
/// calendar's name and color. Cancelled and start-less events are skipped.
pub fn parse_events(body: Value, cal: &SubCalendar) -> FetchResult<Vec<CalendarEvent>> {
    let list: EventList = decode("calendar events", body)?;
    let mut out = Vec::with_capacity(list.items.len());
    for item in list.items {
        if item.status.as_deref() == Some("cancelled") {
            continue;
        }
        let Some((start, all_day)) = item.start.as_ref().and_then(parse_event_time) else {
            tracing::debug!(summary = ?item.summary, "calendar event without usable start");
            continue;
        };
        let end = item
            .end
            .as_ref()
            .and_then(parse_event_time)
            .map(|(e, _)| e)
            .unwrap_or(start);
        out.push(CalendarEvent {
            summary: item
                .summary
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "(No title)".to_string()),
            start,
            end,
            all_day,
            start_time: clock(start, all_day),
            end_time: clock(end, all_day),
            location: item.location.unwrap_or_default(),
            calendar_name: cal.name.clone(),
            calendar_color: cal.color.clone(),
        });
    }
    Ok(out)
}

/// All-day events carry a bare date; timed events carry a time component.
fn parse_event_time(t: &EventTime) -> Option<(NaiveDateTime, bool)> {
    if let Some(dt) = t.date_time.as_deref() {
        let parsed = DateTime::parse_from_rfc3339(dt).ok()?;
        return Some((parsed.with_timezone(&Local).naive_local(), false));
    }
    let d = NaiveDate::parse_from_str(t.date.as_deref()?, "%Y-%m-%d").ok()?;
    Some((d.and_time(NaiveTime::MIN), true))
}

fn clock(t: NaiveDateTime, all_day: bool) -> String {
    if all_day {
        String::new()
    } else {
        t.format("%H:%M").to_string()
    }
}

fn local_midnight_rfc3339(d: NaiveDate) -> String {
    d.and_time(NaiveTime::MIN)
        .and_local_timezone(Local)
        .earliest()
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| format!("{d}T00:00:00Z"))
}

/// `.../calendars/{id}/events` with the id percent-encoded as one segment.
fn events_url(calendar_id: &str) -> FetchResult<String> {
    let mut url = reqwest::Url::parse(EVENTS_BASE)
        .map_err(|e| FetchError::invalid(format!("calendar url: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| FetchError::invalid("calendar url has no path"))?
        .push(calendar_id)
        .push("events");
    Ok(url.into())
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

pub fn build_views(events: &[CalendarEvent], today: NaiveDate, max_events: usize) -> CalendarData {
    CalendarData {
        events: flat_list(events, today, max_events),
        week: week_grid(events, today),
        agenda: agenda(events, today),
    }
}

/// All calendars merged, sorted by (start, summary), capped.
pub fn flat_list(events: &[CalendarEvent], today: NaiveDate, max_events: usize) -> Vec<CalendarEvent> {
    let (start, end) = CalendarView::Flat.window(today);
    let mut out: Vec<CalendarEvent> = events
        .iter()
        .filter(|e| e.date() >= start && e.date() < end)
        .cloned()
        .collect();
    out.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.summary.cmp(&b.summary)));
    out.truncate(max_events);
    out
}

/// Exactly seven buckets, Monday first, all-day and timed kept apart.
pub fn week_grid(events: &[CalendarEvent], today: NaiveDate) -> Vec<WeekDay> {
    let (monday, _) = CalendarView::Week.window(today);
    (0..7)
        .map(|i| {
            let date = monday + Duration::days(i);
            let (all_day, timed): (Vec<CalendarEvent>, Vec<CalendarEvent>) = events
                .iter()
                .filter(|e| e.date() == date)
                .cloned()
                .partition(|e| e.all_day);
            WeekDay {
                date,
                day_name: date.format("%a").to_string(),
                day_number: date.day(),
                is_today: date == today,
                all_day,
                timed,
            }
        })
        .collect()
}

/// Five day buckets (Today, Tomorrow, weekday names). An event goes to
/// bucket `d` when it starts `d` whole days after today; anything outside
/// `0..5` is dropped.
pub fn agenda(events: &[CalendarEvent], today: NaiveDate) -> Vec<AgendaDay> {
    let mut buckets: Vec<AgendaDay> = (0..AGENDA_DAYS)
        .map(|i| {
            let date = today + Duration::days(i);
            let label = match i {
                0 => "Today".to_string(),
                1 => "Tomorrow".to_string(),
                _ => date.format("%A").to_string(),
            };
            AgendaDay {
                label,
                date,
                events: Vec::new(),
            }
        })
        .collect();

    for e in events {
        let offset = (e.date() - today).num_days();
        if (0..AGENDA_DAYS).contains(&offset) {
            buckets[offset as usize].events.push(e.clone());
        }
    }
    buckets
}
