// src/aggregator.rs
//! One generation cycle: every source through fetch → cache → mock, then
//! the snapshot.
//!
//! No source failure escapes this module; each one is absorbed by the
//! fallback chain and logged with the source name and stage.

use chrono::{DateTime, Local};

use crate::cache::CacheStore;
use crate::context::RuntimeContext;
use crate::error::{FetchError, FetchResult};
use crate::memo::TtlCache;
use crate::mock;
use crate::model::{CalendarEvent, CourseData, Origin, SourceKind, Sourced};
use crate::snapshot::{DisplayFields, Snapshot};
use crate::sources::canvas::CanvasViews;
use crate::sources::traffic::{memo_ttl, DurationMemo};
use crate::sources::{air_quality, calendar, canvas, forecast, geocoding, rss, traffic, weather};

/// Pick the first usable result in the order live, cached, mock.
///
/// `Unconfigured` goes straight to mock; every other error consults the
/// cache first.
pub fn resolve<T>(
    source: SourceKind,
    live: FetchResult<T>,
    cached: impl FnOnce() -> Option<T>,
    mock: impl FnOnce() -> T,
) -> Sourced<T> {
    let err = match live {
        Ok(data) => return Sourced::live(source, data),
        Err(e) => e,
    };

    if err.allows_cache() {
        tracing::warn!(
            source = source.name(),
            stage = "fetch",
            kind = err.kind(),
            error = %err,
            "live fetch failed"
        );
        if let Some(data) = cached() {
            tracing::info!(source = source.name(), stage = "cache", "using cached data");
            return Sourced {
                source,
                origin: Origin::Cached,
                data,
            };
        }
        tracing::info!(source = source.name(), stage = "mock", "no usable cache, using mock data");
    } else {
        tracing::debug!(source = source.name(), reason = %err, "source unconfigured, using mock data");
    }

    Sourced {
        source,
        origin: Origin::Mock,
        data: mock(),
    }
}

pub struct Aggregator {
    ctx: RuntimeContext,
    calendar_cache: CacheStore<CalendarEvent>,
    traffic_memo: DurationMemo,
}

impl Aggregator {
    pub fn new(ctx: RuntimeContext) -> Self {
        let calendar_cache = CacheStore::new(ctx.config.paths.cache_file.clone());
        Self {
            ctx,
            calendar_cache,
            traffic_memo: TtlCache::new(memo_ttl()),
        }
    }

    pub fn context(&self) -> &RuntimeContext {
        &self.ctx
    }

    fn mock_mode_error() -> FetchError {
        FetchError::unconfigured("mock mode")
    }

    /// Run every source once and assemble the snapshot. Never fails.
    pub async fn collect(&mut self, now: DateTime<Local>) -> Snapshot {
        let ctx = &self.ctx;
        let cfg = &ctx.config;
        let http = ctx.http.as_ref();
        let mock_mode = ctx.mock_mode;
        let today = now.date_naive();

        // Weather, forecast and air quality share one geocoding lookup.
        let geo = if mock_mode {
            Err(Self::mock_mode_error())
        } else {
            geocoding::resolve(http, &cfg.weather).await
        };
        if let Err(e) = &geo {
            if e.allows_cache() {
                tracing::warn!(source = "geocoding", stage = "fetch", error = %e, "location lookup failed");
            }
        }

        let live_weather = if mock_mode {
            Err(Self::mock_mode_error())
        } else {
            weather::fetch(http, &cfg.weather, &geo, now).await
        };
        let weather = resolve(SourceKind::Weather, live_weather, || None, || {
            mock::weather(&cfg.weather, now)
        });

        let live_forecast = if mock_mode {
            Err(Self::mock_mode_error())
        } else {
            forecast::fetch(http, &cfg.weather, &geo, now).await
        };
        let forecast = resolve(SourceKind::Forecast, live_forecast, || None, || {
            mock::forecast(cfg.weather.units, now)
        });

        let live_aq = if mock_mode {
            Err(Self::mock_mode_error())
        } else {
            air_quality::fetch(http, &cfg.air_quality, &cfg.weather, &geo).await
        };
        let air_quality = resolve(SourceKind::AirQuality, live_aq, || None, || mock::air_quality(now));

        let live_events = if mock_mode {
            Err(Self::mock_mode_error())
        } else {
            calendar::fetch_events(http, &cfg.calendar, ctx.credentials.as_ref(), now).await
        };
        // a partial result is shown but never replaces the last complete one
        let live_events = live_events.map(|fetched| {
            if fetched.is_complete() {
                self.calendar_cache.save(&fetched.events, now);
            } else {
                tracing::warn!(
                    source = "calendar",
                    stage = "cache",
                    failed = ?fetched.failed,
                    "partial calendar result, cache left untouched"
                );
            }
            fetched.events
        });
        let calendar_cache = &self.calendar_cache;
        let calendar = resolve(
            SourceKind::Calendar,
            live_events,
            || calendar_cache.load(now),
            || mock::calendar_events(today),
        )
        .map(|events| calendar::build_views(&events, today, cfg.calendar.max_events));

        let views = if mock_mode {
            CanvasViews::failed(Self::mock_mode_error())
        } else {
            canvas::fetch_views(http, &cfg.canvas, now).await
        };
        let courses = CourseData {
            assignments: resolve(SourceKind::Assignments, views.assignments, || None, || {
                mock::assignments(now)
            }),
            announcements: resolve(SourceKind::Announcements, views.announcements, || None, || {
                mock::announcements(now)
            }),
            grading_queue: resolve(SourceKind::GradingQueue, views.grading_queue, || None, || {
                mock::grading_queue(now)
            }),
            at_risk: resolve(SourceKind::AtRiskStudents, views.at_risk, || None, mock::at_risk),
            discussions: resolve(SourceKind::Discussions, views.discussions, || None, mock::discussions),
            performance: resolve(SourceKind::Performance, views.performance, || None, mock::performance),
        };

        let live_traffic = if mock_mode {
            Err(Self::mock_mode_error())
        } else {
            traffic::fetch(http, &cfg.traffic, &mut self.traffic_memo, now).await
        };
        let traffic = resolve(SourceKind::Traffic, live_traffic, || None, || mock::traffic(now));

        let live_articles = if mock_mode {
            Err(Self::mock_mode_error())
        } else {
            rss::fetch(http, &cfg.rss).await
        };
        let articles = resolve(SourceKind::Rss, live_articles, || None, mock::articles);

        let display = DisplayFields::derive(&weather.data, now);
        let snapshot = Snapshot {
            generated_at: now,
            config: cfg.display.clone(),
            mock_mode,
            weather,
            forecast,
            air_quality,
            calendar,
            courses,
            traffic,
            articles,
            display,
        };

        let live = snapshot
            .origins()
            .iter()
            .filter(|(_, o)| *o == Origin::Live)
            .count();
        tracing::info!(live, sections = snapshot.origins().len(), mock_mode, "snapshot assembled");
        snapshot
    }
}
