// tests/canvas_views.rs
mod common;

use std::sync::Arc;

use chrono::{DateTime, Duration, Local};
use common::{context, quiet_config, wednesday_morning, StubHttp};
use kiosk_dashboard::config::DashboardConfig;
use kiosk_dashboard::model::{ActivityLevel, Origin, Priority};
use kiosk_dashboard::{Aggregator, FetchError};
use serde_json::{json, Value};

fn canvas_config(dir: &std::path::Path) -> DashboardConfig {
    let mut cfg = quiet_config(dir);
    cfg.canvas.enabled = true;
    cfg.canvas.base_url = "https://canvas.test/".into();
    cfg.canvas.api_token = "secret".into();
    cfg
}

fn iso(t: DateTime<Local>) -> String {
    t.to_rfc3339()
}

fn assignments(now: DateTime<Local>) -> Value {
    json!([
        {"id": 1, "name": "Quiz 4", "due_at": iso(now + Duration::hours(12)), "points_possible": 10.0,
         "needs_grading_count": 5},
        {"id": 2, "name": "Lab 2", "due_at": iso(now + Duration::days(2)), "points_possible": 20.0,
         "needs_grading_count": 5},
        {"id": 4, "name": "Essay", "due_at": iso(now + Duration::days(10)), "points_possible": 50.0,
         "needs_grading_count": 5},
        {"id": 3, "name": "Quiz 3", "due_at": iso(now - Duration::days(2)), "points_possible": 10.0,
         "needs_grading_count": 0},
        {"id": 5, "name": "Quiz 2", "due_at": iso(now - Duration::days(9)), "points_possible": 10.0}
    ])
}

fn full_stub(now: DateTime<Local>) -> StubHttp {
    StubHttp::new()
        .json("/api/v1/courses", json!([{"id": 7, "name": "Biology 101"}, {"id": 8, "name": "Other"}]))
        .json("/courses/7/assignments", assignments(now))
        .json("/courses/8/assignments", json!([]))
        .json(
            "/api/v1/announcements",
            json!([
                {"title": "Old", "posted_at": iso(now - Duration::days(4)), "message": "<p>old</p>",
                 "context_code": "course_7"},
                {"title": "New", "posted_at": iso(now - Duration::hours(2)), "message": "<b>new</b>",
                 "context_code": "course_7"}
            ]),
        )
        .json(
            "/courses/7/students/submissions",
            json!([
                {"user_id": 1, "missing": true, "user": {"name": "Ada"}},
                {"user_id": 1, "missing": true, "user": {"name": "Ada"}},
                {"user_id": 2, "late": true, "user": {"name": "Ben"}}
            ]),
        )
        .json("/courses/8/students/submissions", json!([]))
        .json(
            "/courses/7/discussion_topics",
            json!([
                {"title": "Help", "unread_count": 4, "discussion_subentry_count": 9},
                {"title": "Quiet", "unread_count": 0, "discussion_subentry_count": 1}
            ]),
        )
        .json("/courses/8/discussion_topics", json!([]))
        .json(
            "/assignments/3/submissions",
            json!([
                {"user_id": 1, "score": 9.5},
                {"user_id": 2, "score": 7.0},
                {"user_id": 3, "score": 5.5},
                {"user_id": 4}
            ]),
        )
}

#[tokio::test]
async fn grading_queue_priorities_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let now = wednesday_morning();
    let http = Arc::new(full_stub(now));

    let mut agg = Aggregator::new(context(canvas_config(dir.path()), http.clone(), None));
    let snap = agg.collect(now).await;
    let c = &snap.courses;

    assert_eq!(c.grading_queue.origin, Origin::Live);
    let got: Vec<(&str, Priority)> = c
        .grading_queue
        .data
        .iter()
        .map(|g| (g.title.as_str(), g.priority))
        .collect();
    assert_eq!(
        got,
        vec![
            ("Quiz 4", Priority::High),
            ("Lab 2", Priority::Medium),
            ("Essay", Priority::Low)
        ]
    );
    assert!(c.grading_queue.data.iter().all(|g| g.needs_grading == 5));

    // upcoming: within 7 days, soonest first
    let titles: Vec<&str> = c.assignments.data.iter().map(|a| a.title.as_str()).collect();
    assert_eq!(titles, vec!["Quiz 4", "Lab 2"]);

    assert_eq!(c.announcements.data[0].title, "New");
    assert_eq!(c.announcements.data[0].message, "new");
    assert_eq!(c.announcements.data[0].course, "Biology 101");

    assert_eq!(c.at_risk.data.len(), 1);
    assert_eq!(c.at_risk.data[0].name, "Ada");

    assert_eq!(c.discussions.data.len(), 1);
    assert_eq!(c.discussions.data[0].activity, ActivityLevel::High);

    let p = &c.performance.data;
    assert_eq!(p.assignment, "Quiz 3");
    assert_eq!(p.graded, 3);
    assert_eq!(p.mean, 7.3);
    assert_eq!(p.max, 9.5);
    assert_eq!(p.min, 5.5);
    assert_eq!((p.histogram.a, p.histogram.c, p.histogram.f), (1, 1, 1));

    // every request carries the token against the api root
    assert!(http.calls().iter().all(|u| u.starts_with("https://canvas.test/api/v1/")));
}

#[tokio::test]
async fn one_failing_view_falls_back_alone() {
    let dir = tempfile::tempdir().unwrap();
    let now = wednesday_morning();
    let http = Arc::new(
        StubHttp::new()
            .fail("/api/v1/announcements", FetchError::Transport("503".into()))
            .json("/api/v1/courses", json!([{"id": 7, "name": "Biology 101"}]))
            .json("/courses/7/assignments", assignments(now))
            .json("/courses/7/students/submissions", json!([]))
            .json("/courses/7/discussion_topics", json!([]))
            .json("/assignments/3/submissions", json!([])),
    );

    let mut agg = Aggregator::new(context(canvas_config(dir.path()), http, None));
    let snap = agg.collect(now).await;
    let c = &snap.courses;

    assert_eq!(c.announcements.origin, Origin::Mock);
    assert!(!c.announcements.data.is_empty());
    assert_eq!(c.assignments.origin, Origin::Live);
    assert_eq!(c.grading_queue.origin, Origin::Live);
    assert_eq!(c.at_risk.origin, Origin::Live);
    assert!(c.at_risk.data.is_empty());
    assert_eq!(c.performance.origin, Origin::Live);
    assert_eq!(c.performance.data.graded, 0);
}

#[tokio::test]
async fn disabled_canvas_is_all_mock_without_requests() {
    let dir = tempfile::tempdir().unwrap();
    let http = Arc::new(StubHttp::new());
    let mut agg = Aggregator::new(context(quiet_config(dir.path()), http.clone(), None));
    let snap = agg.collect(wednesday_morning()).await;
    let c = &snap.courses;

    for origin in [
        c.assignments.origin,
        c.announcements.origin,
        c.grading_queue.origin,
        c.at_risk.origin,
        c.discussions.origin,
        c.performance.origin,
    ] {
        assert_eq!(origin, Origin::Mock);
    }
    assert!(http.calls().is_empty());
}

#[tokio::test]
async fn course_list_failure_fails_every_view() {
    let dir = tempfile::tempdir().unwrap();
    let http = Arc::new(StubHttp::new().route(
        "/api/v1/courses",
        common::Reply::Json(json!({"errors": [{"message": "unauthorized"}]})),
    ));
    let mut agg = Aggregator::new(context(canvas_config(dir.path()), http.clone(), None));
    let snap = agg.collect(wednesday_morning()).await;

    assert_eq!(snap.courses.assignments.origin, Origin::Mock);
    assert_eq!(snap.courses.performance.origin, Origin::Mock);
    assert_eq!(http.calls().len(), 1);
}

#[tokio::test]
async fn course_filter_sees_every_page_of_courses() {
    let dir = tempfile::tempdir().unwrap();
    let now = wednesday_morning();
    let mut cfg = canvas_config(dir.path());
    cfg.canvas.course_ids = vec![8];
    let http = Arc::new(
        StubHttp::new()
            .page(
                "/api/v1/courses",
                json!([{"id": 7, "name": "Biology 101"}]),
                "https://canvas.test/api/v1/courses?enrollment_state=active&page=2&per_page=50",
            )
            .json("courses?enrollment_state=active&page=2&per_page=50", json!([{"id": 8, "name": "Chemistry"}]))
            .json("/courses/8/assignments", assignments(now)),
    );

    let mut agg = Aggregator::new(context(cfg, http.clone(), None));
    let snap = agg.collect(now).await;

    let upcoming = &snap.courses.assignments;
    assert_eq!(upcoming.origin, Origin::Live);
    assert!(!upcoming.data.is_empty());
    assert!(upcoming.data.iter().all(|a| a.course == "Chemistry"));
    assert_eq!(http.count("page=2"), 1);
    assert_eq!(http.count("/courses/7/"), 0);
}

#[tokio::test]
async fn next_link_to_another_host_is_not_followed() {
    let dir = tempfile::tempdir().unwrap();
    let now = wednesday_morning();
    let http = Arc::new(
        StubHttp::new()
            .page(
                "/api/v1/courses",
                json!([{"id": 7, "name": "Biology 101"}]),
                "https://elsewhere.test/api/v1/courses?page=2",
            )
            .json("/courses/7/assignments", assignments(now)),
    );

    let mut agg = Aggregator::new(context(canvas_config(dir.path()), http.clone(), None));
    let snap = agg.collect(now).await;

    assert_eq!(snap.courses.assignments.origin, Origin::Live);
    assert_eq!(http.count("elsewhere.test"), 0);
}
