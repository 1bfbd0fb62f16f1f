// src/sources/canvas.rs
//! Canvas LMS: six course views built from a handful of REST calls.
//!
//! Courses and assignments are fetched once per cycle and shared by the
//! assignment, grading-queue and performance views. Each view keeps its own
//! `FetchResult` so the aggregator can fall back per view.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Local};
use serde::Deserialize;
use serde_json::Value;

use crate::config::CanvasConfig;
use crate::error::{FetchError, FetchResult};
use crate::http::{HttpFetch, Request};
use crate::model::{
    ActivityLevel, Announcement, Assignment, AtRiskStudent, DiscussionHotspot, GradeHistogram,
    GradingItem, PerformanceSummary, Priority,
};
use crate::sources::decode;
use crate::text::{round1, strip_html, truncate_ellipsis};

pub const MISSING_THRESHOLD: u32 = 2;
pub const LATE_THRESHOLD: u32 = 3;
const ANNOUNCEMENT_CHARS: usize = 150;
const DUE_FORMAT: &str = "%a %b %-d, %H:%M";

#[derive(Debug, Clone, Deserialize)]
pub struct Course {
    pub id: u64,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawAssignment {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub due_at: Option<String>,
    #[serde(default)]
    pub points_possible: Option<f64>,
    #[serde(default)]
    pub needs_grading_count: Option<u32>,
    #[serde(default)]
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawAnnouncement {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub posted_at: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub context_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSubmission {
    pub user_id: u64,
    #[serde(default)]
    pub missing: bool,
    #[serde(default)]
    pub late: bool,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub user: Option<SubmissionUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionUser {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTopic {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub unread_count: Option<u32>,
    #[serde(default)]
    pub discussion_subentry_count: Option<u32>,
    #[serde(default)]
    pub last_reply_at: Option<String>,
}

/// One result per view; each view falls back on its own.
#[derive(Debug)]
pub struct CanvasViews {
    pub assignments: FetchResult<Vec<Assignment>>,
    pub announcements: FetchResult<Vec<Announcement>>,
    pub grading_queue: FetchResult<Vec<GradingItem>>,
    pub at_risk: FetchResult<Vec<AtRiskStudent>>,
    pub discussions: FetchResult<Vec<DiscussionHotspot>>,
    pub performance: FetchResult<PerformanceSummary>,
}

impl CanvasViews {
    pub fn failed(e: FetchError) -> Self {
        Self {
            assignments: Err(e.clone()),
            announcements: Err(e.clone()),
            grading_queue: Err(e.clone()),
            at_risk: Err(e.clone()),
            discussions: Err(e.clone()),
            performance: Err(e),
        }
    }
}

/// Upper bound on pages read from one listing endpoint.
pub const MAX_PAGES: usize = 20;

pub struct CanvasClient<'a> {
    http: &'a dyn HttpFetch,
    api: String,
    token: String,
}

impl<'a> CanvasClient<'a> {
    pub fn new(http: &'a dyn HttpFetch, cfg: &CanvasConfig) -> FetchResult<Self> {
        if !cfg.is_configured() {
            return Err(FetchError::unconfigured("canvas disabled or missing token"));
        }
        Ok(Self {
            http,
            api: format!("{}/api/v1", cfg.base_url.trim_end_matches('/')),
            token: cfg.api_token.clone(),
        })
    }

    fn request(&self, path: &str) -> Request {
        Request::get(format!("{}{path}", self.api)).bearer(self.token.clone())
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, what: &str, req: Request) -> FetchResult<T> {
        let body: Value = self.http.get_json(&req).await?;
        decode(what, body)
    }

    /// Every page of a listing, following `Link` headers up to [`MAX_PAGES`].
    /// Next links outside the configured API root are not followed.
    async fn get_all<T: serde::de::DeserializeOwned>(&self, what: &str, first: Request) -> FetchResult<Vec<T>> {
        let mut out = Vec::new();
        let mut req = first;
        for page_no in 1..=MAX_PAGES {
            let page = self.http.get_json_page(&req).await?;
            let mut items: Vec<T> = decode(what, page.body)?;
            out.append(&mut items);
            let Some(next) = page.next else {
                return Ok(out);
            };
            if !next.starts_with(&self.api) {
                tracing::warn!(source = "canvas", what, next = %next, "next page outside api root, stopping");
                return Ok(out);
            }
            if page_no == MAX_PAGES {
                tracing::warn!(source = "canvas", what, pages = MAX_PAGES, "listing truncated");
                break;
            }
            req = Request::get(next).bearer(self.token.clone());
        }
        Ok(out)
    }

    pub async fn courses(&self, only: &[u64]) -> FetchResult<Vec<Course>> {
        let req = self
            .request("/courses")
            .query("enrollment_state", "active")
            .query("per_page", 50);
        let mut courses: Vec<Course> = self.get_all("courses", req).await?;
        if !only.is_empty() {
            courses.retain(|c| only.contains(&c.id));
        }
        Ok(courses)
    }

    pub async fn assignments(&self, course: &Course) -> FetchResult<Vec<RawAssignment>> {
        let req = self
            .request(&format!("/courses/{}/assignments", course.id))
            .query("order_by", "due_at")
            .query("per_page", 100);
        self.get_all("assignments", req).await
    }

    pub async fn announcements(&self, courses: &[Course], limit: usize) -> FetchResult<Vec<RawAnnouncement>> {
        let mut req = self.request("/announcements").query("per_page", limit.max(10));
        for c in courses {
            req = req.query("context_codes[]", format!("course_{}", c.id));
        }
        self.get("announcements", req).await
    }

    pub async fn student_submissions(&self, course: &Course) -> FetchResult<Vec<RawSubmission>> {
        let req = self
            .request(&format!("/courses/{}/students/submissions", course.id))
            .query("student_ids[]", "all")
            .query("include[]", "user")
            .query("per_page", 100);
        self.get_all("student submissions", req).await
    }

    pub async fn assignment_submissions(&self, course_id: u64, assignment_id: u64) -> FetchResult<Vec<RawSubmission>> {
        let req = self
            .request(&format!("/courses/{course_id}/assignments/{assignment_id}/submissions"))
            .query("per_page", 100);
        self.get_all("assignment submissions", req).await
    }

    pub async fn discussion_topics(&self, course: &Course) -> FetchResult<Vec<RawTopic>> {
        let req = self
            .request(&format!("/courses/{}/discussion_topics", course.id))
            .query("per_page", 50);
        self.get_all("discussion topics", req).await
    }
}

/// Fetch every view. Shared prerequisites (client, course list) failing
/// fails all six views with the same error.
pub async fn fetch_views(http: &dyn HttpFetch, cfg: &CanvasConfig, now: DateTime<Local>) -> CanvasViews {
    let client = match CanvasClient::new(http, cfg) {
        Ok(c) => c,
        Err(e) => return CanvasViews::failed(e),
    };
    let courses = match client.courses(&cfg.course_ids).await {
        Ok(c) => c,
        Err(e) => return CanvasViews::failed(e),
    };

    let mut course_assignments: FetchResult<Vec<(Course, RawAssignment)>> = Ok(Vec::new());
    for course in &courses {
        match client.assignments(course).await {
            Ok(list) => {
                if let Ok(acc) = course_assignments.as_mut() {
                    acc.extend(list.into_iter().map(|a| (course.clone(), a)));
                }
            }
            Err(e) => {
                course_assignments = Err(e);
                break;
            }
        }
    }

    let assignments = course_assignments
        .as_ref()
        .map(|items| upcoming_assignments(items, now, cfg.days_ahead, cfg.max_assignments))
        .map_err(Clone::clone);
    let grading_queue = course_assignments
        .as_ref()
        .map(|items| grading_queue(items, now))
        .map_err(Clone::clone);

    let performance = match &course_assignments {
        Ok(items) => match most_recent_past(items, now) {
            Some((course, a)) => client
                .assignment_submissions(course.id, a.id)
                .await
                .map(|subs| performance_summary(course, a, &subs)),
            None => Ok(PerformanceSummary::default()),
        },
        Err(e) => Err(e.clone()),
    };

    let announcements = client
        .announcements(&courses, cfg.max_announcements)
        .await
        .map(|raw| recent_announcements(&raw, &courses, cfg.max_announcements));

    let mut at_risk = Ok(Vec::new());
    let mut discussions = Ok(Vec::new());
    for course in &courses {
        if let Ok(acc) = at_risk.as_mut() {
            match client.student_submissions(course).await {
                Ok(subs) => acc.extend(at_risk_students(course, &subs)),
                Err(e) => at_risk = Err(e),
            }
        }
        if let Ok(acc) = discussions.as_mut() {
            match client.discussion_topics(course).await {
                Ok(topics) => acc.extend(discussion_hotspots(course, &topics)),
                Err(e) => discussions = Err(e),
            }
        }
    }
    if let Ok(list) = discussions.as_mut() {
        sort_hotspots(list);
    }

    CanvasViews {
        assignments,
        announcements,
        grading_queue,
        at_risk,
        discussions,
        performance,
    }
}

// ---------------------------------------------------------------------------
// Normalizers
// ---------------------------------------------------------------------------

fn parse_time(s: Option<&str>) -> Option<DateTime<Local>> {
    DateTime::parse_from_rfc3339(s?)
        .ok()
        .map(|dt| dt.with_timezone(&Local))
}

fn course_name(c: &Course) -> String {
    if c.name.is_empty() {
        format!("Course {}", c.id)
    } else {
        c.name.clone()
    }
}

/// High when due within a day (or overdue), medium within three days,
/// otherwise (or undated) low.
pub fn classify_priority(due: Option<DateTime<Local>>, now: DateTime<Local>) -> Priority {
    match due {
        None => Priority::Low,
        Some(d) => {
            let left = d - now;
            if left <= Duration::days(1) {
                Priority::High
            } else if left <= Duration::days(3) {
                Priority::Medium
            } else {
                Priority::Low
            }
        }
    }
}

/// Assignments due between now and `days_ahead` days out, soonest first.
pub fn upcoming_assignments(
    items: &[(Course, RawAssignment)],
    now: DateTime<Local>,
    days_ahead: i64,
    max: usize,
) -> Vec<Assignment> {
    let horizon = now + Duration::days(days_ahead);
    let mut out: Vec<Assignment> = items
        .iter()
        .filter_map(|(course, a)| {
            let due = parse_time(a.due_at.as_deref())?;
            (due >= now && due <= horizon).then(|| Assignment {
                title: a.name.clone(),
                course: course_name(course),
                due_at: due,
                due_display: due.format(DUE_FORMAT).to_string(),
                points_possible: a.points_possible.unwrap_or(0.0),
                priority: classify_priority(Some(due), now),
                url: a.html_url.clone().unwrap_or_default(),
            })
        })
        .collect();
    out.sort_by_key(|a| a.due_at);
    out.truncate(max);
    out
}

/// Newest first, HTML stripped, truncated.
pub fn recent_announcements(raw: &[RawAnnouncement], courses: &[Course], max: usize) -> Vec<Announcement> {
    let names: HashMap<String, String> = courses
        .iter()
        .map(|c| (format!("course_{}", c.id), course_name(c)))
        .collect();
    let mut out: Vec<Announcement> = raw
        .iter()
        .filter_map(|a| {
            let posted = parse_time(a.posted_at.as_deref())?;
            Some(Announcement {
                title: a.title.clone(),
                course: a
                    .context_code
                    .as_ref()
                    .and_then(|c| names.get(c).cloned())
                    .unwrap_or_default(),
                posted_at: posted,
                posted_display: posted.format("%b %-d").to_string(),
                message: truncate_ellipsis(
                    &strip_html(a.message.as_deref().unwrap_or_default()),
                    ANNOUNCEMENT_CHARS,
                ),
            })
        })
        .collect();
    out.sort_by(|a, b| b.posted_at.cmp(&a.posted_at));
    out.truncate(max);
    out
}

/// Assignments with ungraded submissions, most urgent first.
pub fn grading_queue(items: &[(Course, RawAssignment)], now: DateTime<Local>) -> Vec<GradingItem> {
    let mut out: Vec<GradingItem> = items
        .iter()
        .filter(|(_, a)| a.needs_grading_count.unwrap_or(0) > 0)
        .map(|(course, a)| {
            let due = parse_time(a.due_at.as_deref());
            GradingItem {
                title: a.name.clone(),
                course: course_name(course),
                due_at: due,
                due_display: due.map(|d| d.format(DUE_FORMAT).to_string()).unwrap_or_default(),
                needs_grading: a.needs_grading_count.unwrap_or(0),
                priority: classify_priority(due, now),
            }
        })
        .collect();
    out.sort_by_key(|g| (g.priority, g.due_at.map_or(i64::MAX, |d| d.timestamp())));
    out
}

/// Students with at least two missing or three late submissions.
pub fn at_risk_students(course: &Course, subs: &[RawSubmission]) -> Vec<AtRiskStudent> {
    // user id -> (name, missing, late)
    let mut per_student: BTreeMap<u64, (String, u32, u32)> = BTreeMap::new();
    for s in subs {
        let entry = per_student.entry(s.user_id).or_insert_with(|| {
            let name = s
                .user
                .as_ref()
                .map(|u| u.name.clone())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| format!("Student {}", s.user_id));
            (name, 0, 0)
        });
        if s.missing {
            entry.1 += 1;
        }
        if s.late {
            entry.2 += 1;
        }
    }

    let mut out: Vec<AtRiskStudent> = per_student
        .into_values()
        .filter(|(_, missing, late)| *missing >= MISSING_THRESHOLD || *late >= LATE_THRESHOLD)
        .map(|(name, missing, late)| {
            let mut reasons = Vec::new();
            if missing >= MISSING_THRESHOLD {
                reasons.push(format!("{missing} missing"));
            }
            if late >= LATE_THRESHOLD {
                reasons.push(format!("{late} late"));
            }
            AtRiskStudent {
                name,
                course: course_name(course),
                missing,
                late,
                reason: reasons.join(", "),
            }
        })
        .collect();
    out.sort_by(|a, b| b.missing.cmp(&a.missing).then(b.late.cmp(&a.late)));
    out
}

pub fn activity_level(unread: u32) -> ActivityLevel {
    if unread > 3 {
        ActivityLevel::High
    } else if unread > 1 {
        ActivityLevel::Medium
    } else {
        ActivityLevel::Low
    }
}

/// Topics with unread replies or more than five posts.
pub fn discussion_hotspots(course: &Course, topics: &[RawTopic]) -> Vec<DiscussionHotspot> {
    topics
        .iter()
        .filter_map(|t| {
            let unread = t.unread_count.unwrap_or(0);
            let posts = t.discussion_subentry_count.unwrap_or(0);
            (unread > 0 || posts > 5).then(|| DiscussionHotspot {
                title: t.title.clone(),
                course: course_name(course),
                unread,
                posts,
                activity: activity_level(unread),
                last_reply: parse_time(t.last_reply_at.as_deref())
                    .map(|d| d.format("%b %-d, %H:%M").to_string())
                    .unwrap_or_default(),
            })
        })
        .collect()
}

pub fn sort_hotspots(list: &mut [DiscussionHotspot]) {
    list.sort_by(|a, b| b.unread.cmp(&a.unread).then(b.posts.cmp(&a.posts)));
}

/// The assignment with the latest due date that has already passed.
pub fn most_recent_past(
    items: &[(Course, RawAssignment)],
    now: DateTime<Local>,
) -> Option<(&Course, &RawAssignment)> {
    items
        .iter()
        .filter_map(|(c, a)| {
            let due = parse_time(a.due_at.as_deref())?;
            (due < now).then_some((due, c, a))
        })
        .max_by_key(|(due, _, _)| *due)
        .map(|(_, c, a)| (c, a))
}

/// Letter bucket for a percentage score.
pub fn letter_bucket(percent: f64, h: &mut GradeHistogram) {
    if percent >= 90.0 {
        h.a += 1;
    } else if percent >= 80.0 {
        h.b += 1;
    } else if percent >= 70.0 {
        h.c += 1;
    } else if percent >= 60.0 {
        h.d += 1;
    } else {
        h.f += 1;
    }
}

/// Mean/max/min and letter histogram over graded submissions.
pub fn performance_summary(course: &Course, a: &RawAssignment, subs: &[RawSubmission]) -> PerformanceSummary {
    let points = a.points_possible.unwrap_or(0.0);
    let scores: Vec<f64> = subs.iter().filter_map(|s| s.score).collect();

    let mut histogram = GradeHistogram::default();
    if points > 0.0 {
        for s in &scores {
            letter_bucket(s / points * 100.0, &mut histogram);
        }
    }

    let (mean, max, min) = if scores.is_empty() {
        (0.0, 0.0, 0.0)
    } else {
        let sum: f64 = scores.iter().sum();
        (
            round1(sum / scores.len() as f64),
            scores.iter().copied().fold(f64::MIN, f64::max),
            scores.iter().copied().fold(f64::MAX, f64::min),
        )
    };

    PerformanceSummary {
        assignment: a.name.clone(),
        course: course_name(course),
        due_display: parse_time(a.due_at.as_deref())
            .map(|d| d.format(DUE_FORMAT).to_string())
            .unwrap_or_default(),
        points_possible: points,
        graded: scores.len() as u32,
        mean,
        max,
        min,
        histogram,
    }
}
