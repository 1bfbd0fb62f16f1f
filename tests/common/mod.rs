// tests/common/mod.rs
// Shared stub fetcher for integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone};
use kiosk_dashboard::config::DashboardConfig;
use kiosk_dashboard::credentials::CredentialProvider;
use kiosk_dashboard::http::{HttpFetch, Page, Request};
use kiosk_dashboard::{FetchError, FetchResult, RuntimeContext};
use serde_json::Value;

#[derive(Clone)]
pub enum Reply {
    Json(Value),
    /// A JSON page whose `Link` header points at the given next URL.
    Page(Value, String),
    Text(String),
    Fail(FetchError),
}

/// Routes by URL: an exact suffix match wins, otherwise the first route
/// whose key appears anywhere in the URL. Unrouted requests fail with a
/// transport error.
#[derive(Default)]
pub struct StubHttp {
    routes: Vec<(String, Reply)>,
    calls: Mutex<Vec<String>>,
}

impl StubHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, key: &str, reply: Reply) -> Self {
        self.routes.push((key.to_string(), reply));
        self
    }

    pub fn json(self, key: &str, body: Value) -> Self {
        self.route(key, Reply::Json(body))
    }

    pub fn text(self, key: &str, body: &str) -> Self {
        self.route(key, Reply::Text(body.to_string()))
    }

    pub fn page(self, key: &str, body: Value, next: &str) -> Self {
        self.route(key, Reply::Page(body, next.to_string()))
    }

    pub fn fail(self, key: &str, err: FetchError) -> Self {
        self.route(key, Reply::Fail(err))
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, needle: &str) -> usize {
        self.calls().iter().filter(|u| u.contains(needle)).count()
    }

    fn reply(&self, req: &Request) -> Reply {
        self.calls.lock().unwrap().push(req.url.clone());
        self.routes
            .iter()
            .find(|(k, _)| req.url.ends_with(k.as_str()))
            .or_else(|| self.routes.iter().find(|(k, _)| req.url.contains(k.as_str())))
            .map(|(_, r)| r.clone())
            .unwrap_or_else(|| Reply::Fail(FetchError::Transport(format!("no route for {}", req.url))))
    }
}

#[async_trait]
impl HttpFetch for StubHttp {
    async fn get_json(&self, req: &Request) -> FetchResult<Value> {
        match self.reply(req) {
            Reply::Json(v) | Reply::Page(v, _) => Ok(v),
            Reply::Text(t) => Ok(serde_json::from_str(&t)?),
            Reply::Fail(e) => Err(e),
        }
    }

    async fn get_json_page(&self, req: &Request) -> FetchResult<Page> {
        match self.reply(req) {
            Reply::Page(body, next) => Ok(Page {
                body,
                next: Some(next),
            }),
            Reply::Json(body) => Ok(Page { body, next: None }),
            Reply::Text(t) => Ok(Page {
                body: serde_json::from_str(&t)?,
                next: None,
            }),
            Reply::Fail(e) => Err(e),
        }
    }

    async fn get_text(&self, req: &Request) -> FetchResult<String> {
        match self.reply(req) {
            Reply::Json(v) | Reply::Page(v, _) => Ok(v.to_string()),
            Reply::Text(t) => Ok(t),
            Reply::Fail(e) => Err(e),
        }
    }
}

pub struct StaticToken(pub Option<&'static str>);

impl CredentialProvider for StaticToken {
    fn access_token(&self) -> Option<String> {
        self.0.map(str::to_string)
    }
}

/// Defaults with every source disabled or unconfigured, paths under `dir`.
pub fn quiet_config(dir: &std::path::Path) -> DashboardConfig {
    let mut cfg = DashboardConfig::default();
    cfg.weather.api_key.clear();
    cfg.calendar.enabled = false;
    cfg.canvas.enabled = false;
    cfg.traffic.enabled = false;
    cfg.rss.enabled = false;
    cfg.paths.output_dir = dir.join("output");
    cfg.paths.static_dir = dir.join("static");
    cfg.paths.template = dir.join("missing-template.html");
    cfg.paths.cache_file = dir.join("cache/calendar_cache.json");
    cfg
}

pub fn context(cfg: DashboardConfig, http: Arc<StubHttp>, token: Option<&'static str>) -> RuntimeContext {
    RuntimeContext::with_parts(cfg, http, Arc::new(StaticToken(token)), false)
}

/// Wednesday 2025-05-14 09:00 local.
pub fn wednesday_morning() -> DateTime<Local> {
    Local.with_ymd_and_hms(2025, 5, 14, 9, 0, 0).unwrap()
}
