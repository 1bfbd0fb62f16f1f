// src/http.rs
//! Leaf network capability shared by every source pipeline.
//!
//! Sources never talk to `reqwest` directly; they go through [`HttpFetch`] so
//! the whole pipeline can be driven by a stub in tests.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{FetchError, FetchResult};

/// Per-request timeout applied to every provider call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// One outgoing GET: url, query pairs and optional bearer token.
#[derive(Debug, Clone, Default)]
pub struct Request {
    pub url: String,
    pub query: Vec<(String, String)>,
    pub bearer: Option<String>,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    /// Value of a query parameter, used by stubs to route requests.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// One page of a paginated JSON listing.
#[derive(Debug, Clone)]
pub struct Page {
    pub body: Value,
    /// Absolute URL of the following page, from `Link: <...>; rel="next"`.
    pub next: Option<String>,
}

#[async_trait]
pub trait HttpFetch: Send + Sync {
    /// GET and parse the body as JSON.
    async fn get_json(&self, req: &Request) -> FetchResult<Value>;
    /// GET and return the raw body (RSS/XML).
    async fn get_text(&self, req: &Request) -> FetchResult<String>;

    /// GET one page of a listing. Fetchers that cannot see response headers
    /// report a single page.
    async fn get_json_page(&self, req: &Request) -> FetchResult<Page> {
        Ok(Page {
            body: self.get_json(req).await?,
            next: None,
        })
    }
}

/// The `rel="next"` target of an RFC 8288 `Link` header value.
pub fn next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|part| {
        let (target, params) = part.split_once(';')?;
        let is_next = params
            .split(';')
            .any(|p| p.trim().replace(' ', "").eq_ignore_ascii_case("rel=\"next\""));
        let url = target.trim().strip_prefix('<')?.strip_suffix('>')?;
        is_next.then(|| url.to_string())
    })
}

/// Production fetcher backed by a shared `reqwest::Client`.
pub struct ReqwestFetcher {
    http: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new() -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("kiosk-dashboard/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4))
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { http })
    }

    async fn send(&self, req: &Request) -> FetchResult<reqwest::Response> {
        let mut builder = self.http.get(&req.url).query(&req.query);
        if let Some(token) = &req.bearer {
            builder = builder.bearer_auth(token);
        }
        let resp = builder.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Transport(format!(
                "{} returned HTTP {}",
                req.url,
                status.as_u16()
            )));
        }
        Ok(resp)
    }
}

#[async_trait]
impl HttpFetch for ReqwestFetcher {
    async fn get_json(&self, req: &Request) -> FetchResult<Value> {
        let resp = self.send(req).await?;
        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn get_text(&self, req: &Request) -> FetchResult<String> {
        let resp = self.send(req).await?;
        Ok(resp.text().await?)
    }

    async fn get_json_page(&self, req: &Request) -> FetchResult<Page> {
        let resp = self.send(req).await?;
        let next = resp
            .headers()
            .get(reqwest::header::LINK)
            .and_then(|v| v.to_str().ok())
            .and_then(next_link);
        let body = resp.text().await?;
        Ok(Page {
            body: serde_json::from_str(&body)?,
            next,
        })
    }
}
