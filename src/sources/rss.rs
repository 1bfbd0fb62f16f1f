// src/sources/rss.rs
//! RSS 2.0 headlines from the configured feeds.

use chrono::{DateTime, Local};
use quick_xml::de::from_str;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime};

use crate::config::{Feed, RssConfig};
use crate::error::{FetchError, FetchResult};
use crate::http::{HttpFetch, Request};
use crate::model::Article;
use crate::text::{strip_html, truncate_ellipsis};

pub const SUMMARY_CHARS: usize = 200;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

/// Fetch every feed; a failing feed is logged and skipped. Fails only when
/// every feed failed.
pub async fn fetch(http: &dyn HttpFetch, cfg: &RssConfig) -> FetchResult<Vec<Article>> {
    if !cfg.enabled || cfg.feeds.is_empty() {
        return Err(FetchError::unconfigured("no rss feeds"));
    }

    let mut articles = Vec::new();
    let mut last_err = None;
    let mut succeeded = 0usize;
    for feed in &cfg.feeds {
        tracing::info!(source = "rss", feed = %feed.name, "fetching feed");
        let res = http
            .get_text(&Request::get(&feed.url))
            .await
            .and_then(|body| parse_feed(&body, feed, cfg.items_per_feed));
        match res {
            Ok(mut items) => {
                succeeded += 1;
                articles.append(&mut items);
            }
            Err(e) => {
                tracing::warn!(error = %e, source = "rss", feed = %feed.name, stage = "fetch", "feed failed");
                last_err = Some(e);
            }
        }
    }

    match (succeeded, last_err) {
        (0, Some(e)) => Err(e),
        _ => Ok(articles),
    }
}

/// First `limit` items of one feed document.
pub fn parse_feed(xml: &str, feed: &Feed, limit: usize) -> FetchResult<Vec<Article>> {
    let cleaned = scrub_html_entities_for_xml(xml);
    let rss: Rss = from_str(&cleaned).map_err(|e| FetchError::invalid(format!("rss {}: {e}", feed.name)))?;

    Ok(rss
        .channel
        .item
        .into_iter()
        .take(limit)
        .map(|it| {
            let summary = it
                .description
                .as_deref()
                .map(strip_html)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    let mut cut: String = s.chars().take(SUMMARY_CHARS).collect();
                    cut.push_str("...");
                    cut
                })
                .unwrap_or_default();
            Article {
                source: feed.name.clone(),
                title: strip_html(it.title.as_deref().unwrap_or_default()),
                link: it
                    .link
                    .map(|l| l.trim().to_string())
                    .filter(|l| !l.is_empty())
                    .unwrap_or_else(|| "#".to_string()),
                published: it.pub_date.as_deref().map(display_date).unwrap_or_default(),
                summary,
            }
        })
        .collect())
}

/// RFC 2822 `pubDate` as local `Mon D, HH:MM`; unparseable dates pass
/// through unchanged.
pub fn display_date(raw: &str) -> String {
    OffsetDateTime::parse(raw.trim(), &Rfc2822)
        .ok()
        .and_then(|dt| DateTime::from_timestamp(dt.unix_timestamp(), 0))
        .map(|dt| dt.with_timezone(&Local).format("%b %-d, %H:%M").to_string())
        .unwrap_or_else(|| truncate_ellipsis(raw.trim(), 40))
}

/// XML only knows five named entities; feeds routinely use HTML ones.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}
