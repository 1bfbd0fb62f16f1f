// src/cache.rs
//! Last-known-good file cache.
//!
//! One JSON document `{ "timestamp": <ISO-8601>, "events": [...] }` per store.
//! Writes go through a temp file + rename; reads treat anything absent,
//! unreadable, corrupt or older than `max_age` as a miss.

use std::fs;
use std::io::{self, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Local, NaiveDateTime, TimeZone};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{FetchError, FetchResult};

/// Default maximum age of a cached payload.
pub const MAX_CACHE_AGE_HOURS: i64 = 24;

#[derive(Debug, Deserialize)]
struct CacheEntry<T> {
    timestamp: String,
    events: Vec<T>,
}

#[derive(Serialize)]
struct CacheEntryRef<'a, T> {
    timestamp: String,
    events: &'a [T],
}

pub struct CacheStore<T> {
    path: PathBuf,
    max_age: Duration,
    _records: PhantomData<fn() -> T>,
}

impl<T> CacheStore<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_max_age(path, Duration::hours(MAX_CACHE_AGE_HOURS))
    }

    pub fn with_max_age(path: impl Into<PathBuf>, max_age: Duration) -> Self {
        Self {
            path: path.into(),
            max_age,
            _records: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Best-effort write; failures are logged and swallowed.
    pub fn save(&self, records: &[T], now: DateTime<Local>) {
        if let Err(e) = self.try_save(records, now) {
            tracing::warn!(
                error = %e,
                path = %self.path.display(),
                stage = "cache_write",
                "failed to write cache"
            );
        }
    }

    fn try_save(&self, records: &[T], now: DateTime<Local>) -> io::Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let entry = CacheEntryRef {
            timestamp: now.to_rfc3339(),
            events: records,
        };
        let json = serde_json::to_string_pretty(&entry)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let tmp = self.path.with_extension("json.tmp");
        let mut f = fs::File::create(&tmp)?;
        f.write_all(json.as_bytes())?;
        fs::rename(tmp, &self.path)?;
        Ok(())
    }

    /// Cached records if present and fresh enough.
    pub fn load(&self, now: DateTime<Local>) -> Option<Vec<T>> {
        match self.read_entry(now) {
            Ok(records) => Some(records),
            Err(e) => {
                tracing::debug!(
                    error = %e,
                    path = %self.path.display(),
                    stage = "cache_read",
                    "cache miss"
                );
                None
            }
        }
    }

    fn read_entry(&self, now: DateTime<Local>) -> FetchResult<Vec<T>> {
        let raw = fs::read_to_string(&self.path)
            .map_err(|e| FetchError::Transport(format!("cache unreadable: {e}")))?;
        let entry: CacheEntry<T> = serde_json::from_str(&raw)?;
        let written = parse_timestamp(&entry.timestamp)
            .ok_or_else(|| FetchError::invalid("cache timestamp"))?;
        let age = now.signed_duration_since(written);
        if age > self.max_age {
            return Err(FetchError::Stale {
                age_hours: age.num_hours(),
            });
        }
        Ok(entry.events)
    }
}

/// RFC 3339, or a naive ISO-8601 timestamp interpreted as local time.
fn parse_timestamp(s: &str) -> Option<DateTime<Local>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Local));
    }
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    Local.from_local_datetime(&naive).earliest()
}
