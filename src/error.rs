// src/error.rs
//! Failure kinds for a single source pipeline stage.
//!
//! The aggregator matches on the kind to pick the fallback:
//! `Unconfigured` goes straight to mock data, everything else tries the
//! last-known-good cache first.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Missing key, disabled source or unavailable credentials. Not an error
    /// condition, no network call was attempted.
    #[error("source not configured: {0}")]
    Unconfigured(String),
    /// Network failure, timeout or non-2xx status.
    #[error("transport error: {0}")]
    Transport(String),
    /// Payload did not have the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    /// Cached data older than the allowed age.
    #[error("stale data ({age_hours}h old)")]
    Stale { age_hours: i64 },
}

impl FetchError {
    pub fn unconfigured(what: impl Into<String>) -> Self {
        Self::Unconfigured(what.into())
    }

    pub fn invalid(what: impl Into<String>) -> Self {
        Self::InvalidResponse(what.into())
    }

    /// Short stable name for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unconfigured(_) => "unconfigured",
            Self::Transport(_) => "transport",
            Self::InvalidResponse(_) => "invalid_response",
            Self::Stale { .. } => "stale",
        }
    }

    /// Whether the cache should be consulted before mock data.
    pub fn allows_cache(&self) -> bool {
        !matches!(self, Self::Unconfigured(_))
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidResponse(e.to_string())
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::InvalidResponse(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

pub type FetchResult<T> = std::result::Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unconfigured_skips_cache() {
        assert!(!FetchError::unconfigured("weather").allows_cache());
        assert!(FetchError::Transport("timeout".into()).allows_cache());
        assert!(FetchError::invalid("no main").allows_cache());
        assert!(FetchError::Stale { age_hours: 30 }.allows_cache());
    }

    #[test]
    fn json_errors_are_invalid_responses() {
        let e: FetchError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert_eq!(e.kind(), "invalid_response");
    }
}
