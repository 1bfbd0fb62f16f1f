// src/credentials.rs
//! Calendar credential provider.
//!
//! Acquiring and refreshing the token is done out of band by a one-time
//! browser authorization; the dashboard only asks "is there a token".

use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

pub trait CredentialProvider: Send + Sync {
    /// Bearer token for the calendar API, `None` when unavailable.
    fn access_token(&self) -> Option<String>;
}

/// Reads the token JSON written by the authorization helper.
pub struct TokenFile {
    path: PathBuf,
}

#[derive(Deserialize)]
struct StoredToken {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
}

impl TokenFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CredentialProvider for TokenFile {
    fn access_token(&self) -> Option<String> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) => {
                tracing::debug!(error = %e, path = %self.path.display(), "no calendar token");
                return None;
            }
        };
        let stored: StoredToken = match serde_json::from_str(&raw) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(error = %e, path = %self.path.display(), "unreadable calendar token");
                return None;
            }
        };
        stored
            .token
            .or(stored.access_token)
            .filter(|t| !t.trim().is_empty())
    }
}

/// Always unavailable; used in mock mode.
pub struct NoCredentials;

impl CredentialProvider for NoCredentials {
    fn access_token(&self) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_token_or_access_token() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("token.json");

        fs::write(&p, r#"{"token": "ya29.abc", "refresh_token": "1//x"}"#).unwrap();
        assert_eq!(TokenFile::new(&p).access_token().as_deref(), Some("ya29.abc"));

        fs::write(&p, r#"{"access_token": "ya29.def"}"#).unwrap();
        assert_eq!(TokenFile::new(&p).access_token().as_deref(), Some("ya29.def"));

        fs::write(&p, r#"{"token": "  "}"#).unwrap();
        assert_eq!(TokenFile::new(&p).access_token(), None);
    }

    #[test]
    fn missing_or_corrupt_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("token.json");
        assert_eq!(TokenFile::new(&p).access_token(), None);
        fs::write(&p, "garbage").unwrap();
        assert_eq!(TokenFile::new(&p).access_token(), None);
        assert_eq!(NoCredentials.access_token(), None);
    }
}
