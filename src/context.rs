// src/context.rs
//! Process-wide collaborators, built once at startup and handed to the
//! aggregator.

use std::sync::Arc;

use anyhow::Result;

use crate::config::DashboardConfig;
use crate::credentials::{CredentialProvider, NoCredentials, TokenFile};
use crate::http::{HttpFetch, ReqwestFetcher};

pub struct RuntimeContext {
    pub config: DashboardConfig,
    pub http: Arc<dyn HttpFetch>,
    pub credentials: Arc<dyn CredentialProvider>,
    /// Force every source to its substitute dataset.
    pub mock_mode: bool,
}

impl RuntimeContext {
    /// Production wiring: reqwest client and the calendar token file.
    pub fn new(config: DashboardConfig, mock_mode: bool) -> Result<Self> {
        let credentials: Arc<dyn CredentialProvider> = if mock_mode {
            Arc::new(NoCredentials)
        } else {
            Arc::new(TokenFile::new(config.calendar.token_path.clone()))
        };
        Ok(Self {
            http: Arc::new(ReqwestFetcher::new()?),
            credentials,
            config,
            mock_mode,
        })
    }

    /// Explicit wiring, used by tests to inject stubs.
    pub fn with_parts(
        config: DashboardConfig,
        http: Arc<dyn HttpFetch>,
        credentials: Arc<dyn CredentialProvider>,
        mock_mode: bool,
    ) -> Self {
        Self {
            config,
            http,
            credentials,
            mock_mode,
        }
    }
}
