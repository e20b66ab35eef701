//! Shared types for the API layer.

use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::pipeline::runner::ScreeningRunner;
use crate::session::ScreeningSession;

const BLOB_CONNECT_TIMEOUT_SECS: u64 = 10;
const BLOB_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Shared context for all API routes.
#[derive(Clone)]
pub struct ApiContext {
    pub runner: Arc<ScreeningRunner>,
    pub config: Arc<AppConfig>,
    /// Client for the development blob proxy.
    pub http: reqwest::Client,
}

impl ApiContext {
    pub fn new(runner: Arc<ScreeningRunner>, config: Arc<AppConfig>) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(BLOB_CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(BLOB_REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            runner,
            config,
            http,
        })
    }

    pub fn session(&self) -> &ScreeningSession {
        self.runner.session()
    }
}
