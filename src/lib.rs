pub mod api;
pub mod config;
pub mod pipeline;
pub mod proxy; // PDF display URL rewriting
pub mod session;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::api::{screening_api_router, start_api_server, ApiContext, ServerError};
use crate::config::{AppConfig, ConfigError};
use crate::pipeline::analysis::{AnalysisError, AnalysisOrchestrator, ContentUnderstandingClient};
use crate::pipeline::runner::ScreeningRunner;
use crate::pipeline::screening::{RuleBook, RuleBookError};
use crate::pipeline::validation::{AzureOpenAiClient, RuleValidator, ValidationError};
use crate::session::ScreeningSession;

/// Startup failures.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Rule book error: {0}")]
    RuleBook(#[from] RuleBookError),
    #[error("Extraction client error: {0}")]
    Extraction(#[from] AnalysisError),
    #[error("Judgment client error: {0}")]
    Judgment(#[from] ValidationError),
    #[error("Blob proxy client error: {0}")]
    BlobClient(#[from] reqwest::Error),
    #[error(transparent)]
    Server(#[from] ServerError),
    #[error("Failed to listen for shutdown signal: {0}")]
    Signal(std::io::Error),
}

/// Rule book from `SCREENING_RULES_PATH`, or the built-in one.
fn load_rules(config: &AppConfig) -> Result<RuleBook, RuleBookError> {
    match &config.rules_path {
        Some(path) => {
            let rules = RuleBook::from_file(path)?;
            tracing::info!(path = %path.display(), rules = rules.rules().len(), "Loaded rule book");
            Ok(rules)
        }
        None => Ok(RuleBook::builtin()),
    }
}

/// Wire services, session and runner into the API context.
pub fn build_context(config: AppConfig) -> Result<ApiContext, StartupError> {
    let rules = load_rules(&config)?;

    let extraction = ContentUnderstandingClient::new(config.extraction.clone())?;
    let judgment = AzureOpenAiClient::new(config.judgment.clone())?;

    for missing in [
        config.extraction.credentials().err(),
        config.judgment.credentials().err(),
    ]
    .into_iter()
    .flatten()
    {
        tracing::warn!("{missing}; analyses will fail until it is set");
    }

    let runner = ScreeningRunner::new(
        Arc::new(ScreeningSession::new()),
        AnalysisOrchestrator::new(Arc::new(extraction), &config.extraction),
        RuleValidator::new(Arc::new(judgment)),
        Arc::new(rules),
    );

    Ok(ApiContext::new(Arc::new(runner), Arc::new(config))?)
}

/// Start the screening API and serve until Ctrl-C.
pub async fn run() -> Result<(), StartupError> {
    // .env first so RUST_LOG from it reaches the filter
    let dotenv = config::load_dotenv();

    // Initialize tracing
    let directive = config::log_filter(|key| std::env::var(key).ok());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&directive)
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
    if let Some(path) = dotenv {
        tracing::debug!(path = %path.display(), "Loaded .env file");
    }

    let config = AppConfig::from_env()?;
    let bind_addr = config.bind_addr;
    let dev_mode = config.proxy.dev_mode;

    let ctx = build_context(config)?;
    let server = start_api_server(screening_api_router(ctx), bind_addr).await?;
    tracing::info!(addr = %server.addr(), dev_mode, "Listening");

    tokio::signal::ctrl_c().await.map_err(StartupError::Signal)?;
    server.shutdown().await;
    Ok(())
}
