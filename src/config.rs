//! Runtime configuration.
//!
//! Resolved once at startup from the process environment (and an optional
//! `.env` file) into an immutable `AppConfig` that is passed into services.
//! Request handling never reads environment variables.
//!
//! Service credentials are optional at this stage: their absence is reported
//! by the operation that needs them, before any network call is attempted.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "Prescreen";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_ANALYZER_ID: &str = "prefilter";
pub const DEFAULT_CU_API_VERSION: &str = "2025-11-01";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 3;
pub const DEFAULT_MAX_POLLS: u32 = 30;

pub const DEFAULT_DEPLOYMENT: &str = "gpt-4.1-mini";
pub const DEFAULT_OPENAI_API_VERSION: &str = "2024-08-01-preview";

pub const DEFAULT_BLOB_PROXY_TARGET: &str = "https://doctransstor163828.blob.core.windows.net";
/// Local path prefix that blob-storage URLs are rewritten to in development.
pub const BLOB_PROXY_PREFIX: &str = "/api/blob";
/// Host suffix identifying blob-storage document URLs.
pub const BLOB_HOST_SUFFIX: &str = ".blob.core.windows.net";

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "prescreen=info,prescreen_lib=info,tower_http=warn"
}

/// Log filter directive: `RUST_LOG` when set and non-blank, else the default.
pub fn log_filter<F>(lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup("RUST_LOG")
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default_log_filter().to_string())
}

/// Read `.env` into the process environment, returning its path if found.
///
/// Call before tracing is initialized so a `RUST_LOG` set there applies.
pub fn load_dotenv() -> Option<PathBuf> {
    dotenvy::dotenv().ok()
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{service} is not configured: set {name}")]
    Missing {
        service: &'static str,
        name: &'static str,
    },

    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Document-understanding (extraction) service settings.
#[derive(Debug, Clone)]
pub struct ExtractionSettings {
    pub endpoint: Option<String>,
    pub subscription_key: Option<String>,
    pub analyzer_id: String,
    pub api_version: String,
    pub poll_interval: Duration,
    pub max_polls: u32,
}

impl ExtractionSettings {
    /// Endpoint (without trailing slash) and subscription key, or the first missing setting.
    pub fn credentials(&self) -> Result<(&str, &str), ConfigError> {
        let endpoint = self.endpoint.as_deref().ok_or(ConfigError::Missing {
            service: "Extraction service",
            name: "CU_ENDPOINT",
        })?;
        let key = self.subscription_key.as_deref().ok_or(ConfigError::Missing {
            service: "Extraction service",
            name: "CU_SUBSCRIPTION_KEY",
        })?;
        Ok((endpoint.trim_end_matches('/'), key))
    }
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            subscription_key: None,
            analyzer_id: DEFAULT_ANALYZER_ID.to_string(),
            api_version: DEFAULT_CU_API_VERSION.to_string(),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            max_polls: DEFAULT_MAX_POLLS,
        }
    }
}

/// Judgment (chat-completion) service settings.
#[derive(Debug, Clone)]
pub struct JudgmentSettings {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub deployment: String,
    pub api_version: String,
}

impl JudgmentSettings {
    pub fn credentials(&self) -> Result<(&str, &str), ConfigError> {
        let endpoint = self.endpoint.as_deref().ok_or(ConfigError::Missing {
            service: "Judgment service",
            name: "AZURE_OPENAI_ENDPOINT",
        })?;
        let key = self.api_key.as_deref().ok_or(ConfigError::Missing {
            service: "Judgment service",
            name: "AZURE_OPENAI_API_KEY",
        })?;
        Ok((endpoint.trim_end_matches('/'), key))
    }
}

impl Default for JudgmentSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            deployment: DEFAULT_DEPLOYMENT.to_string(),
            api_version: DEFAULT_OPENAI_API_VERSION.to_string(),
        }
    }
}

/// Document display proxy settings.
#[derive(Debug, Clone)]
pub struct ProxySettings {
    /// Development mode: rewrite blob URLs and serve the blob proxy route.
    pub dev_mode: bool,
    pub blob_target: String,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            dev_mode: false,
            blob_target: DEFAULT_BLOB_PROXY_TARGET.to_string(),
        }
    }
}

/// Complete configuration resolved at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub extraction: ExtractionSettings,
    pub judgment: JudgmentSettings,
    pub proxy: ProxySettings,
    pub demo_pdf_url: Option<String>,
    pub rules_path: Option<PathBuf>,
    pub bind_addr: SocketAddr,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            extraction: ExtractionSettings::default(),
            judgment: JudgmentSettings::default(),
            proxy: ProxySettings::default(),
            demo_pdf_url: None,
            rules_path: None,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
        }
    }
}

impl AppConfig {
    /// Load from the process environment. See [`load_dotenv`] for `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as absent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let extraction = ExtractionSettings {
            endpoint: get("CU_ENDPOINT"),
            subscription_key: get("CU_SUBSCRIPTION_KEY"),
            analyzer_id: get("CU_ANALYZER_ID").unwrap_or_else(|| DEFAULT_ANALYZER_ID.into()),
            api_version: get("CU_API_VERSION").unwrap_or_else(|| DEFAULT_CU_API_VERSION.into()),
            poll_interval: Duration::from_secs(parse_or(
                "CU_POLL_INTERVAL_SECS",
                get("CU_POLL_INTERVAL_SECS"),
                DEFAULT_POLL_INTERVAL_SECS,
            )?),
            max_polls: parse_or("CU_MAX_POLLS", get("CU_MAX_POLLS"), DEFAULT_MAX_POLLS)?,
        };
        if extraction.max_polls == 0 {
            return Err(ConfigError::Invalid {
                name: "CU_MAX_POLLS",
                value: "0".into(),
            });
        }

        let judgment = JudgmentSettings {
            endpoint: get("AZURE_OPENAI_ENDPOINT"),
            api_key: get("AZURE_OPENAI_API_KEY"),
            deployment: get("AZURE_OPENAI_DEPLOYMENT")
                .unwrap_or_else(|| DEFAULT_DEPLOYMENT.into()),
            api_version: get("AZURE_OPENAI_API_VERSION")
                .unwrap_or_else(|| DEFAULT_OPENAI_API_VERSION.into()),
        };

        let proxy = ProxySettings {
            dev_mode: parse_flag("PRESCREEN_DEV", get("PRESCREEN_DEV"))?,
            blob_target: get("BLOB_PROXY_TARGET")
                .unwrap_or_else(|| DEFAULT_BLOB_PROXY_TARGET.into())
                .trim_end_matches('/')
                .to_string(),
        };

        let bind_raw = get("PRESCREEN_BIND").unwrap_or_else(|| DEFAULT_BIND_ADDR.into());
        let bind_addr = bind_raw.parse().map_err(|_| ConfigError::Invalid {
            name: "PRESCREEN_BIND",
            value: bind_raw.clone(),
        })?;

        Ok(Self {
            extraction,
            judgment,
            proxy,
            demo_pdf_url: get("DEMO_PDF_URL"),
            rules_path: get("SCREENING_RULES_PATH").map(PathBuf::from),
            bind_addr,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    name: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

fn parse_flag(name: &'static str, raw: Option<String>) -> Result<bool, ConfigError> {
    match raw.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(false),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(_) => Err(ConfigError::Invalid {
            name,
            value: raw.unwrap_or_default(),
        }),
    }
}
