//! Rule validation of screening indicators.
//!
//! Each indicator that has a screening rule and a detected value is judged
//! against its rule by an external chat-completion service. Failures never
//! propagate: every error is downgraded to a "warning" result so the
//! workflow continues and a human reviews the field.

pub mod types;
pub mod prompt;
pub mod parser;
pub mod client;
pub mod validator;

pub use types::*;
pub use prompt::*;
pub use parser::parse_judgment;
pub use client::AzureOpenAiClient;
pub use validator::{needs_validation, RuleValidator, LOW_CONFIDENCE_REASON};

use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("Judgment service request failed: {0}")]
    Transport(String),

    #[error("Judgment service returned error (status {status}): {message}")]
    Service { status: u16, message: String },

    #[error("Malformed judgment service response: {0}")]
    MalformedResponse(String),
}
