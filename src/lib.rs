//! Stylesweep: find unused and duplicated CSS rules
//!
//! This crate crawls a set of HTML pages (optionally twice, anonymously and with
//! a session cookie), matches every selector of a stylesheet against each page
//! and reports which rules are used, unused, ignored or duplicated.

pub mod auth;
pub mod config;
pub mod crawler;
pub mod css;
pub mod output;
pub mod scope;
pub mod state;

use thiserror::Error;

/// Main error type for Stylesweep operations
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Login failed at {url}: {message}")]
    Login { url: String, message: String },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid exclude pattern: {0}")]
    InvalidPattern(String),
}

/// Errors for a single page or stylesheet fetch
///
/// These never abort an audit: page fetch errors end up in the result's
/// `load_errors`, stylesheet fetch errors are logged.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("HTTP {status}")]
    Status { status: u16 },

    #[error("Expected HTML, got '{content_type}'")]
    ContentMismatch { status: u16, content_type: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Page worker failed: {0}")]
    Worker(String),
}

impl FetchError {
    /// HTTP status code carried by the error, if a response was received
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status } | Self::ContentMismatch { status, .. } => Some(*status),
            Self::Timeout { .. } | Self::Network(_) | Self::Worker(_) => None,
        }
    }
}

/// Result type alias for Stylesweep operations
pub type Result<T> = std::result::Result<T, SweepError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{
    audit, AuditRequest, FetchObserver, PageDescriptor, PageKind, PageSet, PageTarget,
    ResponseMeta, SessionState,
};
pub use css::{CssSource, RuleTable, SelectorEntry};
pub use output::{aggregate, AuditResult, LoadError};
pub use scope::{canonicalize, same_host, ScopePolicy};
pub use state::{VisitState, VisitStatistics};
