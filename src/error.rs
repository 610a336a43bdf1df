//! Error types for the three failure domains: fetching pages, delivering
//! notifications and loading configuration.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Why a single page fetch failed. Always local to one scan.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("timed out after {}s", .0.as_secs_f32())]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("http status {0}")]
    Status(u16),

    #[error("request failed: {0}")]
    Transport(String),
}

impl FetchError {
    /// Short category label used in log fields.
    pub fn category(&self) -> &'static str {
        match self {
            FetchError::Timeout(_) => "timeout",
            FetchError::Connection(_) => "connection",
            FetchError::Status(_) => "http_status",
            FetchError::Transport(_) => "transport",
        }
    }
}

/// Why an outbound message could not be delivered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("authentication rejected (status {0})")]
    Authentication(u16),

    #[error("rate limited by provider")]
    RateLimited,

    #[error("network error: {0}")]
    Network(String),

    #[error("rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
}

/// Startup-only failures. Any of these stops the process before scheduling.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to load config: {0}")]
    Load(String),

    #[error("config validation failed: {}", .0.join("; "))]
    Invalid(Vec<String>),

    #[error("missing required environment variables: {}", .0.join(", "))]
    MissingEnv(Vec<&'static str>),

    #[error("failed to build http client: {0}")]
    Client(String),
}
