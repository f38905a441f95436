//! Livetide: a live-streaming platform crawler
//!
//! This crate implements a recurring crawler that discovers live-streaming
//! channels (categories) and rooms (individual broadcasts) from a remote
//! platform's JSON APIs, keeps a normalized local record of their current
//! state, and appends timestamped snapshots for trend tracking.

pub mod api;
pub mod config;
pub mod crawler;
pub mod output;
pub mod storage;

use thiserror::Error;

/// Main error type for Livetide operations
#[derive(Debug, Error)]
pub enum LivetideError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("API error: {0}")]
    Api(#[from] api::ApiError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Normalization error: {0}")]
    Normalize(#[from] crawler::NormalizeError),

    #[error("Crawl task failed: {0}")]
    TaskFailed(String),

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
}

/// Result type alias for Livetide operations
pub type Result<T> = std::result::Result<T, LivetideError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, CrawlMessage, CycleStats};
pub use storage::{SqliteStorage, Storage};
