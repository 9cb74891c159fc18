//! Devread crawler: idempotent blog post ingestion
//!
//! This crate crawls paginated blog listings, extracts post records and
//! upserts them into a post repository. Page fetches and per-post writes run
//! concurrently under two independent bounds, and individual failures never
//! abort the rest of the run.

pub mod config;
pub mod crawler;
pub mod model;
pub mod storage;

use thiserror::Error;

/// Main error type for crawler operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Worker pool error: {0}")]
    Pool(#[from] crawler::PoolError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Scheduling error: {0}")]
    Scheduling(String),
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

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),
}

/// Result type alias for crawler operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{crawl_all, crawl_site, RunSummary};
pub use model::{Outcome, Post, PostIdentity};
pub use storage::{PostRepository, SqlitePostRepository, StorageError};
