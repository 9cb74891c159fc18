//! Configuration module for the crawler
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use devread_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawler.toml")).unwrap();
//! println!("Pages in flight: {}", config.crawler.page_concurrency());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    available_parallelism, Config, CrawlerConfig, FetcherConfig, PaginationConfig,
    SelectorConfig, SiteConfig, StorageConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
