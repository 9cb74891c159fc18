use crate::config::types::{
    Config, CrawlerConfig, FetcherConfig, PaginationConfig, SiteConfig, StorageConfig,
    UserAgentConfig,
};
use crate::ConfigError;
use scraper::Selector;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_storage_config(&config.storage)?;
    validate_sites(&config.sites)?;
    Ok(())
}

/// Validates concurrency settings
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    let checks = [
        ("page_concurrency", config.page_concurrency),
        ("worker_count", config.worker_count),
        ("queue_capacity", config.queue_capacity),
    ];

    for (name, value) in checks {
        if let Some(n) = value {
            if !(1..=256).contains(&n) {
                return Err(ConfigError::Validation(format!(
                    "{} must be between 1 and 256, got {}",
                    name, n
                )));
            }
        }
    }

    Ok(())
}

/// Validates retry settings
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.initial_interval_ms == 0 {
        return Err(ConfigError::Validation(
            "initial_interval_ms must be > 0".to_string(),
        ));
    }

    if !config.multiplier.is_finite() || config.multiplier < 1.0 {
        return Err(ConfigError::Validation(format!(
            "multiplier must be >= 1.0, got {}",
            config.multiplier
        )));
    }

    if config.max_interval_secs.saturating_mul(1000) < config.initial_interval_ms {
        return Err(ConfigError::Validation(format!(
            "max_interval_secs ({}s) is shorter than initial_interval_ms ({}ms)",
            config.max_interval_secs, config.initial_interval_ms
        )));
    }

    if config.max_attempts == Some(0) {
        return Err(ConfigError::Validation(
            "max_attempts must be >= 1 when set".to_string(),
        ));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout_secs must be > 0".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates every site entry and rejects duplicate names
fn validate_sites(sites: &[SiteConfig]) -> Result<(), ConfigError> {
    let mut names = HashSet::new();

    for site in sites {
        if site.name.is_empty() {
            return Err(ConfigError::Validation(
                "site name cannot be empty".to_string(),
            ));
        }

        if !names.insert(site.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate site name '{}'",
                site.name
            )));
        }

        validate_site(site)?;
    }

    Ok(())
}

fn validate_site(site: &SiteConfig) -> Result<(), ConfigError> {
    if !site.page_url.contains("{page}") {
        return Err(ConfigError::Validation(format!(
            "site '{}': page-url must contain a {{page}} placeholder",
            site.name
        )));
    }

    Url::parse(&site.page_url_for(1)).map_err(|e| {
        ConfigError::InvalidUrl(format!("site '{}': invalid page-url: {}", site.name, e))
    })?;

    if let Some(base) = &site.base_url {
        Url::parse(base).map_err(|e| {
            ConfigError::InvalidUrl(format!("site '{}': invalid base-url: {}", site.name, e))
        })?;
    }

    match &site.pagination {
        PaginationConfig::FixedRange { pages } => {
            if *pages < 1 {
                return Err(ConfigError::Validation(format!(
                    "site '{}': fixed-range pagination needs at least one page",
                    site.name
                )));
            }
        }
        PaginationConfig::LinkFollowing { next_selector } => {
            validate_selector(&site.name, "next-selector", next_selector)?;
        }
    }

    let selectors = &site.selectors;
    validate_selector(&site.name, "post", &selectors.post)?;
    validate_selector(&site.name, "title", &selectors.title)?;
    if let Some(link) = &selectors.link {
        validate_selector(&site.name, "link", link)?;
    }
    if let Some(tag) = &selectors.tag {
        validate_selector(&site.name, "tag", tag)?;
    }

    Ok(())
}

fn validate_selector(site: &str, field: &str, selector: &str) -> Result<(), ConfigError> {
    Selector::parse(selector).map(|_| ()).map_err(|e| {
        ConfigError::InvalidSelector(format!(
            "site '{}': {} selector '{}': {:?}",
            site, field, selector, e
        ))
    })
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    // Must contain @ and have text on both sides
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
