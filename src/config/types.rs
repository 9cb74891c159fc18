use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for the crawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub storage: StorageConfig,
    #[serde(default, rename = "site")]
    pub sites: Vec<SiteConfig>,
}

impl Config {
    /// Finds a site by name
    pub fn site(&self, name: &str) -> Option<&SiteConfig> {
        self.sites.iter().find(|site| site.name == name)
    }
}

/// Concurrency configuration for both crawl tiers
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of pages fetched and processed at once
    #[serde(rename = "page-concurrency")]
    pub page_concurrency: Option<usize>,

    /// Number of ingestion workers per page
    #[serde(rename = "worker-count")]
    pub worker_count: Option<usize>,

    /// Bound of the ingestion queue feeding the workers
    #[serde(rename = "queue-capacity")]
    pub queue_capacity: Option<usize>,
}

impl CrawlerConfig {
    pub fn page_concurrency(&self) -> usize {
        self.page_concurrency.unwrap_or_else(available_parallelism)
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count.unwrap_or_else(available_parallelism)
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity.unwrap_or_else(|| self.worker_count())
    }
}

/// Number of available processing units, at least one
pub fn available_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Retry and transport settings for page fetches
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// First retry delay (milliseconds)
    #[serde(rename = "initial-interval-ms", default = "default_initial_interval_ms")]
    pub initial_interval_ms: u64,

    /// Growth factor applied to the delay after each retry
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Cap on a single retry delay (seconds)
    #[serde(rename = "max-interval-secs", default = "default_max_interval_secs")]
    pub max_interval_secs: u64,

    /// Total attempts before giving up; unset retries forever
    #[serde(rename = "max-attempts")]
    pub max_attempts: Option<u32>,

    /// Total time spent retrying before giving up; unset retries forever
    #[serde(rename = "max-elapsed-secs")]
    pub max_elapsed_secs: Option<u64>,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            initial_interval_ms: default_initial_interval_ms(),
            multiplier: default_multiplier(),
            max_interval_secs: default_max_interval_secs(),
            max_attempts: None,
            max_elapsed_secs: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl FetcherConfig {
    pub fn initial_interval(&self) -> Duration {
        Duration::from_millis(self.initial_interval_ms)
    }

    pub fn max_interval(&self) -> Duration {
        Duration::from_secs(self.max_interval_secs)
    }

    pub fn max_elapsed(&self) -> Option<Duration> {
        self.max_elapsed_secs.map(Duration::from_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_initial_interval_ms() -> u64 {
    500
}

fn default_multiplier() -> f64 {
    1.5
}

fn default_max_interval_secs() -> u64 {
    300
}

fn default_timeout_secs() -> u64 {
    30
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the header value: `CrawlerName/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// One crawled site: where its listing pages live and how to read them
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Unique name, used in logs and the run ledger
    pub name: String,

    /// Listing URL template; `{page}` is replaced by the page number
    #[serde(rename = "page-url")]
    pub page_url: String,

    /// Base for resolving relative post links; defaults to the page URL
    #[serde(rename = "base-url")]
    pub base_url: Option<String>,

    pub pagination: PaginationConfig,

    pub selectors: SelectorConfig,
}

impl SiteConfig {
    /// Builds the listing URL for `page`
    pub fn page_url_for(&self, page: u32) -> String {
        crate::crawler::expand_page_url(&self.page_url, page)
    }
}

/// How listing pages are enumerated
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "strategy", rename_all = "kebab-case")]
pub enum PaginationConfig {
    /// Pages `1..=pages`
    FixedRange { pages: u32 },

    /// Follow the next-page link from page 1 until it disappears
    LinkFollowing {
        #[serde(rename = "next-selector", default = "default_next_selector")]
        next_selector: String,
    },
}

fn default_next_selector() -> String {
    "a.next".to_string()
}

/// CSS selectors locating post fields in a listing page
#[derive(Debug, Clone, Deserialize)]
pub struct SelectorConfig {
    /// One match per post
    pub post: String,

    /// Title element, relative to the post
    pub title: String,

    /// Element carrying the `href`; defaults to the title selector
    pub link: Option<String>,

    /// Tag element, relative to the post
    pub tag: Option<String>,
}
