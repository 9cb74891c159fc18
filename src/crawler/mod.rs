//! Crawler module for listing page fetching and post ingestion
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with capped exponential backoff
//! - Page discovery and post extraction
//! - Bounded concurrent page processing
//! - Per-page worker pools applying the ingestion policy

mod backoff;
mod extractor;
mod fetcher;
mod ingest;
mod orchestrator;
mod pagination;
mod pool;
mod site;
mod stats;

pub use backoff::{Backoff, BackoffPolicy};
pub use extractor::{Extractor, SelectorExtractor};
pub use fetcher::{
    build_http_client, Document, FetchError, Fetcher, HttpTransport, RawResponse, Transport,
    TransportError,
};
pub use ingest::{apply, IngestionJob};
pub use orchestrator::{OrchestratorConfig, PageOrchestrator};
pub use pagination::{expand_page_url, next_page_number, PageDiscovery, PageTask};
pub use pool::{PoolError, Process, WorkerPool};
pub use site::SiteCrawler;
pub use stats::{RunStats, RunSummary};

use crate::config::{Config, SiteConfig};
use crate::storage::PostRepository;
use crate::CrawlError;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Crawls one configured site into `repository`
///
/// # Arguments
///
/// * `site` - The site to crawl
/// * `config` - Crawler, fetcher and user agent settings
/// * `repository` - Destination of ingested posts
/// * `cancel` - Stops scheduling new pages once cancelled
///
/// # Returns
///
/// * `Ok(RunSummary)` - Every scheduled page finished, successfully or not
/// * `Err(CrawlError)` - The site could not be set up or scheduled
pub async fn crawl_site(
    site: &SiteConfig,
    config: &Config,
    repository: Arc<dyn PostRepository>,
    cancel: CancellationToken,
) -> Result<RunSummary, CrawlError> {
    let crawler = SiteCrawler::from_config(site)?;
    let fetcher = Arc::new(Fetcher::from_config(&config.user_agent, &config.fetcher)?);

    crawler
        .run(
            fetcher,
            repository,
            OrchestratorConfig::from(&config.crawler),
            cancel,
        )
        .await
}

/// Crawls every configured site in order and merges their summaries
///
/// A site that fails to set up is logged and skipped. Sites left when the
/// run is cancelled are not started.
pub async fn crawl_all(
    config: &Config,
    repository: Arc<dyn PostRepository>,
    cancel: CancellationToken,
) -> RunSummary {
    let mut total = RunSummary::default();

    for site in &config.sites {
        if cancel.is_cancelled() {
            tracing::warn!("Run cancelled; skipping site {}", site.name);
            continue;
        }

        match crawl_site(site, config, repository.clone(), cancel.clone()).await {
            Ok(summary) => total.merge(&summary),
            Err(e) => tracing::error!("Site {} failed: {}", site.name, e),
        }
    }

    total
}
