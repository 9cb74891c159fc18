//! Per-site crawl assembly
//!
//! A `SiteCrawler` binds one configured site to its page discovery strategy
//! and extractor, then hands the discovered pages to a `PageOrchestrator`.

use crate::config::SiteConfig;
use crate::crawler::extractor::{Extractor, SelectorExtractor};
use crate::crawler::fetcher::Fetcher;
use crate::crawler::orchestrator::{OrchestratorConfig, PageOrchestrator};
use crate::crawler::pagination::PageDiscovery;
use crate::crawler::stats::RunSummary;
use crate::storage::PostRepository;
use crate::CrawlError;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Crawler for a single configured site
#[derive(Clone)]
pub struct SiteCrawler {
    name: String,
    page_url: String,
    discovery: PageDiscovery,
    extractor: Arc<dyn Extractor>,
}

impl SiteCrawler {
    /// Compiles the site's selectors and pagination strategy
    pub fn from_config(site: &SiteConfig) -> Result<Self, CrawlError> {
        Ok(Self {
            name: site.name.clone(),
            page_url: site.page_url.clone(),
            discovery: PageDiscovery::from_config(&site.pagination)?,
            extractor: Arc::new(SelectorExtractor::from_config(site)?),
        })
    }

    /// Replaces the selector-driven extractor
    pub fn with_extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Discovers the site's pages and crawls them
    pub async fn run(
        &self,
        fetcher: Arc<Fetcher>,
        repository: Arc<dyn PostRepository>,
        config: OrchestratorConfig,
        cancel: CancellationToken,
    ) -> Result<RunSummary, CrawlError> {
        tracing::info!("Crawling site {}", self.name);

        let pages = self
            .discovery
            .plan(&self.page_url, fetcher.as_ref(), &cancel)
            .await;
        if pages.is_empty() {
            tracing::warn!("No pages to crawl for site {}", self.name);
        }

        let summary = PageOrchestrator::new(fetcher, self.extractor.clone(), repository, config)
            .with_cancellation(cancel)
            .run(pages)
            .await?;

        tracing::info!("Site {} done: {}", self.name, summary);
        Ok(summary)
    }
}
