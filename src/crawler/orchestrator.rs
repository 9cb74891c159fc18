//! Page orchestrator - bounded concurrent page processing
//!
//! Every page task holds a semaphore permit from before its fetch until its
//! worker pool has drained, so at most `page_concurrency` pages are in
//! flight. Page failures are logged and counted; they never cancel sibling
//! pages or fail the run.
//!
//! The run's cancellation token only gates permit acquisition. Pages that
//! already hold a permit finish normally: their ingestion jobs write through
//! a separate context that the run token never trips.

use crate::config::CrawlerConfig;
use crate::crawler::extractor::Extractor;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::ingest::IngestionJob;
use crate::crawler::pagination::PageTask;
use crate::crawler::pool::WorkerPool;
use crate::crawler::stats::{RunStats, RunSummary};
use crate::storage::PostRepository;
use crate::CrawlError;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Width of both concurrency tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    pub page_concurrency: usize,
    pub worker_count: usize,
    pub queue_capacity: usize,
}

impl From<&CrawlerConfig> for OrchestratorConfig {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            page_concurrency: config.page_concurrency(),
            worker_count: config.worker_count(),
            queue_capacity: config.queue_capacity(),
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::from(&CrawlerConfig::default())
    }
}

/// Drives pages through fetch, extraction and ingestion
#[derive(Clone)]
pub struct PageOrchestrator {
    fetcher: Arc<Fetcher>,
    extractor: Arc<dyn Extractor>,
    repository: Arc<dyn PostRepository>,
    config: OrchestratorConfig,
    cancel: CancellationToken,
    ingest_ctx: CancellationToken,
}

impl PageOrchestrator {
    pub fn new(
        fetcher: Arc<Fetcher>,
        extractor: Arc<dyn Extractor>,
        repository: Arc<dyn PostRepository>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            repository,
            config,
            cancel: CancellationToken::new(),
            ingest_ctx: CancellationToken::new(),
        }
    }

    /// Uses `cancel` as the run's cancellation signal
    ///
    /// Cancelling skips pages not yet started; it does not reach pages in
    /// flight.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Processes every page and waits for all of them
    ///
    /// Returns an error only if the permit semaphore itself fails.
    pub async fn run(&self, pages: Vec<PageTask>) -> Result<RunSummary, CrawlError> {
        let stats = Arc::new(RunStats::new());
        let semaphore = Arc::new(Semaphore::new(self.config.page_concurrency.max(1)));
        let mut tasks = JoinSet::new();
        let mut scheduling_error = None;

        tracing::info!(
            "Crawling {} pages ({} at a time, {} workers each)",
            pages.len(),
            self.config.page_concurrency,
            self.config.worker_count
        );

        for page in pages {
            let permit = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    tracing::warn!("Run cancelled; skipping {}", page.url);
                    stats.page_skipped();
                    continue;
                }
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(e) => {
                        tracing::error!("Failed to acquire page permit: {}", e);
                        scheduling_error = Some(CrawlError::Scheduling(e.to_string()));
                        break;
                    }
                },
            };

            stats.page_scheduled();
            let worker = self.clone();
            let stats = stats.clone();
            tasks.spawn(async move {
                match worker.process_page(&page, &stats).await {
                    Ok(candidates) => {
                        stats.page_processed();
                        tracing::info!("Finished {} ({} posts)", page.url, candidates);
                    }
                    Err(e) => {
                        stats.page_failed();
                        tracing::error!("Error processing {}: {}", page.url, e);
                    }
                }
                drop(permit);
            });
        }

        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                stats.page_failed();
                tracing::error!("Page task aborted: {}", e);
            }
        }

        let summary = stats.snapshot();
        tracing::info!("Run finished: {}", summary);

        match scheduling_error {
            Some(e) => Err(e),
            None => Ok(summary),
        }
    }

    /// Fetches one page and ingests its candidates on a fresh worker pool
    ///
    /// Returns once every candidate has been ingested or has failed.
    async fn process_page(
        &self,
        page: &PageTask,
        stats: &Arc<RunStats>,
    ) -> Result<usize, CrawlError> {
        let document = self.fetcher.fetch(&page.url).await?;

        let posts = self.extractor.extract(&document);
        if posts.is_empty() {
            tracing::warn!("No posts extracted from {}", page.url);
            return Ok(0);
        }

        let count = posts.len();
        stats.add_candidates(count);

        let jobs: Vec<IngestionJob> = posts
            .into_iter()
            .map(|post| {
                IngestionJob::new(
                    post,
                    self.repository.clone(),
                    self.ingest_ctx.clone(),
                    stats.clone(),
                )
            })
            .collect();

        WorkerPool::new(self.config.worker_count)
            .with_queue_capacity(self.config.queue_capacity)
            .run_all(jobs)
            .await?;

        Ok(count)
    }
}
