//! Ingestion policy
//!
//! Decides, for one post candidate, whether the repository needs a create, an
//! update or nothing at all. Lookups go by identity only. Repository failures
//! end as `Outcome::Failed` here and never travel further.

use crate::crawler::pool::Process;
use crate::crawler::stats::RunStats;
use crate::model::{Outcome, Post};
use crate::storage::PostRepository;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Reconciles one candidate against the repository
pub async fn apply(
    candidate: &Post,
    repository: &dyn PostRepository,
    ctx: &CancellationToken,
) -> Outcome {
    let stored = match repository.find_by_identity(ctx, &candidate.identity).await {
        Ok(stored) => stored,
        Err(e) if e.is_not_found() => {
            return match repository.create(ctx, candidate).await {
                Ok(_) => {
                    tracing::info!("Added post: {}", candidate.name);
                    Outcome::Created
                }
                Err(e) => {
                    tracing::error!("Failed to add post {}: {}", candidate.name, e);
                    Outcome::Failed
                }
            };
        }
        Err(e) => {
            tracing::error!("Failed to look up post {}: {}", candidate.name, e);
            return Outcome::Failed;
        }
    };

    // Identity covers name and link only; a changed tag alone is not a change
    if stored.identity == candidate.identity {
        tracing::debug!("Unchanged post: {}", candidate.name);
        return Outcome::Unchanged;
    }

    match repository.update(ctx, candidate).await {
        Ok(_) => {
            tracing::info!("Updated post: {}", candidate.name);
            Outcome::Updated
        }
        Err(e) => {
            tracing::error!("Failed to update post {}: {}", candidate.name, e);
            Outcome::Failed
        }
    }
}

/// One candidate queued for ingestion on a worker pool
pub struct IngestionJob {
    post: Post,
    repository: Arc<dyn PostRepository>,
    ctx: CancellationToken,
    stats: Arc<RunStats>,
}

impl IngestionJob {
    pub fn new(
        post: Post,
        repository: Arc<dyn PostRepository>,
        ctx: CancellationToken,
        stats: Arc<RunStats>,
    ) -> Self {
        Self {
            post,
            repository,
            ctx,
            stats,
        }
    }
}

#[async_trait]
impl Process for IngestionJob {
    async fn process(self) {
        let outcome = apply(&self.post, self.repository.as_ref(), &self.ctx).await;
        self.stats.record(outcome);
    }
}
