//! Run statistics
//!
//! Page tasks and ingestion jobs record into a shared `RunStats`; the
//! orchestrator snapshots it into a `RunSummary` once every page finished.

use crate::model::Outcome;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters shared by every task of one run
#[derive(Debug, Default)]
pub struct RunStats {
    pages_scheduled: AtomicU64,
    pages_processed: AtomicU64,
    pages_failed: AtomicU64,
    pages_skipped: AtomicU64,
    candidates: AtomicU64,
    created: AtomicU64,
    updated: AtomicU64,
    unchanged: AtomicU64,
    failed: AtomicU64,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, outcome: Outcome) {
        let counter = match outcome {
            Outcome::Created => &self.created,
            Outcome::Updated => &self.updated,
            Outcome::Unchanged => &self.unchanged,
            Outcome::Failed => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn page_scheduled(&self) {
        self.pages_scheduled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn page_processed(&self) {
        self.pages_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn page_failed(&self) {
        self.pages_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn page_skipped(&self) {
        self.pages_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_candidates(&self, count: usize) {
        self.candidates.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RunSummary {
        RunSummary {
            pages_scheduled: self.pages_scheduled.load(Ordering::Relaxed),
            pages_processed: self.pages_processed.load(Ordering::Relaxed),
            pages_failed: self.pages_failed.load(Ordering::Relaxed),
            pages_skipped: self.pages_skipped.load(Ordering::Relaxed),
            candidates: self.candidates.load(Ordering::Relaxed),
            created: self.created.load(Ordering::Relaxed),
            updated: self.updated.load(Ordering::Relaxed),
            unchanged: self.unchanged.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Aggregate result of one crawl run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Pages that acquired a permit
    pub pages_scheduled: u64,

    /// Pages fetched, extracted and fully drained
    pub pages_processed: u64,

    /// Pages whose fetch or processing failed
    pub pages_failed: u64,

    /// Pages never started because the run was cancelled
    pub pages_skipped: u64,

    /// Post candidates extracted across all pages
    pub candidates: u64,

    pub created: u64,
    pub updated: u64,
    pub unchanged: u64,
    pub failed: u64,
}

impl RunSummary {
    /// Total repository writes
    pub fn writes(&self) -> u64 {
        self.created + self.updated
    }

    /// Ingestion outcomes recorded, one per candidate that reached a worker
    pub fn outcomes(&self) -> u64 {
        self.created + self.updated + self.unchanged + self.failed
    }

    /// Adds another run's counters into this one
    pub fn merge(&mut self, other: &RunSummary) {
        self.pages_scheduled += other.pages_scheduled;
        self.pages_processed += other.pages_processed;
        self.pages_failed += other.pages_failed;
        self.pages_skipped += other.pages_skipped;
        self.candidates += other.candidates;
        self.created += other.created;
        self.updated += other.updated;
        self.unchanged += other.unchanged;
        self.failed += other.failed;
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pages: {} processed, {} failed, {} skipped; posts: {} created, {} updated, {} unchanged, {} failed",
            self.pages_processed,
            self.pages_failed,
            self.pages_skipped,
            self.created,
            self.updated,
            self.unchanged,
            self.failed
        )
    }
}
