//! Storage module for persisting crawled posts
//!
//! This module handles all persistence for the crawler, including:
//! - The `PostRepository` capability the ingestion policy drives
//! - A SQLite implementation with a run ledger
//! - An in-memory implementation with call accounting

mod memory;
mod schema;
mod sqlite;
mod traits;

pub use memory::{MemoryPostRepository, RepositoryCalls};
pub use sqlite::SqlitePostRepository;
pub use traits::{PostRepository, StorageError, StorageResult};

use std::path::Path;

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> StorageResult<SqlitePostRepository> {
    SqlitePostRepository::new(path)
}

/// Represents a crawl run in the ledger
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub site: String,
    pub config_hash: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub status: RunStatus,
    pub posts_created: u64,
    pub posts_updated: u64,
    pub posts_unchanged: u64,
    pub posts_failed: u64,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_status_from_db_string() {
        assert_eq!(RunStatus::from_db_string("completed"), Some(RunStatus::Completed));
        assert_eq!(
            RunStatus::from_db_string("interrupted"),
            Some(RunStatus::Interrupted)
        );
        assert_eq!(RunStatus::from_db_string("invalid"), None);
    }

    #[test]
    fn test_open_storage_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("posts.db");

        let repo = open_storage(&path).unwrap();
        assert_eq!(repo.count_posts().unwrap(), 0);
        assert!(path.exists());
    }
}
