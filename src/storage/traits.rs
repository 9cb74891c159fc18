//! Storage traits and error types
//!
//! This module defines the repository interface the crawler drives and the
//! error types shared by its implementations.

use crate::model::{Post, PostIdentity};
use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// Lookup control signal, not a failure
    #[error("Post not found: {0}")]
    NotFound(PostIdentity),

    #[error("Database error: {0}")]
    Database(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Operation cancelled")]
    Cancelled,
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Key-addressable post storage
///
/// Implementations must tolerate concurrent calls from many ingestion jobs,
/// including concurrent creates of the same identity. Every call receives the
/// run's cancellation token and should refuse work once it has fired.
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Looks up the entry stored under `identity`
    ///
    /// Returns `StorageError::NotFound` when no entry exists.
    async fn find_by_identity(
        &self,
        ctx: &CancellationToken,
        identity: &PostIdentity,
    ) -> StorageResult<Post>;

    /// Stores a new entry
    async fn create(&self, ctx: &CancellationToken, post: &Post) -> StorageResult<Post>;

    /// Rewrites the entry stored under `post.identity`
    async fn update(&self, ctx: &CancellationToken, post: &Post) -> StorageResult<Post>;
}
