//! SQLite storage implementation
//!
//! This module provides a SQLite-backed `PostRepository` plus the run ledger
//! that records every crawl invocation.

use crate::crawler::RunSummary;
use crate::model::{Post, PostIdentity};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{PostRepository, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// SQLite storage backend
///
/// A single connection is shared behind a mutex; statements are short, so
/// concurrent ingestion jobs simply serialize on it.
pub struct SqlitePostRepository {
    conn: Mutex<Connection>,
}

impl SqlitePostRepository {
    /// Opens (or creates) the database at `path` and applies the schema
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StorageError::Database("connection mutex poisoned".to_string()))?;
        f(&conn)
    }

    fn find_sync(&self, identity: &PostIdentity) -> StorageResult<Post> {
        self.with_conn(|conn| {
            let post = conn
                .query_row(
                    "SELECT post_id, name, link, tag FROM posts WHERE post_id = ?1",
                    params![identity.as_str()],
                    |row| {
                        Ok(Post::from_stored(
                            row.get(1)?,
                            row.get(2)?,
                            row.get(3)?,
                            PostIdentity::from_stored(row.get::<_, String>(0)?),
                        ))
                    },
                )
                .optional()?;

            post.ok_or_else(|| StorageError::NotFound(identity.clone()))
        })
    }

    fn create_sync(&self, post: &Post) -> StorageResult<Post> {
        self.with_conn(|conn| {
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO posts (post_id, name, link, tag, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![post.identity.as_str(), post.name, post.link, post.tag, now],
            )
            .map_err(|e| map_constraint(e, &post.identity))?;
            Ok(post.clone())
        })
    }

    fn update_sync(&self, post: &Post) -> StorageResult<Post> {
        self.with_conn(|conn| {
            let now = Utc::now().to_rfc3339();
            let changed = conn.execute(
                "UPDATE posts SET name = ?1, link = ?2, tag = ?3, updated_at = ?4 WHERE post_id = ?5",
                params![post.name, post.link, post.tag, now, post.identity.as_str()],
            )?;

            if changed == 0 {
                return Err(StorageError::NotFound(post.identity.clone()));
            }
            Ok(post.clone())
        })
    }

    /// Counts all stored posts
    pub fn count_posts(&self) -> StorageResult<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))?;
            Ok(count as u64)
        })
    }

    /// Counts stored posts grouped by tag, most common first
    pub fn count_posts_by_tag(&self) -> StorageResult<Vec<(String, u64)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT tag, COUNT(*) AS n FROM posts GROUP BY tag ORDER BY n DESC, tag ASC",
            )?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get::<_, i64>(1)? as u64)))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // ===== Run Ledger =====

    /// Records the start of a crawl run for `site`
    pub fn create_run(&self, site: &str, config_hash: &str) -> StorageResult<i64> {
        self.with_conn(|conn| {
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO runs (site, config_hash, started_at, status) VALUES (?1, ?2, ?3, ?4)",
                params![site, config_hash, now, RunStatus::Running.to_db_string()],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Marks a run finished and stores its aggregate statistics
    pub fn complete_run(
        &self,
        run_id: i64,
        status: RunStatus,
        summary: &RunSummary,
    ) -> StorageResult<()> {
        self.with_conn(|conn| {
            let now = Utc::now().to_rfc3339();
            let changed = conn.execute(
                "UPDATE runs SET finished_at = ?1, status = ?2,
                     pages_processed = ?3, pages_failed = ?4, pages_skipped = ?5,
                     posts_created = ?6, posts_updated = ?7, posts_unchanged = ?8, posts_failed = ?9
                 WHERE id = ?10",
                params![
                    now,
                    status.to_db_string(),
                    summary.pages_processed as i64,
                    summary.pages_failed as i64,
                    summary.pages_skipped as i64,
                    summary.created as i64,
                    summary.updated as i64,
                    summary.unchanged as i64,
                    summary.failed as i64,
                    run_id
                ],
            )?;

            if changed == 0 {
                return Err(StorageError::RunNotFound(run_id));
            }
            Ok(())
        })
    }

    /// Gets the most recent run for `site`
    pub fn get_latest_run(&self, site: &str) -> StorageResult<Option<RunRecord>> {
        self.with_conn(|conn| {
            let run = conn
                .query_row(
                    "SELECT id, site, config_hash, started_at, finished_at, status,
                            posts_created, posts_updated, posts_unchanged, posts_failed
                     FROM runs WHERE site = ?1 ORDER BY id DESC LIMIT 1",
                    params![site],
                    |row| {
                        Ok(RunRecord {
                            id: row.get(0)?,
                            site: row.get(1)?,
                            config_hash: row.get(2)?,
                            started_at: row.get(3)?,
                            finished_at: row.get(4)?,
                            status: RunStatus::from_db_string(&row.get::<_, String>(5)?)
                                .unwrap_or(RunStatus::Failed),
                            posts_created: row.get::<_, i64>(6)? as u64,
                            posts_updated: row.get::<_, i64>(7)? as u64,
                            posts_unchanged: row.get::<_, i64>(8)? as u64,
                            posts_failed: row.get::<_, i64>(9)? as u64,
                        })
                    },
                )
                .optional()?;
            Ok(run)
        })
    }
}

/// Maps a primary key collision to a constraint violation
fn map_constraint(err: rusqlite::Error, identity: &PostIdentity) -> StorageError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            StorageError::ConstraintViolation(format!("post {} already exists", identity))
        }
        _ => StorageError::Sqlite(err),
    }
}

fn ensure_live(ctx: &CancellationToken) -> StorageResult<()> {
    if ctx.is_cancelled() {
        return Err(StorageError::Cancelled);
    }
    Ok(())
}

#[async_trait]
impl PostRepository for SqlitePostRepository {
    async fn find_by_identity(
        &self,
        ctx: &CancellationToken,
        identity: &PostIdentity,
    ) -> StorageResult<Post> {
        ensure_live(ctx)?;
        self.find_sync(identity)
    }

    async fn create(&self, ctx: &CancellationToken, post: &Post) -> StorageResult<Post> {
        ensure_live(ctx)?;
        self.create_sync(post)
    }

    async fn update(&self, ctx: &CancellationToken, post: &Post) -> StorageResult<Post> {
        ensure_live(ctx)?;
        self.update_sync(post)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_post() -> Post {
        Post::new("Hello", "https://example.com/hello", "#Rust")
    }

    #[tokio::test]
    async fn test_create_then_find() {
        let repo = SqlitePostRepository::new_in_memory().unwrap();
        let ctx = CancellationToken::new();
        let post = sample_post();

        repo.create(&ctx, &post).await.unwrap();
        let found = repo.find_by_identity(&ctx, &post.identity).await.unwrap();

        assert_eq!(found, post);
        assert_eq!(repo.count_posts().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_find_missing_is_not_found() {
        let repo = SqlitePostRepository::new_in_memory().unwrap();
        let ctx = CancellationToken::new();
        let post = sample_post();

        let err = repo.find_by_identity(&ctx, &post.identity).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_duplicate_create_is_constraint_violation() {
        let repo = SqlitePostRepository::new_in_memory().unwrap();
        let ctx = CancellationToken::new();
        let post = sample_post();

        repo.create(&ctx, &post).await.unwrap();
        let err = repo.create(&ctx, &post).await.unwrap_err();
        assert!(matches!(err, StorageError::ConstraintViolation(_)));
        assert_eq!(repo.count_posts().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_rewrites_tag() {
        let repo = SqlitePostRepository::new_in_memory().unwrap();
        let ctx = CancellationToken::new();
        let post = sample_post();
        repo.create(&ctx, &post).await.unwrap();

        let mut changed = post.clone();
        changed.tag = "tokio".to_string();
        repo.update(&ctx, &changed).await.unwrap();

        let found = repo.find_by_identity(&ctx, &post.identity).await.unwrap();
        assert_eq!(found.tag, "tokio");
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let repo = SqlitePostRepository::new_in_memory().unwrap();
        let ctx = CancellationToken::new();

        let err = repo.update(&ctx, &sample_post()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_cancelled_context_refuses_work() {
        let repo = SqlitePostRepository::new_in_memory().unwrap();
        let ctx = CancellationToken::new();
        ctx.cancel();

        let err = repo.create(&ctx, &sample_post()).await.unwrap_err();
        assert!(matches!(err, StorageError::Cancelled));
        assert_eq!(repo.count_posts().unwrap(), 0);
    }

    #[test]
    fn test_count_posts_by_tag() {
        let repo = SqlitePostRepository::new_in_memory().unwrap();
        repo.create_sync(&Post::new("A", "https://e.com/a", "rust")).unwrap();
        repo.create_sync(&Post::new("B", "https://e.com/b", "rust")).unwrap();
        repo.create_sync(&Post::new("C", "https://e.com/c", "go")).unwrap();

        let tags = repo.count_posts_by_tag().unwrap();
        assert_eq!(tags[0], ("rust".to_string(), 2));
        assert_eq!(tags[1], ("go".to_string(), 1));
    }

    #[test]
    fn test_run_ledger() {
        let repo = SqlitePostRepository::new_in_memory().unwrap();
        let run_id = repo.create_run("quan-cam", "abc123").unwrap();

        let running = repo.get_latest_run("quan-cam").unwrap().unwrap();
        assert_eq!(running.id, run_id);
        assert_eq!(running.status, RunStatus::Running);

        let summary = RunSummary {
            created: 3,
            unchanged: 1,
            ..RunSummary::default()
        };
        repo.complete_run(run_id, RunStatus::Completed, &summary)
            .unwrap();

        let done = repo.get_latest_run("quan-cam").unwrap().unwrap();
        assert_eq!(done.status, RunStatus::Completed);
        assert_eq!(done.posts_created, 3);
        assert_eq!(done.posts_unchanged, 1);
        assert!(done.finished_at.is_some());
        assert!(repo.get_latest_run("other-site").unwrap().is_none());
    }

    #[test]
    fn test_complete_unknown_run() {
        let repo = SqlitePostRepository::new_in_memory().unwrap();
        let err = repo
            .complete_run(42, RunStatus::Completed, &RunSummary::default())
            .unwrap_err();
        assert!(matches!(err, StorageError::RunNotFound(42)));
    }
}
