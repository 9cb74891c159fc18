//! In-memory post repository
//!
//! Keeps posts in a `HashMap` and counts every call it receives. Used to
//! exercise the ingestion policy without a database.

use crate::model::{Post, PostIdentity};
use crate::storage::traits::{PostRepository, StorageError, StorageResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Snapshot of the calls a `MemoryPostRepository` has served
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepositoryCalls {
    pub finds: u64,
    pub creates: u64,
    pub updates: u64,
}

/// Thread-safe in-memory repository with call accounting
#[derive(Default)]
pub struct MemoryPostRepository {
    posts: Mutex<HashMap<PostIdentity, Post>>,
    finds: AtomicU64,
    creates: AtomicU64,
    updates: AtomicU64,
}

impl MemoryPostRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a repository pre-populated with `posts`, with counters at zero
    pub fn with_posts(posts: impl IntoIterator<Item = Post>) -> Self {
        let map = posts
            .into_iter()
            .map(|post| (post.identity.clone(), post))
            .collect();
        Self {
            posts: Mutex::new(map),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> RepositoryCalls {
        RepositoryCalls {
            finds: self.finds.load(Ordering::SeqCst),
            creates: self.creates.load(Ordering::SeqCst),
            updates: self.updates.load(Ordering::SeqCst),
        }
    }

    pub fn len(&self) -> usize {
        self.posts.lock().map(|posts| posts.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a copy of the stored post under `identity`, if any
    pub fn get(&self, identity: &PostIdentity) -> Option<Post> {
        self.posts
            .lock()
            .ok()
            .and_then(|posts| posts.get(identity).cloned())
    }

    fn lock(&self) -> StorageResult<std::sync::MutexGuard<'_, HashMap<PostIdentity, Post>>> {
        self.posts
            .lock()
            .map_err(|_| StorageError::Database("post map mutex poisoned".to_string()))
    }
}

#[async_trait]
impl PostRepository for MemoryPostRepository {
    async fn find_by_identity(
        &self,
        ctx: &CancellationToken,
        identity: &PostIdentity,
    ) -> StorageResult<Post> {
        if ctx.is_cancelled() {
            return Err(StorageError::Cancelled);
        }
        self.finds.fetch_add(1, Ordering::SeqCst);
        self.lock()?
            .get(identity)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(identity.clone()))
    }

    async fn create(&self, ctx: &CancellationToken, post: &Post) -> StorageResult<Post> {
        if ctx.is_cancelled() {
            return Err(StorageError::Cancelled);
        }
        self.creates.fetch_add(1, Ordering::SeqCst);
        let mut posts = self.lock()?;
        if posts.contains_key(&post.identity) {
            return Err(StorageError::ConstraintViolation(format!(
                "post {} already exists",
                post.identity
            )));
        }
        posts.insert(post.identity.clone(), post.clone());
        Ok(post.clone())
    }

    async fn update(&self, ctx: &CancellationToken, post: &Post) -> StorageResult<Post> {
        if ctx.is_cancelled() {
            return Err(StorageError::Cancelled);
        }
        self.updates.fetch_add(1, Ordering::SeqCst);
        let mut posts = self.lock()?;
        match posts.get_mut(&post.identity) {
            Some(stored) => {
                *stored = post.clone();
                Ok(post.clone())
            }
            None => Err(StorageError::NotFound(post.identity.clone())),
        }
    }
}
