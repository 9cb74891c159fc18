//! Bounded worker pool
//!
//! A fixed number of workers pull tasks from one bounded queue. The pool has
//! an explicit lifecycle:
//!
//! 1. `start` spawns the workers
//! 2. `submit` enqueues a task, waiting while the queue is full
//! 3. `stop` closes the queue and waits until every submitted task finished
//!
//! Each task runs in its own tokio task so a panic is contained to it; the
//! worker logs the panic and moves on. Dropping a running pool without
//! calling `stop` closes the queue; the detached workers still drain what was
//! already submitted.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

/// Unit of work executed by a `WorkerPool`
///
/// Tasks report their own failures; the pool never sees a result.
#[async_trait]
pub trait Process: Send + 'static {
    async fn process(self);
}

/// Lifecycle misuse
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("worker pool has not been started")]
    NotStarted,

    #[error("worker pool is already running")]
    AlreadyStarted,

    #[error("worker pool is closed")]
    Closed,
}

enum PoolState<T> {
    Idle,
    Running {
        sender: mpsc::Sender<T>,
        workers: Vec<JoinHandle<()>>,
    },
    Stopped,
}

/// Generic bounded-concurrency executor
pub struct WorkerPool<T: Process> {
    workers: usize,
    queue_capacity: usize,
    state: PoolState<T>,
}

impl<T: Process> WorkerPool<T> {
    /// Creates an idle pool with `workers` workers and an equally sized queue
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            workers,
            queue_capacity: workers,
            state: PoolState::Idle,
        }
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, PoolState::Running { .. })
    }

    /// Spawns the workers
    pub fn start(&mut self) -> Result<(), PoolError> {
        match self.state {
            PoolState::Idle => {}
            PoolState::Running { .. } => return Err(PoolError::AlreadyStarted),
            PoolState::Stopped => return Err(PoolError::Closed),
        }

        let (sender, receiver) = mpsc::channel::<T>(self.queue_capacity);
        let receiver = Arc::new(Mutex::new(receiver));

        let workers = (0..self.workers)
            .map(|id| tokio::spawn(run_worker(id, receiver.clone())))
            .collect();

        tracing::trace!("Started worker pool with {} workers", self.workers);
        self.state = PoolState::Running { sender, workers };
        Ok(())
    }

    /// Enqueues a task, waiting for queue space
    pub async fn submit(&self, task: T) -> Result<(), PoolError> {
        match &self.state {
            PoolState::Idle => Err(PoolError::NotStarted),
            PoolState::Stopped => Err(PoolError::Closed),
            PoolState::Running { sender, .. } => {
                sender.send(task).await.map_err(|_| PoolError::Closed)
            }
        }
    }

    /// Closes the queue and waits for every submitted task to finish
    ///
    /// Calling `stop` on a stopped pool is a no-op.
    pub async fn stop(&mut self) -> Result<(), PoolError> {
        let state = std::mem::replace(&mut self.state, PoolState::Stopped);

        if let PoolState::Running { sender, workers } = state {
            drop(sender);
            for worker in workers {
                if let Err(e) = worker.await {
                    tracing::error!("Worker exited abnormally: {}", e);
                }
            }
            tracing::trace!("Worker pool drained");
        }

        Ok(())
    }

    /// Starts the pool, submits every task and stops it
    ///
    /// Once started here, the pool is stopped on every exit path, so when this
    /// returns all accepted tasks have finished. Returns the first lifecycle
    /// error.
    pub async fn run_all(
        &mut self,
        tasks: impl IntoIterator<Item = T>,
    ) -> Result<(), PoolError> {
        self.start()?;

        let mut submitted = Ok(());
        for task in tasks {
            if let Err(e) = self.submit(task).await {
                submitted = Err(e);
                break;
            }
        }

        self.stop().await?;
        submitted
    }
}

impl<T: Process> Drop for WorkerPool<T> {
    fn drop(&mut self) {
        if self.is_running() {
            tracing::warn!("Worker pool dropped while running; queued tasks drain in background");
        }
    }
}

async fn run_worker<T: Process>(id: usize, receiver: Arc<Mutex<mpsc::Receiver<T>>>) {
    loop {
        let task = {
            let mut receiver = receiver.lock().await;
            receiver.recv().await
        };

        let Some(task) = task else {
            break;
        };

        if let Err(e) = tokio::spawn(task.process()).await {
            tracing::error!("Worker {} task panicked: {}", id, e);
        }
    }
}
