//! Bounded background sync pool
//!
//! Task creation hands outbound syncs to this pool instead of spawning a
//! detached task per request. The queue has a fixed capacity and enqueueing
//! never waits: a full queue is reported to the caller, who leaves the task
//! `Pending` for a later retry. Shutdown stops intake and lets the workers
//! finish every job already accepted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::SyncConfig;
use crate::utils::errors::{Result, TodoBridgeError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncJob {
    pub task_id: Uuid,
    /// Whose Notion credential performs the sync
    pub acting_user_id: Uuid,
    pub database_id: String,
}

#[async_trait]
pub trait SyncJobHandler: Send + Sync {
    async fn handle(&self, job: SyncJob) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub enqueued: u64,
    pub succeeded: u64,
    pub failed: u64,
}

#[derive(Default)]
struct Counters {
    enqueued: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

pub struct SyncQueue {
    sender: std::sync::Mutex<Option<mpsc::Sender<SyncJob>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    counters: Arc<Counters>,
}

impl SyncQueue {
    /// Spawn `workers` consumers on the current runtime
    pub fn start(handler: Arc<dyn SyncJobHandler>, workers: usize, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let counters = Arc::new(Counters::default());

        let handles = (0..workers.max(1))
            .map(|worker| {
                let receiver = receiver.clone();
                let handler = handler.clone();
                let counters = counters.clone();
                tokio::spawn(async move { run_worker(worker, receiver, handler, counters).await })
            })
            .collect();

        info!(workers = workers.max(1), capacity = capacity.max(1), "Sync worker pool started");

        Self {
            sender: std::sync::Mutex::new(Some(sender)),
            workers: Mutex::new(handles),
            counters,
        }
    }

    pub fn from_config(handler: Arc<dyn SyncJobHandler>, config: &SyncConfig) -> Self {
        Self::start(handler, config.workers, config.queue_capacity)
    }

    /// Accept a job without waiting for room
    pub fn enqueue(&self, job: SyncJob) -> Result<()> {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or(TodoBridgeError::QueueClosed)?;

        sender.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(job) => {
                warn!(task_id = %job.task_id, "Sync queue is full");
                TodoBridgeError::QueueFull
            }
            mpsc::error::TrySendError::Closed(_) => TodoBridgeError::QueueClosed,
        })?;

        self.counters.enqueued.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            enqueued: self.counters.enqueued.load(Ordering::Relaxed),
            succeeded: self.counters.succeeded.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }

    /// Close the queue and wait until every accepted job has run
    pub async fn shutdown(&self) {
        let sender = self.sender.lock().unwrap_or_else(|e| e.into_inner()).take();
        drop(sender);

        let handles: Vec<JoinHandle<()>> = self.workers.lock().await.drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Sync worker ended abnormally");
            }
        }

        let stats = self.stats();
        info!(
            enqueued = stats.enqueued,
            succeeded = stats.succeeded,
            failed = stats.failed,
            "Sync worker pool drained"
        );
    }
}

async fn run_worker(
    worker: usize,
    receiver: Arc<Mutex<mpsc::Receiver<SyncJob>>>,
    handler: Arc<dyn SyncJobHandler>,
    counters: Arc<Counters>,
) {
    loop {
        // the lock is released before the job runs
        let job = receiver.lock().await.recv().await;
        let Some(job) = job else {
            break;
        };

        debug!(worker = worker, task_id = %job.task_id, "Running sync job");
        match handler.handle(job.clone()).await {
            Ok(()) => {
                counters.succeeded.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!(worker = worker, task_id = %job.task_id, error = %e, "Sync job failed");
            }
        }
    }
    debug!(worker = worker, "Sync worker stopped");
}
