//! Bounded worker pool with caller-runs backpressure.
//!
//! Admission follows the classic core/max/queue pool:
//!
//! 1. Core workers are started up front and wait on the shared queue.
//! 2. A task goes to the bounded FIFO queue while it has room.
//! 3. With the queue full, a burst worker is started (up to
//!    `max_workers`); it runs the overflowing task first, then drains the
//!    queue until it has been idle for `keep_alive`.
//! 4. With the pool saturated, the submitter runs the task itself and
//!    `submit` returns only once the task is terminal. This throttles the
//!    submitting side instead of dropping work.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use aigc_core::task::Task;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::EngineConfig;
use crate::executor::TaskExecutor;

/// How [`Dispatcher::submit`] placed a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Waiting in the queue for a worker.
    Queued,
    /// Handed to a newly started burst worker.
    Burst,
    /// Executed on the submitting task; already terminal.
    CallerRan,
}

impl Admission {
    pub fn as_str(self) -> &'static str {
        match self {
            Admission::Queued => "queued",
            Admission::Burst => "burst",
            Admission::CallerRan => "caller_ran",
        }
    }
}

impl fmt::Display for Admission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherStats {
    /// Live workers, core and burst.
    pub workers: usize,
    /// Tasks waiting in the queue.
    pub queued: usize,
}

#[derive(Debug, Clone, Copy)]
enum WorkerKind {
    Core,
    Burst,
}

/// State shared by every worker.
#[derive(Clone)]
struct WorkerShared {
    queue: Arc<Mutex<mpsc::Receiver<Task>>>,
    executor: Arc<TaskExecutor>,
    shutdown: CancellationToken,
    keep_alive: Duration,
}

/// Holds one unit of the live worker count; released on drop so a worker
/// that unwinds still frees its slot.
struct WorkerSlot(Arc<AtomicUsize>);

impl Drop for WorkerSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// The task worker pool.
pub struct Dispatcher {
    sender: mpsc::Sender<Task>,
    shared: WorkerShared,
    config: EngineConfig,
    workers: Arc<AtomicUsize>,
    tracker: TaskTracker,
}

impl Dispatcher {
    /// Create the pool and start its core workers.
    ///
    /// Must be called from within a Tokio runtime. `config` is assumed to
    /// have passed [`EngineConfig::validate`].
    pub fn start(config: EngineConfig, executor: TaskExecutor) -> Arc<Self> {
        let (sender, receiver) = mpsc::channel(config.queue_capacity);
        let dispatcher = Arc::new(Self {
            sender,
            shared: WorkerShared {
                queue: Arc::new(Mutex::new(receiver)),
                executor: Arc::new(executor),
                shutdown: CancellationToken::new(),
                keep_alive: config.keep_alive,
            },
            workers: Arc::new(AtomicUsize::new(0)),
            tracker: TaskTracker::new(),
            config,
        });
        dispatcher.replenish_core_workers();

        tracing::info!(
            core_workers = dispatcher.config.core_workers,
            max_workers = dispatcher.config.max_workers,
            queue_capacity = dispatcher.config.queue_capacity,
            keep_alive_secs = dispatcher.config.keep_alive.as_secs(),
            "Task dispatcher started",
        );
        dispatcher
    }

    /// Hand `task` to the pool. Never drops the task.
    ///
    /// Returns [`Admission::CallerRan`] after running the task on the
    /// calling task when the pool is saturated or shutting down.
    pub async fn submit(&self, task: Task) -> Admission {
        let task_id = task.id();

        if self.shared.shutdown.is_cancelled() {
            tracing::warn!(task_id, "Dispatcher shutting down, running task on caller");
            return self.run_on_caller(task).await;
        }

        self.replenish_core_workers();

        let task = match self.sender.try_send(task) {
            Ok(()) => {
                tracing::debug!(task_id, admission = "queued", "Task queued");
                return Admission::Queued;
            }
            Err(TrySendError::Full(task)) => task,
            Err(TrySendError::Closed(task)) => {
                tracing::warn!(task_id, "Dispatch queue closed, running task on caller");
                return self.run_on_caller(task).await;
            }
        };

        if let Some(slot) = self.reserve_slot(self.config.max_workers) {
            self.spawn_worker(WorkerKind::Burst, slot, Some(task));
            tracing::info!(
                task_id,
                admission = "burst",
                workers = self.workers.load(Ordering::SeqCst),
                "Queue full, started burst worker",
            );
            return Admission::Burst;
        }

        tracing::warn!(
            task_id,
            admission = "caller_ran",
            max_workers = self.config.max_workers,
            queue_capacity = self.config.queue_capacity,
            "Dispatcher saturated, running task on caller",
        );
        self.run_on_caller(task).await
    }

    pub fn stats(&self) -> DispatcherStats {
        DispatcherStats {
            workers: self.workers.load(Ordering::SeqCst),
            queued: self.sender.max_capacity() - self.sender.capacity(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Stop accepting queued work, drain what is already queued and wait
    /// for every worker to exit. Later submissions run on the caller.
    pub async fn shutdown(&self) {
        tracing::info!(stats = ?self.stats(), "Task dispatcher shutting down");
        self.shared.shutdown.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        tracing::info!("Task dispatcher stopped");
    }

    async fn run_on_caller(&self, task: Task) -> Admission {
        self.shared.executor.execute(task).await;
        Admission::CallerRan
    }

    /// Restart core workers lost to a panic outside the executor.
    fn replenish_core_workers(&self) {
        while let Some(slot) = self.reserve_slot(self.config.core_workers) {
            self.spawn_worker(WorkerKind::Core, slot, None);
        }
    }

    /// Take a worker slot if fewer than `limit` workers are live.
    fn reserve_slot(&self, limit: usize) -> Option<WorkerSlot> {
        self.workers
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < limit).then_some(n + 1)
            })
            .ok()
            .map(|_| WorkerSlot(Arc::clone(&self.workers)))
    }

    fn spawn_worker(&self, kind: WorkerKind, slot: WorkerSlot, first: Option<Task>) {
        let shared = self.shared.clone();
        self.tracker.spawn(async move {
            let _slot = slot;
            run_worker(shared, kind, first).await;
        });
    }
}

async fn run_worker(shared: WorkerShared, kind: WorkerKind, first: Option<Task>) {
    tracing::debug!(?kind, "Worker started");
    if let Some(task) = first {
        shared.executor.execute(task).await;
    }

    loop {
        let next = match kind {
            WorkerKind::Core => shared.next_task().await,
            WorkerKind::Burst => {
                match tokio::time::timeout(shared.keep_alive, shared.next_task()).await {
                    Ok(next) => next,
                    Err(_) => {
                        tracing::debug!("Burst worker idle, exiting");
                        break;
                    }
                }
            }
        };
        let Some(task) = next else {
            break;
        };
        shared.executor.execute(task).await;
    }
    tracing::debug!(?kind, "Worker stopped");
}

impl WorkerShared {
    /// Next queued task, or `None` once shutdown has drained the queue.
    async fn next_task(&self) -> Option<Task> {
        let mut queue = self.queue.lock().await;
        if self.shutdown.is_cancelled() {
            queue.close();
        }
        tokio::select! {
            biased;
            task = queue.recv() => task,
            () = self.shutdown.cancelled() => {
                // Closing keeps already buffered tasks receivable.
                queue.close();
                queue.recv().await
            }
        }
    }
}
