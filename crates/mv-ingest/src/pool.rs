//! Bounded worker pool.
//!
//! Admission is a counting semaphore: a submitted task is spawned at once
//! but waits for one of `capacity` permits before its body runs. A
//! [`TaskTracker`] follows every spawned task, queued or running, so
//! [`WorkerPool::stop`] can wait for all of them.
//!
//! Submission and the stop flag share one gate, so a task is either handed
//! to the tracker before `stop` closes it or rejected with
//! [`Error::PoolClosed`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use mv_core::{Error, Result, TaskId};
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;

/// Lifecycle of a registered task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Waiting for a free slot.
    Queued,
    /// Holding a slot.
    Running,
}

#[derive(Debug, Clone)]
struct TaskEntry {
    label: String,
    state: TaskState,
    submitted_at: Instant,
}

struct PoolInner {
    capacity: usize,
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
    registry: Mutex<HashMap<TaskId, TaskEntry>>,
    next_id: AtomicU64,
    /// Stop flag. Held across admission in `submit`; never taken by task
    /// wrappers, which only touch `registry`.
    stopped: Mutex<bool>,
}

impl PoolInner {
    fn set_state(&self, id: TaskId, state: TaskState) {
        if let Some(entry) = self.registry.lock().get_mut(&id) {
            entry.state = state;
        }
    }

    fn count(&self, state: TaskState) -> usize {
        self.registry
            .lock()
            .values()
            .filter(|e| e.state == state)
            .count()
    }
}

/// Removes a task from the registry when its wrapper future ends, whether it
/// completed, panicked, or was dropped by a shutting-down runtime.
struct RegistryGuard {
    inner: Arc<PoolInner>,
    id: TaskId,
}

impl Drop for RegistryGuard {
    fn drop(&mut self) {
        if let Some(entry) = self.inner.registry.lock().remove(&self.id) {
            tracing::debug!(
                task = %self.id,
                label = %entry.label,
                elapsed = ?entry.submitted_at.elapsed(),
                "task left pool"
            );
        }
    }
}

/// A pool running at most `capacity` task bodies at once.
///
/// Cloning is cheap and yields a handle to the same pool.
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("capacity", &self.inner.capacity)
            .field("available_permits", &self.inner.permits.available_permits())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

impl WorkerPool {
    /// Create a pool with `max_concurrency` slots. Zero is raised to one.
    pub fn new(max_concurrency: usize) -> Self {
        let capacity = if max_concurrency == 0 {
            tracing::warn!("worker pool concurrency 0 requested, using 1");
            1
        } else {
            max_concurrency
        };

        Self {
            inner: Arc::new(PoolInner {
                capacity,
                permits: Arc::new(Semaphore::new(capacity)),
                tracker: TaskTracker::new(),
                registry: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                stopped: Mutex::new(false),
            }),
        }
    }

    /// Schedule `task` and return immediately.
    ///
    /// The body never runs on the caller's stack. It starts once a slot is
    /// free; ordering among waiting tasks is not guaranteed.
    ///
    /// # Errors
    ///
    /// - [`Error::PoolClosed`] after [`WorkerPool::stop`] has been called.
    /// - [`Error::Internal`] when called outside a tokio runtime.
    pub fn submit<F>(&self, label: impl Into<String>, task: F) -> Result<TaskId>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let stopped = self.inner.stopped.lock();
        if *stopped {
            return Err(Error::PoolClosed);
        }
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Internal(format!("worker pool needs a tokio runtime: {e}")))?;

        let id = TaskId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let label = label.into();
        self.inner.registry.lock().insert(
            id,
            TaskEntry {
                label: label.clone(),
                state: TaskState::Queued,
                submitted_at: Instant::now(),
            },
        );
        tracing::debug!(task = %id, label = %label, "task queued");

        let guard = RegistryGuard {
            inner: Arc::clone(&self.inner),
            id,
        };
        let permits = Arc::clone(&self.inner.permits);

        self.inner.tracker.spawn_on(
            async move {
                let guard = guard;
                let Ok(_permit) = permits.acquire_owned().await else {
                    return;
                };
                guard.inner.set_state(id, TaskState::Running);
                tracing::debug!(task = %id, label = %label, "task started");

                // The body runs in its own task so a panic surfaces as a
                // JoinError here instead of unwinding through the permit.
                match tokio::spawn(task).await {
                    Ok(()) => tracing::debug!(task = %id, label = %label, "task finished"),
                    Err(e) if e.is_panic() => {
                        tracing::error!(task = %id, label = %label, "task panicked")
                    }
                    Err(e) => tracing::warn!(task = %id, label = %label, "task aborted: {e}"),
                }
            },
            &handle,
        );
        drop(stopped);

        Ok(id)
    }

    /// Maximum number of concurrently running task bodies.
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Task bodies currently holding a slot.
    pub fn active_count(&self) -> usize {
        self.inner.count(TaskState::Running)
    }

    /// Tasks submitted but still waiting for a slot.
    pub fn queued_count(&self) -> usize {
        self.inner.count(TaskState::Queued)
    }

    /// Queued plus running tasks.
    pub fn pending_count(&self) -> usize {
        self.inner.registry.lock().len()
    }

    /// Whether [`WorkerPool::stop`] has been called.
    pub fn is_stopped(&self) -> bool {
        *self.inner.stopped.lock()
    }

    /// Refuse new work and wait until every queued and running task is done.
    ///
    /// Safe to call more than once; later calls wait for the same drain.
    pub async fn stop(&self) {
        let first = !std::mem::replace(&mut *self.inner.stopped.lock(), true);
        if first {
            tracing::info!(
                pending = self.pending_count(),
                "worker pool stopping, draining tasks"
            );
        }
        self.inner.tracker.close();
        self.inner.tracker.wait().await;
        tracing::info!("worker pool drained");
    }
}
