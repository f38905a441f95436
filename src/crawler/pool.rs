//! Bounded task pool
//!
//! A fixed number of slots caps how much crawl work is in flight at once.
//! Submission applies back-pressure: `spawn` waits for a free slot instead
//! of queueing unbounded work. A task that returns an error (or panics)
//! only gives up its own slot; siblings and the draining loop are never
//! affected.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Fixed-capacity pool of concurrent crawl tasks
pub struct TaskPool {
    semaphore: Arc<Semaphore>,
    in_flight: Arc<AtomicUsize>,
    capacity: usize,
}

/// Releases a pool slot when the task finishes, errors, or panics
struct SlotGuard {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl TaskPool {
    /// Creates a pool with the given number of slots
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            capacity,
        }
    }

    /// Submits a task, waiting until a slot is free
    ///
    /// The task's error is logged and confined to the task itself.
    pub async fn spawn<F>(&self, label: String, task: F)
    where
        F: Future<Output = crate::Result<()>> + Send + 'static,
    {
        let permit = match self.semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            // The semaphore is never closed while the pool exists.
            Err(_) => {
                tracing::error!("task pool unavailable, dropping task {}", label);
                return;
            }
        };

        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let guard = SlotGuard {
            _permit: permit,
            in_flight: Arc::clone(&self.in_flight),
        };

        tokio::spawn(async move {
            let _slot = guard;
            if let Err(e) = task.await {
                tracing::warn!("task {} failed: {}", label, e);
            }
        });
    }

    /// True when every slot is idle and no submission is pending
    pub fn is_idle(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) == 0
    }

    /// Number of slots
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn wait_until_idle(pool: &TaskPool) {
        for _ in 0..100 {
            if pool.is_idle() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("pool never became idle");
    }

    #[tokio::test]
    async fn test_concurrency_never_exceeds_capacity() {
        let pool = TaskPool::new(5);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        for i in 0..20 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            pool.spawn(format!("task {}", i), async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            })
            .await;
        }

        wait_until_idle(&pool).await;
        assert!(peak.load(Ordering::SeqCst) <= 5);
        assert!(peak.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test]
    async fn test_failing_task_frees_its_slot() {
        let pool = TaskPool::new(2);

        for i in 0..6 {
            pool.spawn(format!("task {}", i), async move {
                Err(crate::LivetideError::TaskFailed("boom".to_string()))
            })
            .await;
        }

        // Every submission got a slot despite all predecessors failing.
        wait_until_idle(&pool).await;
    }

    #[tokio::test]
    async fn test_is_idle_reflects_in_flight_work() {
        let pool = TaskPool::new(1);
        assert!(pool.is_idle());

        pool.spawn("sleeper".to_string(), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(())
        })
        .await;

        assert!(!pool.is_idle());
        wait_until_idle(&pool).await;
    }
}
