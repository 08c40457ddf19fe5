//! Fixed-size pool of tracer resources shared by admitted workers

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Semaphore;

use crate::error::{TracevalError, TracevalResult};
use crate::trace::RunTracer;

/// Pool of pre-built [`RunTracer`]s, sized to the batch's concurrency level.
///
/// Because the pool size equals the admission-gate bound, a checkout performed
/// after admission finds a tracer available; the semaphore only exists to make
/// the checkout contract ("block until available") hold on its own.
#[derive(Debug)]
pub struct TracerPool {
    slots: Mutex<Vec<RunTracer>>,
    available: Semaphore,
    size: usize,
    checked_out: AtomicUsize,
    peak_checked_out: AtomicUsize,
}

impl TracerPool {
    /// Wrap already-constructed tracers. Construction (session setup) happens
    /// before this, once per tracer, so a failed build never yields a partial
    /// pool.
    pub fn new(tracers: Vec<RunTracer>) -> Arc<Self> {
        let size = tracers.len();
        Arc::new(Self {
            slots: Mutex::new(tracers),
            available: Semaphore::new(size),
            size,
            checked_out: AtomicUsize::new(0),
            peak_checked_out: AtomicUsize::new(0),
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Tracers currently held by workers
    pub fn checked_out(&self) -> usize {
        self.checked_out.load(Ordering::SeqCst)
    }

    /// Highest simultaneous checkout count observed over the pool's lifetime
    pub fn peak_checked_out(&self) -> usize {
        self.peak_checked_out.load(Ordering::SeqCst)
    }

    /// Wait for a tracer and take exclusive ownership of it until the guard
    /// drops
    pub async fn checkout(self: &Arc<Self>) -> TracevalResult<PooledTracer> {
        let permit = self
            .available
            .acquire()
            .await
            .map_err(|_| TracevalError::other("tracer pool closed"))?;
        permit.forget();

        let tracer = self
            .slots
            .lock()
            .pop()
            .expect("an availability permit guarantees a pooled tracer");

        let now = self.checked_out.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_checked_out.fetch_max(now, Ordering::SeqCst);

        Ok(PooledTracer {
            tracer: Some(tracer),
            pool: Arc::clone(self),
        })
    }

    fn checkin(&self, tracer: RunTracer) {
        self.slots.lock().push(tracer);
        self.checked_out.fetch_sub(1, Ordering::SeqCst);
        self.available.add_permits(1);
    }
}

/// Exclusive hold on one pooled tracer.
///
/// Dropping the guard returns the tracer to the pool on every exit path,
/// success or failure, so a failed evaluation can never starve the pool.
#[derive(Debug)]
pub struct PooledTracer {
    tracer: Option<RunTracer>,
    pool: Arc<TracerPool>,
}

impl Deref for PooledTracer {
    type Target = RunTracer;

    fn deref(&self) -> &RunTracer {
        self.tracer
            .as_ref()
            .expect("tracer is held until the guard drops")
    }
}

impl DerefMut for PooledTracer {
    fn deref_mut(&mut self) -> &mut RunTracer {
        self.tracer
            .as_mut()
            .expect("tracer is held until the guard drops")
    }
}

impl Drop for PooledTracer {
    fn drop(&mut self) {
        if let Some(tracer) = self.tracer.take() {
            self.pool.checkin(tracer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn pool_of(n: usize) -> Arc<TracerPool> {
        TracerPool::new((0..n).map(|i| RunTracer::in_memory(format!("s-{i}"))).collect())
    }

    #[tokio::test]
    async fn checkout_and_drop_cycle_the_same_resources() {
        let pool = pool_of(2);
        {
            let first = pool.checkout().await.unwrap();
            let second = pool.checkout().await.unwrap();
            assert_eq!(pool.checked_out(), 2);
            assert_ne!(first.session_name(), second.session_name());
        }
        assert_eq!(pool.checked_out(), 0);
        assert_eq!(pool.peak_checked_out(), 2);

        // Both tracers are available again
        let _first = pool.checkout().await.unwrap();
        let _second = pool.checkout().await.unwrap();
    }

    #[tokio::test]
    async fn checkout_blocks_until_a_tracer_returns() {
        let pool = pool_of(1);
        let held = pool.checkout().await.unwrap();

        let waiter = {
            let pool = Arc::clone(&pool);
            tokio::spawn(async move { pool.checkout().await.unwrap().session_name().to_string() })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        drop(held);
        assert_eq!(waiter.await.unwrap(), "s-0");
    }

    #[tokio::test]
    async fn guard_derefs_to_a_mutable_tracer() {
        let pool = pool_of(1);
        let mut guard = pool.checkout().await.unwrap();
        let id = crate::types::ExampleId::new();
        guard.set_example_id(Some(id));
        assert_eq!(guard.example_id(), Some(id));
    }
}
