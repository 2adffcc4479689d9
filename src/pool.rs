//! Bounded worker pool with a completion barrier.
//!
//! ```text
//!   submit(item) ──► pending += 1 ──► rayon queue (unbounded)
//!                                          │
//!                      ┌───────────────────┼───────────────────┐
//!                      ▼                   ▼                   ▼
//!                  worker 1            worker 2     ...    worker N
//!                      │                   │                   │
//!                      └──── work(item); pending -= 1 ─────────┘
//!                                          │
//!   wait() ◄──────────── notify when pending == 0
//! ```
//!
//! The queue in front of the workers is unbounded, so a task may submit more
//! tasks to its own pool without deadlocking when every worker is busy. The
//! child is counted before the parent finishes, so `wait()` never observes a
//! premature zero.

use crate::log;
use parking_lot::{Condvar, Mutex, RwLock};
use std::{
    any::Any,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};
use thiserror::Error;

/// Worker pool errors
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("pool `{0}` needs at least one worker")]
    ZeroWorkers(&'static str),

    #[error("pool `{0}` has been released")]
    Released(&'static str),

    #[error("failed to start pool `{0}`")]
    Build(&'static str, #[source] rayon::ThreadPoolBuildError),
}

type WorkFn<T> = dyn Fn(T) + Send + Sync + 'static;

/// Outstanding task counter with a condition variable to wait on.
#[derive(Default)]
struct Pending {
    count: Mutex<usize>,
    done: Condvar,
}

impl Pending {
    fn add(&self) {
        *self.count.lock() += 1;
    }

    fn finish(&self) {
        let mut count = self.count.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.done.notify_all();
        }
    }
}

/// A fixed-size pool of workers applying one function to submitted items.
pub struct TaskPool<T: Send + 'static> {
    name: &'static str,
    size: usize,
    pool: RwLock<Option<rayon::ThreadPool>>,
    work: Arc<WorkFn<T>>,
    pending: Arc<Pending>,
}

impl<T: Send + 'static> TaskPool<T> {
    /// Start `size` workers that call `work` for every submitted item.
    pub fn new(
        name: &'static str,
        size: usize,
        work: impl Fn(T) + Send + Sync + 'static,
    ) -> Result<Self, PoolError> {
        if size == 0 {
            return Err(PoolError::ZeroWorkers(name));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(size)
            .thread_name(move |i| format!("{name}-{i}"))
            .build()
            .map_err(|e| PoolError::Build(name, e))?;

        Ok(Self {
            name,
            size,
            pool: RwLock::new(Some(pool)),
            work: Arc::new(work),
            pending: Arc::default(),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of submitted items that have not finished yet.
    pub fn pending(&self) -> usize {
        *self.pending.count.lock()
    }

    /// Queue one item. Never blocks on worker availability.
    pub fn submit(&self, item: T) -> Result<(), PoolError> {
        let guard = self.pool.read();
        let Some(pool) = guard.as_ref() else {
            return Err(PoolError::Released(self.name));
        };

        self.pending.add();
        let work = Arc::clone(&self.work);
        let pending = Arc::clone(&self.pending);
        let name = self.name;

        pool.spawn(move || {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| (*work)(item))) {
                log!("error"; "{name} task panicked: {}", panic_message(panic.as_ref()));
            }
            drop(work);
            pending.finish();
        });
        Ok(())
    }

    /// Block until every submitted item has been processed.
    ///
    /// Must not be called from inside one of this pool's own tasks.
    pub fn wait(&self) {
        let mut count = self.pending.count.lock();
        while *count > 0 {
            self.pending.done.wait(&mut count);
        }
    }

    /// Stop accepting work and let the worker threads exit. Idempotent.
    pub fn release(&self) {
        self.pool.write().take();
    }
}

impl<T: Send + 'static> Drop for TaskPool<T> {
    fn drop(&mut self) {
        self.pool.get_mut().take();
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        OnceLock, Weak,
        atomic::{AtomicUsize, Ordering},
    };

    #[test]
    fn test_zero_workers_rejected() {
        let result = TaskPool::new("test", 0, |_: u32| {});
        assert!(matches!(result, Err(PoolError::ZeroWorkers("test"))));
    }

    #[test]
    fn test_wait_sees_every_task() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);
        let pool = TaskPool::new("test", 4, move |n: usize| {
            c.fetch_add(n, Ordering::SeqCst);
        })
        .unwrap();

        for _ in 0..1000 {
            pool.submit(1).unwrap();
        }
        pool.wait();

        assert_eq!(counter.load(Ordering::SeqCst), 1000);
        assert_eq!(pool.pending(), 0);
    }

    #[test]
    fn test_wait_can_be_reused() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);
        let pool = TaskPool::new("test", 2, move |_: ()| {
            c.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        for round in 1..=3 {
            for _ in 0..10 {
                pool.submit(()).unwrap();
            }
            pool.wait();
            assert_eq!(counter.load(Ordering::SeqCst), round * 10);
        }
    }

    #[test]
    fn test_wait_without_work_returns() {
        let pool = TaskPool::new("test", 1, |_: ()| {}).unwrap();
        pool.wait();
    }

    #[test]
    fn test_nested_submit_on_saturated_pool() {
        // One worker, each task queues its successor: the queue absorbs it.
        let slot: Arc<OnceLock<Weak<TaskPool<u32>>>> = Arc::new(OnceLock::new());
        let seen = Arc::new(AtomicUsize::new(0));

        let (s, w) = (Arc::clone(&slot), Arc::clone(&seen));
        let pool = Arc::new(
            TaskPool::new("test", 1, move |n: u32| {
                w.fetch_add(1, Ordering::SeqCst);
                if n > 0 {
                    if let Some(pool) = s.get().and_then(Weak::upgrade) {
                        pool.submit(n - 1).unwrap();
                    }
                }
            })
            .unwrap(),
        );
        slot.set(Arc::downgrade(&pool)).ok();

        pool.submit(50).unwrap();
        pool.wait();
        assert_eq!(seen.load(Ordering::SeqCst), 51);
    }

    #[test]
    fn test_panicking_task_still_completes() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);
        let pool = TaskPool::new("test", 2, move |n: u32| {
            if n == 3 {
                panic!("boom");
            }
            c.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        for n in 0..6 {
            pool.submit(n).unwrap();
        }
        pool.wait();
        assert_eq!(counter.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_release_is_idempotent() {
        let pool = TaskPool::new("test", 1, |_: ()| {}).unwrap();
        assert_eq!((pool.name(), pool.size()), ("test", 1));
        pool.submit(()).unwrap();
        pool.wait();

        pool.release();
        pool.release();

        assert!(matches!(pool.submit(()), Err(PoolError::Released("test"))));
    }
}
