//! Asynchronous TTL application.
//!
//! Writes return before their expiry is set: the EXPIRE command is queued
//! and applied by a fixed set of worker tasks, each job on its own pooled
//! connection.
//!
//! This is best effort. A job that is dropped (queue full, scheduler shut
//! down with [`ShutdownPolicy::Discard`], process exit) or fails leaves its
//! entry without a TTL, and the entry lives until it is invalidated.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use super::store_facade::StoreFacade;
use crate::domain::models::TtlSchedulerConfig;
use crate::domain::ports::ConnectionPool;

/// What happens to queued expirations on shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownPolicy {
    /// Stop accepting jobs and apply the ones already queued.
    Drain,
    /// Stop accepting jobs and throw away the ones already queued.
    Discard,
}

/// Counters describing scheduler activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TtlSchedulerStats {
    /// Jobs accepted into the queue.
    pub scheduled: u64,
    /// EXPIRE commands that completed.
    pub applied: u64,
    /// EXPIRE commands that returned an error.
    pub failed: u64,
    /// Jobs never run: rejected by a full or closed queue, or discarded.
    pub dropped: u64,
}

#[derive(Debug)]
struct ExpireJob {
    key: String,
    seconds: u64,
}

#[derive(Debug, Default)]
struct Counters {
    scheduled: AtomicU64,
    applied: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

/// Bounded worker pool applying EXPIRE commands in the background.
pub struct TtlScheduler {
    sender: Mutex<Option<mpsc::Sender<ExpireJob>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    discard: Arc<AtomicBool>,
    counters: Arc<Counters>,
}

impl TtlScheduler {
    /// Spawn the workers. Must be called inside a tokio runtime.
    pub fn start<P: ConnectionPool>(store: Arc<StoreFacade<P>>, config: &TtlSchedulerConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let discard = Arc::new(AtomicBool::new(false));
        let counters = Arc::new(Counters::default());

        let workers = (0..config.workers.max(1))
            .map(|worker| {
                tokio::spawn(run_worker(
                    worker,
                    store.clone(),
                    rx.clone(),
                    discard.clone(),
                    counters.clone(),
                ))
            })
            .collect();

        tracing::debug!(
            workers = config.workers.max(1),
            queue_capacity = config.queue_capacity.max(1),
            "ttl scheduler started"
        );

        Self {
            sender: Mutex::new(Some(tx)),
            workers: Mutex::new(workers),
            discard,
            counters,
        }
    }

    /// Queue an EXPIRE for `key`. Never waits on the store.
    pub fn schedule(&self, key: impl Into<String>, seconds: u64) {
        let job = ExpireJob {
            key: key.into(),
            seconds,
        };
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();

        let Some(sender) = sender else {
            self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(key = %job.key, "ttl scheduler is shut down, expiry not applied");
            return;
        };

        match sender.try_send(job) {
            Ok(()) => {
                self.counters.scheduled.fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Full(job)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(key = %job.key, seconds = job.seconds, "ttl queue full, expiry dropped");
            }
            Err(TrySendError::Closed(job)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(key = %job.key, "ttl queue closed, expiry dropped");
            }
        }
    }

    /// Snapshot of the job counters.
    pub fn stats(&self) -> TtlSchedulerStats {
        TtlSchedulerStats {
            scheduled: self.counters.scheduled.load(Ordering::Relaxed),
            applied: self.counters.applied.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }

    /// True once [`shutdown`](Self::shutdown) has been called.
    pub fn is_shut_down(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .is_none()
    }

    /// Stop accepting jobs and wait for the workers to exit.
    ///
    /// With [`ShutdownPolicy::Drain`] queued jobs still run; with
    /// [`ShutdownPolicy::Discard`] they are counted as dropped. Calling this
    /// more than once is harmless.
    pub async fn shutdown(&self, policy: ShutdownPolicy) {
        if policy == ShutdownPolicy::Discard {
            self.discard.store(true, Ordering::SeqCst);
        }
        drop(
            self.sender
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .take(),
        );

        let workers: Vec<_> = std::mem::take(
            &mut *self
                .workers
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner),
        );
        for handle in workers {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "ttl worker ended abnormally");
            }
        }
        tracing::debug!(?policy, stats = ?self.stats(), "ttl scheduler stopped");
    }
}

impl Drop for TtlScheduler {
    fn drop(&mut self) {
        // Dropping without shutdown discards whatever is still queued; the
        // workers exit once the channel closes.
        let workers = self
            .workers
            .get_mut()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if !workers.is_empty() {
            self.discard.store(true, Ordering::SeqCst);
        }
    }
}

async fn run_worker<P: ConnectionPool>(
    worker: usize,
    store: Arc<StoreFacade<P>>,
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<ExpireJob>>>,
    discard: Arc<AtomicBool>,
    counters: Arc<Counters>,
) {
    loop {
        let job = {
            let mut rx = rx.lock().await;
            rx.recv().await
        };
        let Some(job) = job else {
            break;
        };

        if discard.load(Ordering::SeqCst) {
            counters.dropped.fetch_add(1, Ordering::Relaxed);
            continue;
        }

        match store.expire(&job.key, job.seconds).await {
            Ok(existed) => {
                counters.applied.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(worker, key = %job.key, seconds = job.seconds, existed, "expiry applied");
            }
            Err(e) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(worker, key = %job.key, error = %e, "failed to apply expiry");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryStore;

    fn config(workers: usize, queue_capacity: usize) -> TtlSchedulerConfig {
        TtlSchedulerConfig {
            workers,
            queue_capacity,
        }
    }

    #[tokio::test]
    async fn test_drain_applies_queued_jobs() {
        let store = Arc::new(MemoryStore::new());
        let facade = Arc::new(StoreFacade::new(store.clone()));
        facade.set("a", "1").await.unwrap();
        facade.set("b", "1").await.unwrap();

        let scheduler = TtlScheduler::start(facade.clone(), &config(2, 16));
        scheduler.schedule("a", 60);
        scheduler.schedule("b", 60);
        scheduler.shutdown(ShutdownPolicy::Drain).await;

        let stats = scheduler.stats();
        assert_eq!(stats.scheduled, 2);
        assert_eq!(stats.applied, 2);
        assert!(facade.ttl("a").await.unwrap() > 0);
        assert!(facade.ttl("b").await.unwrap() > 0);
    }

    #[tokio::test]
    async fn test_schedule_after_shutdown_is_dropped() {
        let facade = Arc::new(StoreFacade::new(Arc::new(MemoryStore::new())));
        let scheduler = TtlScheduler::start(facade, &config(1, 4));
        scheduler.shutdown(ShutdownPolicy::Drain).await;
        assert!(scheduler.is_shut_down());

        scheduler.schedule("a", 10);
        assert_eq!(scheduler.stats().dropped, 1);
        assert_eq!(scheduler.stats().scheduled, 0);

        // second shutdown is a no-op
        scheduler.shutdown(ShutdownPolicy::Discard).await;
    }

    #[tokio::test]
    async fn test_failed_expire_is_counted_not_propagated() {
        let store = Arc::new(MemoryStore::new());
        let facade = Arc::new(StoreFacade::new(store.clone()));
        let scheduler = TtlScheduler::start(facade, &config(1, 4));

        store.fail_commands(true);
        scheduler.schedule("a", 10);
        scheduler.shutdown(ShutdownPolicy::Drain).await;

        let stats = scheduler.stats();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.applied, 0);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_discard_drops_queued_jobs() {
        let store = Arc::new(MemoryStore::new());
        let facade = Arc::new(StoreFacade::new(store.clone()));
        facade.set("a", "1").await.unwrap();

        // On a current-thread runtime the workers cannot run before the
        // shutdown call yields, so both jobs are still queued.
        let scheduler = TtlScheduler::start(facade.clone(), &config(1, 4));
        scheduler.schedule("a", 60);
        scheduler.schedule("a", 60);
        scheduler.shutdown(ShutdownPolicy::Discard).await;

        let stats = scheduler.stats();
        assert_eq!(stats.scheduled, 2);
        assert_eq!(stats.dropped, 2);
        assert_eq!(stats.applied, 0);
        assert_eq!(facade.ttl("a").await.unwrap(), -1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_full_queue_drops_instead_of_blocking() {
        let facade = Arc::new(StoreFacade::new(Arc::new(MemoryStore::new())));
        let scheduler = TtlScheduler::start(facade, &config(1, 1));

        scheduler.schedule("a", 10);
        scheduler.schedule("b", 10);

        let stats = scheduler.stats();
        assert_eq!(stats.scheduled, 1);
        assert_eq!(stats.dropped, 1);
        scheduler.shutdown(ShutdownPolicy::Drain).await;
    }
}
