use super::monitor::TableMonitor;
use crate::core::errors::Result;
use crate::core::shutdown::ShutdownSignal;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{error, info};

/// One fork in the ring: a binary exclusion lock with an identity
#[derive(Debug)]
pub struct Fork {
    id: usize,
    lock: Arc<Mutex<()>>,
}

impl Fork {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Block until `philosopher` holds this fork, or the shutdown signal fires.
    /// The returned guard releases the fork when dropped.
    pub async fn acquire(
        &self,
        philosopher: usize,
        monitor: &Arc<TableMonitor>,
        shutdown: &ShutdownSignal,
    ) -> Result<ForkGuard> {
        info!(
            philosopher,
            fork = self.id,
            "[filósofo {}] esperando tenedor {}...",
            philosopher,
            self.id
        );
        monitor.waiting(philosopher, self.id);

        let guard = match shutdown
            .guard("acquire fork", Arc::clone(&self.lock).lock_owned())
            .await
        {
            Ok(guard) => guard,
            Err(e) => {
                monitor.gave_up(philosopher);
                return Err(e);
            }
        };
        monitor.acquired(philosopher, self.id)?;

        info!(
            philosopher,
            fork = self.id,
            "[filósofo {}] tomó tenedor {}",
            philosopher,
            self.id
        );
        Ok(ForkGuard {
            fork: self.id,
            philosopher,
            monitor: Arc::clone(monitor),
            guard: Some(guard),
        })
    }

    /// Non-blocking variant, `None` if the fork is taken
    pub fn try_acquire(
        &self,
        philosopher: usize,
        monitor: &Arc<TableMonitor>,
    ) -> Result<Option<ForkGuard>> {
        let guard = match Arc::clone(&self.lock).try_lock_owned() {
            Ok(guard) => guard,
            Err(_) => return Ok(None),
        };
        monitor.acquired(philosopher, self.id)?;
        Ok(Some(ForkGuard {
            fork: self.id,
            philosopher,
            monitor: Arc::clone(monitor),
            guard: Some(guard),
        }))
    }
}

/// Exclusive hold on one fork.
///
/// The monitor is updated before the lock is unlocked, so its holder count
/// never sees two owners of the same fork.
#[derive(Debug)]
pub struct ForkGuard {
    fork: usize,
    philosopher: usize,
    monitor: Arc<TableMonitor>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl ForkGuard {
    pub fn fork(&self) -> usize {
        self.fork
    }

    /// Release the fork, surfacing a protocol violation if there is one
    pub fn release(mut self) -> Result<()> {
        self.release_inner()
    }

    fn release_inner(&mut self) -> Result<()> {
        match self.guard.take() {
            Some(guard) => {
                let recorded = self.monitor.released(self.philosopher, self.fork);
                drop(guard);
                recorded
            }
            None => Ok(()),
        }
    }
}

impl Drop for ForkGuard {
    fn drop(&mut self) {
        if let Err(e) = self.release_inner() {
            error!(philosopher = self.philosopher, fork = self.fork, "{}", e);
        }
    }
}

/// Both forks of one philosopher, in acquisition order.
///
/// Released in reverse order: `second` is declared first so it is also
/// dropped first on any early exit.
#[derive(Debug)]
pub struct ForkPair {
    second: ForkGuard,
    first: ForkGuard,
}

impl ForkPair {
    pub fn new(first: ForkGuard, second: ForkGuard) -> Self {
        Self { second, first }
    }

    /// Fork ids in the order they were acquired
    pub fn acquisition_order(&self) -> (usize, usize) {
        (self.first.fork(), self.second.fork())
    }

    pub fn release(self) -> Result<()> {
        let ForkPair { second, first } = self;
        let second = second.release();
        let first = first.release();
        second.and(first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_guard_releases_on_drop() {
        let monitor = Arc::new(TableMonitor::new(2));
        let fork = Fork::new(1);
        let shutdown = ShutdownSignal::never();

        let guard = fork.acquire(0, &monitor, &shutdown).await.unwrap();
        assert_eq!(monitor.holders(1), 1);
        assert!(fork.try_acquire(1, &monitor).unwrap().is_none());

        drop(guard);
        assert_eq!(monitor.holders(1), 0);
        let guard = fork.try_acquire(1, &monitor).unwrap();
        assert!(guard.is_some());
    }

    #[tokio::test]
    async fn test_pair_release_order() {
        let monitor = Arc::new(TableMonitor::new(5));
        let shutdown = ShutdownSignal::never();
        let low = Fork::new(0);
        let high = Fork::new(4);

        let first = low.acquire(4, &monitor, &shutdown).await.unwrap();
        let second = high.acquire(4, &monitor, &shutdown).await.unwrap();
        let pair = ForkPair::new(first, second);
        assert_eq!(pair.acquisition_order(), (0, 4));
        assert_eq!(monitor.concurrent_diners(), 1);

        pair.release().unwrap();
        assert_eq!(monitor.holders(0), 0);
        assert_eq!(monitor.holders(4), 0);
        assert_eq!(monitor.concurrent_diners(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_wait_leaves_no_trace() {
        let monitor = Arc::new(TableMonitor::new(2));
        let fork = Fork::new(0);
        let (trigger, shutdown) = crate::core::shutdown::shutdown_channel();

        let _held = fork.acquire(0, &monitor, &shutdown).await.unwrap();
        trigger.trigger();
        let err = fork.acquire(1, &monitor, &shutdown).await.unwrap_err();
        assert_eq!(err.category(), "cancelled");
        assert!(monitor.wait_for_cycle().is_none());
        assert_eq!(monitor.holders(0), 1);
    }
}
