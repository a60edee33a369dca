use crate::core::errors::{KernelError, Result};
use std::future::Future;
use tokio::sync::watch;

/// Create a linked trigger/signal pair
pub fn shutdown_channel() -> (ShutdownTrigger, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, ShutdownSignal { rx })
}

/// Owner side of a cancellation signal
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }
}

/// Cancellation signal observed by every blocking acquire
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// A signal that never fires
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the trigger fires. Pends forever if the trigger was
    /// dropped without firing.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// Run `fut` unless the signal fires first
    pub async fn guard<F, T>(&self, operation: &str, fut: F) -> Result<T>
    where
        F: Future<Output = T>,
    {
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(KernelError::cancelled(operation)),
            value = fut => Ok(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_guard_passes_through() {
        let signal = ShutdownSignal::never();
        let value = signal.guard("noop", async { 42 }).await.unwrap();
        assert_eq!(value, 42);
        assert!(!signal.is_triggered());
    }

    #[tokio::test]
    async fn test_trigger_interrupts_pending_wait() {
        let (trigger, signal) = shutdown_channel();
        let waiter = tokio::spawn(async move {
            signal
                .guard("sleep", tokio::time::sleep(Duration::from_secs(3600)))
                .await
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        trigger.trigger();

        let result = waiter.await.unwrap();
        assert!(matches!(result, Err(KernelError::Cancelled { .. })));
    }

    #[tokio::test]
    async fn test_late_subscriber_sees_trigger() {
        let (trigger, _signal) = shutdown_channel();
        trigger.trigger();
        assert!(trigger.signal().is_triggered());
    }
}
