use crate::core::delay::DelaySource;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Lifecycle of a single future
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum FutureState {
    Pending = 0,
    Delivered = 1,
    Consumed = 2,
}

impl From<u8> for FutureState {
    fn from(value: u8) -> Self {
        match value {
            0 => FutureState::Pending,
            1 => FutureState::Delivered,
            _ => FutureState::Consumed,
        }
    }
}

/// Handle to a value computed by a spawned task.
///
/// The producer sends exactly one value on a single-slot channel and then
/// closes it. Dropping the handle aborts a producer that has not finished.
#[derive(Debug)]
pub struct FutureHandle<T> {
    rx: mpsc::Receiver<T>,
    state: Arc<AtomicU8>,
    task: Option<JoinHandle<()>>,
}

impl<T> FutureHandle<T> {
    pub fn state(&self) -> FutureState {
        FutureState::from(self.state.load(Ordering::Acquire))
    }

    /// Receive the next value, or `None` once the producer closed the channel
    pub async fn recv(&mut self) -> Option<T> {
        let value = self.rx.recv().await;
        if value.is_some() {
            self.state
                .store(FutureState::Consumed as u8, Ordering::Release);
        }
        value
    }

    /// Wait for the single value and join the producer.
    /// Returns `None` if the producer ended without delivering.
    pub async fn wait(mut self) -> Option<T> {
        let value = self.recv().await;
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                debug!("Future producer did not finish cleanly: {}", e);
            }
        }
        value
    }
}

impl<T> Drop for FutureHandle<T> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Square `input` after a delay drawn from `delays`
pub fn launch(input: i64, delays: Arc<dyn DelaySource>) -> FutureHandle<i64> {
    launch_with("cuadrado", input, delays, |x: i64| x.saturating_mul(x))
}

/// Spawn `transform(input)` behind an artificial delay and return a handle to
/// its eventual result. Must be called from within a tokio runtime.
pub fn launch_with<I, O, F>(
    operation: &'static str,
    input: I,
    delays: Arc<dyn DelaySource>,
    transform: F,
) -> FutureHandle<O>
where
    I: Debug + Send + 'static,
    O: Debug + Send + 'static,
    F: FnOnce(I) -> O + Send + 'static,
{
    let (tx, rx) = mpsc::channel(1);
    let state = Arc::new(AtomicU8::new(FutureState::Pending as u8));
    let producer_state = Arc::clone(&state);

    let task = tokio::spawn(async move {
        let delay = delays.compute_delay();
        info!(
            input = ?input,
            delay_ms = delay.as_millis() as u64,
            "[async] calculando {} de {:?} (tardará {:?})",
            operation,
            input,
            delay
        );
        tokio::time::sleep(delay).await;

        let label = format!("{:?}", input);
        let value = transform(input);
        let rendered = format!("{:?}", value);
        match tx.send(value).await {
            Ok(()) => {
                producer_state.store(FutureState::Delivered as u8, Ordering::Release);
                info!("[async] {} de {} = {} listo", operation, label, rendered);
            }
            Err(_) => debug!(input = %label, "Future handle dropped before delivery"),
        }
        // tx dropped here: the channel closes after the single send
    });

    FutureHandle {
        rx,
        state,
        task: Some(task),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::delay::NoDelay;

    #[tokio::test]
    async fn test_single_value_then_closed() {
        let mut handle = launch(7, Arc::new(NoDelay));
        assert_eq!(handle.recv().await, Some(49));
        assert_eq!(handle.state(), FutureState::Consumed);
        assert_eq!(handle.recv().await, None);
    }

    #[tokio::test]
    async fn test_delivered_before_consumed() {
        let handle = launch(3, Arc::new(NoDelay));
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(handle.state(), FutureState::Delivered);
        assert_eq!(handle.wait().await, Some(9));
    }

    #[tokio::test]
    async fn test_custom_transform() {
        let handle = launch_with("eco", "hola".to_string(), Arc::new(NoDelay), |s| s.len());
        assert_eq!(handle.wait().await, Some(4));
    }

    #[tokio::test]
    async fn test_panicking_producer_is_abandoned() {
        let handle = launch_with("falla", 1u8, Arc::new(NoDelay), |_: u8| -> u8 {
            panic!("boom")
        });
        assert_eq!(handle.wait().await, None);
    }
}
