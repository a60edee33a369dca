use super::future::FutureHandle;
use crate::core::errors::{KernelError, Result};
use futures::future::join_all;
use futures::Stream;
use serde::Serialize;
use std::fmt::Debug;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{info, warn};

/// One value observed on the merged stream, tagged with the index of the
/// source it came from. A source that failed yields a single `Err` item.
#[derive(Debug)]
pub struct FanInItem<T> {
    pub source: usize,
    pub outcome: Result<T>,
}

/// What the supervisor saw once every source was drained
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FanInSummary {
    pub sources: usize,
    pub values_forwarded: usize,
    pub failed_sources: usize,
}

/// Values and failures drained from a merged stream, in arrival order
#[derive(Debug)]
pub struct FanInOutput<T> {
    pub values: Vec<T>,
    pub failures: Vec<(usize, KernelError)>,
    pub summary: FanInSummary,
}

/// Output side of [`fan_in`].
///
/// Closes exactly once, after every forwarding task has finished. Dropping
/// the stream early aborts the forwarders and their supervisor.
pub struct MergedStream<T> {
    rx: mpsc::Receiver<FanInItem<T>>,
    supervisor: Option<JoinHandle<FanInSummary>>,
    forwarders: Vec<AbortHandle>,
}

impl<T> Unpin for MergedStream<T> {}

impl<T> MergedStream<T> {
    /// Next item in arrival order, `None` once every source is drained
    pub async fn recv(&mut self) -> Option<FanInItem<T>> {
        self.rx.recv().await
    }

    /// Wait for the supervisor after the stream has been drained
    pub async fn finish(mut self) -> Result<FanInSummary> {
        match self.supervisor.take() {
            Some(supervisor) => Ok(supervisor.await?),
            None => Err(KernelError::join("fan-in supervisor", "already joined")),
        }
    }

    /// Drain every item and join the supervisor
    pub async fn drain(mut self) -> Result<FanInOutput<T>>
    where
        T: Debug,
    {
        let mut values = Vec::new();
        let mut failures = Vec::new();
        while let Some(item) = self.recv().await {
            match item.outcome {
                Ok(value) => {
                    info!(
                        source = item.source,
                        "[main] Resultado {}: {:?}",
                        values.len() + 1,
                        value
                    );
                    values.push(value);
                }
                Err(e) => {
                    warn!(source = item.source, "Fan-in source failed: {}", e);
                    failures.push((item.source, e));
                }
            }
        }
        let summary = self.finish().await?;
        Ok(FanInOutput {
            values,
            failures,
            summary,
        })
    }
}

impl<T> Stream for MergedStream<T> {
    type Item = FanInItem<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

impl<T> Drop for MergedStream<T> {
    fn drop(&mut self) {
        if let Some(supervisor) = self.supervisor.take() {
            supervisor.abort();
            for forwarder in &self.forwarders {
                forwarder.abort();
            }
        }
    }
}

/// Merge many futures into one stream with first-ready-first-served order.
///
/// One forwarding task per source re-emits each value; a supervisor joins
/// all forwarders and only then releases its own sender, which closes the
/// output. Must be called from within a tokio runtime.
pub fn fan_in<T>(sources: Vec<FutureHandle<T>>) -> MergedStream<T>
where
    T: Debug + Send + 'static,
{
    let source_count = sources.len();
    let (tx, rx) = mpsc::channel(source_count.max(1));

    let handles: Vec<JoinHandle<usize>> = sources
        .into_iter()
        .enumerate()
        .map(|(index, mut source)| {
            let tx = tx.clone();
            tokio::spawn(async move {
                let mut forwarded = 0;
                while let Some(value) = source.recv().await {
                    info!(
                        source = index,
                        "[fan-in] reenviando valor {:?} del canal {}",
                        value,
                        index + 1
                    );
                    let item = FanInItem {
                        source: index,
                        outcome: Ok(value),
                    };
                    if tx.send(item).await.is_err() {
                        return forwarded;
                    }
                    forwarded += 1;
                }
                if forwarded == 0 {
                    let item = FanInItem {
                        source: index,
                        outcome: Err(KernelError::abandoned(index)),
                    };
                    let _ = tx.send(item).await;
                }
                info!(source = index, "[fan-in] canal {} cerrado", index + 1);
                forwarded
            })
        })
        .collect();

    let forwarders = handles.iter().map(|h| h.abort_handle()).collect();

    let supervisor = tokio::spawn(async move {
        let mut summary = FanInSummary {
            sources: source_count,
            ..Default::default()
        };
        for (index, outcome) in join_all(handles).await.into_iter().enumerate() {
            match outcome {
                Ok(0) => summary.failed_sources += 1,
                Ok(forwarded) => summary.values_forwarded += forwarded,
                Err(e) => {
                    summary.failed_sources += 1;
                    let item = FanInItem {
                        source: index,
                        outcome: Err(KernelError::from(e)),
                    };
                    let _ = tx.send(item).await;
                }
            }
        }
        info!("[fan-in] todos los canales cerrados, cerrando salida");
        drop(tx);
        summary
    });

    MergedStream {
        rx,
        supervisor: Some(supervisor),
        forwarders,
    }
}
