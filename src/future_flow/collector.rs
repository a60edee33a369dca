use super::future::FutureHandle;
use crate::core::errors::{KernelError, Result};
use tracing::info;

/// Await each handle strictly in the order given.
///
/// Handle `i + 1` is not polled until handle `i` has resolved, so the output
/// order always matches the input order even when later futures finish first.
pub async fn await_all<T>(handles: Vec<FutureHandle<T>>) -> Result<Vec<T>>
where
    T: std::fmt::Debug,
{
    let mut results = Vec::with_capacity(handles.len());
    for (index, handle) in handles.into_iter().enumerate() {
        let value = handle
            .wait()
            .await
            .ok_or_else(|| KernelError::abandoned(index))?;
        info!(index = index + 1, "[main] Resultado {}: {:?}", index + 1, value);
        results.push(value);
    }
    Ok(results)
}
