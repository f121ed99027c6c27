//! Asynchronous handle for a submitted batch.

use futures::future::{self, BoxFuture, FutureExt};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::task::JoinHandle;

use crate::converter::{ConversionResult, ConverterError};

/// Output of a batch: ordered results, or the reason no results exist.
pub type BatchOutcome = Result<Vec<ConversionResult>, ConverterError>;

/// Completes exactly once, with the ordered results or with an error.
///
/// Awaiting it from any task is fine; the batch itself keeps running on the
/// runtime even if the handle is dropped.
pub struct BatchHandle {
    inner: BoxFuture<'static, BatchOutcome>,
}

impl BatchHandle {
    /// Wraps a spawned batch task.
    pub(crate) fn spawned(task: JoinHandle<BatchOutcome>) -> Self {
        let inner = async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(e) => Err(ConverterError::aborted(e.to_string())),
            }
        };
        Self {
            inner: inner.boxed(),
        }
    }

    /// A handle that is already complete with `error`.
    pub fn failed(error: ConverterError) -> Self {
        Self {
            inner: future::ready(Err(error)).boxed(),
        }
    }
}

impl Future for BatchHandle {
    type Output = BatchOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.poll_unpin(cx)
    }
}

impl fmt::Debug for BatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchHandle").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::ValidationError;

    #[test]
    fn test_failed_handle_resolves_immediately() {
        let handle = BatchHandle::failed(ValidationError::EmptyBatch.into());
        let outcome = tokio_test::block_on(handle);
        let err = outcome.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "No input files provided.");
    }

    #[tokio::test]
    async fn test_spawned_handle_yields_task_output() {
        let task: JoinHandle<BatchOutcome> =
            tokio::spawn(async { Ok(vec![ConversionResult::skipped("/in/a.wav")]) });
        let results = BatchHandle::spawned(task).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_skipped());
    }

    #[tokio::test]
    async fn test_panicked_task_becomes_aborted() {
        let task: JoinHandle<BatchOutcome> = tokio::spawn(async { panic!("worker exploded") });
        let err = BatchHandle::spawned(task).await.unwrap_err();
        assert!(matches!(err, ConverterError::Aborted { .. }));
    }
}
