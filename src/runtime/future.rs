//! Result wrappers for the async and reactive flavors.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use futures::stream::BoxStream;
use tokio::task::JoinHandle;

use crate::core::{DataError, Result};

/// Cold multi-value producer: nothing runs until the stream is polled, and
/// dropping it abandons the backend call.
pub type Flux<T> = BoxStream<'static, Result<T>>;

/// Cold single-value producer.
pub type Mono<T> = BoxFuture<'static, Result<T>>;

/// Pending result of an async repository call.
///
/// The call is already running on the tokio runtime when this is returned.
/// Dropping the future detaches it; [`cancel`](Self::cancel) aborts it.
/// Failures that happen before the call starts (no runtime, unknown method)
/// are delivered through the future as well.
#[must_use = "the call runs regardless, but its result is lost if the future is dropped"]
pub struct DataFuture<T> {
    state: State<T>,
}

enum State<T> {
    Running(JoinHandle<Result<T>>),
    Failed(Option<DataError>),
}

impl<T: Send + 'static> DataFuture<T> {
    /// Spawn `task` on the current tokio runtime.
    pub fn spawn<F>(task: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => Self {
                state: State::Running(runtime.spawn(task)),
            },
            Err(err) => Self::failed(DataError::NoRuntime(err.to_string())),
        }
    }
}

impl<T> DataFuture<T> {
    /// Already-failed call.
    pub fn failed(err: DataError) -> Self {
        Self {
            state: State::Failed(Some(err)),
        }
    }

    pub fn cancel(&self) {
        if let State::Running(handle) = &self.state {
            handle.abort();
        }
    }

    pub fn is_finished(&self) -> bool {
        match &self.state {
            State::Running(handle) => handle.is_finished(),
            State::Failed(_) => true,
        }
    }
}

impl<T> Future for DataFuture<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.state {
            State::Running(handle) => match Pin::new(handle).poll(cx) {
                Poll::Ready(Ok(result)) => Poll::Ready(result),
                Poll::Ready(Err(err)) if err.is_cancelled() => {
                    Poll::Ready(Err(DataError::Backend("call was cancelled".to_string())))
                }
                Poll::Ready(Err(err)) => Poll::Ready(Err(err.into())),
                Poll::Pending => Poll::Pending,
            },
            State::Failed(err) => Poll::Ready(Err(err.take().unwrap_or_else(|| {
                DataError::Backend("future polled after completion".to_string())
            }))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn resolves_spawned_result() {
        let future = DataFuture::spawn(async { Ok(41 + 1) });
        assert_eq!(future.await.unwrap(), 42);
    }

    #[tokio::test]
    async fn cancel_aborts_the_call() {
        let future = DataFuture::spawn(async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        });
        future.cancel();
        assert!(matches!(future.await, Err(DataError::Backend(_))));
    }

    #[test]
    fn spawning_outside_a_runtime_fails() {
        let future = DataFuture::spawn(async { Ok(()) });
        assert!(future.is_finished());
        let result = futures::executor::block_on(future);
        assert!(matches!(result, Err(DataError::NoRuntime(_))));
    }
}
