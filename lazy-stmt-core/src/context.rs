use crate::{Error, Result};
use async_stream::try_stream;
use futures::{
    Stream, StreamExt,
    future::{self, BoxFuture, FutureExt, select_all},
};
use std::{
    error,
    fmt::{self, Display},
    future::Future,
    pin::pin,
    time::Duration,
};
use tokio::{
    sync::watch,
    time::{Instant, sleep_until},
};

/// Reason a `Context` is done.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextError {
    /// `CancelHandle::cancel` was called on this context or on one of its parents.
    Canceled,
    /// The deadline passed.
    DeadlineExceeded,
}

impl Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ContextError::Canceled => "Context canceled",
            ContextError::DeadlineExceeded => "Context deadline exceeded",
        })
    }
}

impl error::Error for ContextError {}

/// Cancellation signal and deadline carried into a database call.
///
/// Contexts form a tree: a child created with `with_timeout`, `with_deadline` or `with_cancel`
/// is done as soon as its parent is done, and can only shorten the parent's deadline.
///
/// ```
/// use lazy_stmt_core::{Context, ContextError};
/// let (context, cancel) = Context::background().with_cancel();
/// let child = context.with_timeout(std::time::Duration::from_secs(60));
/// assert_eq!(child.err(), None);
/// cancel.cancel();
/// assert_eq!(child.err(), Some(ContextError::Canceled));
/// ```
#[derive(Clone, Debug, Default)]
pub struct Context {
    deadline: Option<Instant>,
    signals: Vec<watch::Receiver<bool>>,
}

/// Cancels the `Context` it was created with (and all of its children).
///
/// Dropping the handle does not cancel.
#[derive(Debug)]
pub struct CancelHandle(watch::Sender<bool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }
}

impl Context {
    /// A context that is never done.
    pub fn background() -> Self {
        Self::default()
    }
    /// Child context done at `deadline` at the latest.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let mut result = self.clone();
        result.deadline = Some(match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        });
        result
    }
    /// Child context done after `timeout` at the latest.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }
    /// Child context with its own cancellation handle.
    pub fn with_cancel(&self) -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        let mut result = self.clone();
        result.signals.push(rx);
        (result, CancelHandle(tx))
    }
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
    /// Why the context is done, `None` while it is not.
    ///
    /// Cancellation wins over an expired deadline.
    pub fn err(&self) -> Option<ContextError> {
        if self.signals.iter().any(|v| *v.borrow()) {
            return Some(ContextError::Canceled);
        }
        if let Some(deadline) = self.deadline
            && Instant::now() >= deadline
        {
            return Some(ContextError::DeadlineExceeded);
        }
        None
    }
    /// Completes when the context is done.
    pub async fn done(&self) -> ContextError {
        let mut waits: Vec<BoxFuture<'static, ContextError>> =
            Vec::with_capacity(self.signals.len() + 1);
        if let Some(deadline) = self.deadline {
            waits.push(
                async move {
                    sleep_until(deadline).await;
                    ContextError::DeadlineExceeded
                }
                .boxed(),
            );
        }
        for signal in &self.signals {
            let mut signal = signal.clone();
            waits.push(
                async move {
                    if signal.wait_for(|v| *v).await.is_err() {
                        // Handle dropped without cancelling
                        future::pending::<()>().await;
                    }
                    ContextError::Canceled
                }
                .boxed(),
            );
        }
        if waits.is_empty() {
            return future::pending().await;
        }
        select_all(waits).await.0
    }
    /// Run `future` unless the context is done first.
    ///
    /// The future is dropped as soon as the context is done.
    pub async fn run<T>(&self, future: impl Future<Output = Result<T>>) -> Result<T> {
        if let Some(error) = self.err() {
            return Err(Error::new(error));
        }
        tokio::select! {
            biased;
            error = self.done() => Err(Error::new(error)),
            result = future => result,
        }
    }
    /// Bound every item of `stream` by this context.
    ///
    /// After the context is done the stream yields the `ContextError` and ends.
    pub fn guard_stream<T: Send>(
        &self,
        stream: impl Stream<Item = Result<T>> + Send,
    ) -> impl Stream<Item = Result<T>> + Send {
        let context = self.clone();
        try_stream! {
            let mut stream = pin!(stream);
            while let Some(item) = context.run(stream.next().map(Ok)).await? {
                yield item?;
            }
        }
    }
}
