//! Cancellation and deadline propagation for operation executions.
//!
//! A [`Context`] bundles a [`CancellationToken`] with an optional deadline.
//! Every suspension point of an operation is raced against it via
//! [`Context::wrap`] or [`Context::run`], so a cancelled or expired context
//! interrupts in-flight cluster calls and poll ticks promptly.

use std::{future::Future, time::Duration};

use snafu::Snafu;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

/// Why a [`Context`] is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Snafu)]
pub enum Error {
    #[snafu(display("context cancelled"))]
    Cancelled,

    #[snafu(display("context deadline exceeded"))]
    DeadlineExceeded,
}

#[derive(Debug, Clone)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl Context {
    /// A context that is never done unless explicitly cancelled.
    pub fn background() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    /// Derive a child context whose deadline is `timeout` from now, or the
    /// parent's deadline if that is earlier.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derive a child context bounded by `deadline`.
    ///
    /// Cancelling the parent cancels the child; cancelling the child leaves
    /// the parent untouched.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(current) if current < deadline => current,
            _ => deadline,
        };
        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Resolves once the context is cancelled or its deadline elapses.
    pub async fn done(&self) -> Error {
        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                _ = self.token.cancelled() => Error::Cancelled,
                _ = sleep_until(deadline) => Error::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                Error::Cancelled
            }
        }
    }

    /// Drive `future` to completion unless the context is done first.
    ///
    /// A context that is already done never polls `future`.
    pub async fn wrap<F>(&self, future: F) -> Result<F::Output, Error>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            error = self.done() => Err(error),
            output = future => Ok(output),
        }
    }

    /// Like [`Context::wrap`] for fallible futures, folding the context error
    /// into the future's own error type.
    pub async fn run<F, T, E>(&self, future: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: From<Error>,
    {
        self.wrap(future).await?
    }
}
