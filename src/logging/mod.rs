//! Lifecycle reporting for operations.
//!
//! Operations report a fixed vocabulary of statuses through a [`Logger`].
//! Reporting never influences control flow.

use std::{error::Error, fmt, time::Duration};

use crate::internal_events::{
    DeleteOperationDone, DeleteOperationFailed, DeleteOperationRunning,
};

#[cfg(any(test, feature = "mocks"))]
pub mod mock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Delete,
}

impl Operation {
    pub const fn as_str(self) -> &'static str {
        match self {
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Running,
    Done,
    Error,
}

impl Status {
    pub const fn as_str(self) -> &'static str {
        match self {
            Status::Running => "running",
            Status::Done => "done",
            Status::Error => "error",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One lifecycle event.
#[derive(Debug)]
pub struct Event<'a> {
    pub operation: Operation,
    pub status: Status,
    /// Identity of the resource(s) the operation acts on.
    pub resource: &'a str,
    /// Time since the operation started, set on terminal events.
    pub elapsed: Option<Duration>,
    /// The failure, set on [`Status::Error`] events.
    pub error: Option<&'a (dyn Error + 'static)>,
}

/// Sink for operation lifecycle events.
pub trait Logger: Send + Sync {
    fn log(&self, event: &Event<'_>);
}

/// Forwards lifecycle events to `tracing` and `metrics`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, event: &Event<'_>) {
        match (event.operation, event.status) {
            (Operation::Delete, Status::Running) => {
                emit!(DeleteOperationRunning {
                    resource: event.resource
                });
            }
            (Operation::Delete, Status::Done) => {
                emit!(DeleteOperationDone {
                    resource: event.resource,
                    elapsed: event.elapsed.unwrap_or_default(),
                });
            }
            (Operation::Delete, Status::Error) => {
                emit!(DeleteOperationFailed {
                    resource: event.resource,
                    error: ErrorChain(event.error),
                });
            }
        }
    }
}

/// Displays an error followed by its sources, `a: b: c`.
struct ErrorChain<'a>(Option<&'a (dyn Error + 'static)>);

impl fmt::Display for ErrorChain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(error) = self.0 else {
            return f.write_str("unknown error");
        };
        write!(f, "{error}")?;
        let mut source = error.source();
        while let Some(cause) = source {
            let text = cause.to_string();
            // Sources that render their display into the parent add nothing.
            if !error.to_string().contains(&text) {
                write!(f, ": {text}")?;
            }
            source = cause.source();
        }
        Ok(())
    }
}
