//! A [`super::Logger`] that records events for assertions.

use std::sync::{Mutex, MutexGuard};

use super::{Event, Operation, Status};

/// An owned copy of a logged [`Event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub operation: Operation,
    pub status: Status,
    pub resource: String,
    pub error: Option<String>,
}

/// Mock logger.
#[derive(Debug, Default)]
pub struct Logger {
    records: Mutex<Vec<Record>>,
}

impl Logger {
    pub fn new() -> Self {
        Self::default()
    }

    fn records_mut(&self) -> MutexGuard<'_, Vec<Record>> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn records(&self) -> Vec<Record> {
        self.records_mut().clone()
    }

    /// Logged statuses, in order.
    pub fn statuses(&self) -> Vec<Status> {
        self.records_mut()
            .iter()
            .map(|record| record.status)
            .collect()
    }
}

impl super::Logger for Logger {
    fn log(&self, event: &Event<'_>) {
        self.records_mut().push(Record {
            operation: event.operation,
            status: event.status,
            resource: event.resource.to_owned(),
            error: event.error.map(ToString::to_string),
        });
    }
}
