use std::{fmt::Display, time::Duration};

use metrics::{counter, histogram};

use super::InternalEvent;

#[derive(Debug)]
pub struct DeleteOperationRunning<'a> {
    pub resource: &'a str,
}

impl InternalEvent for DeleteOperationRunning<'_> {
    fn emit_logs(&self) {
        info!(message = "Deleting resources.", resource = %self.resource);
    }

    fn emit_metrics(&self) {
        counter!("delete_operations_total", "status" => "running").increment(1);
    }
}

#[derive(Debug)]
pub struct DeleteOperationDone<'a> {
    pub resource: &'a str,
    pub elapsed: Duration,
}

impl InternalEvent for DeleteOperationDone<'_> {
    fn emit_logs(&self) {
        info!(
            message = "Resources deleted.",
            resource = %self.resource,
            elapsed_ms = self.elapsed.as_millis() as u64,
        );
    }

    fn emit_metrics(&self) {
        counter!("delete_operations_total", "status" => "done").increment(1);
        histogram!("delete_operation_duration_seconds").record(self.elapsed.as_secs_f64());
    }
}

#[derive(Debug)]
pub struct DeleteOperationFailed<'a, E> {
    pub resource: &'a str,
    pub error: E,
}

impl<E: Display> InternalEvent for DeleteOperationFailed<'_, E> {
    fn emit_logs(&self) {
        error!(
            message = "Failed to delete resources.",
            resource = %self.resource,
            error = %self.error,
        );
    }

    fn emit_metrics(&self) {
        counter!("delete_operations_total", "status" => "error").increment(1);
    }
}

#[derive(Debug)]
pub struct CandidateDeleted<'a, K> {
    pub kind: &'a str,
    pub key: K,
}

impl<K: Display> InternalEvent for CandidateDeleted<'_, K> {
    fn emit_logs(&self) {
        debug!(message = "Delete request accepted.", kind = %self.kind, key = %self.key);
    }

    fn emit_metrics(&self) {
        counter!("delete_requests_total", "outcome" => "accepted").increment(1);
    }
}

#[derive(Debug)]
pub struct CandidateAlreadyAbsent<'a, K> {
    pub kind: &'a str,
    pub key: K,
}

impl<K: Display> InternalEvent for CandidateAlreadyAbsent<'_, K> {
    fn emit_logs(&self) {
        debug!(message = "Resource already absent.", kind = %self.kind, key = %self.key);
    }

    fn emit_metrics(&self) {
        counter!("delete_requests_total", "outcome" => "not_found").increment(1);
    }
}

#[derive(Debug)]
pub struct CandidateDeletionConfirmed<'a, K> {
    pub kind: &'a str,
    pub key: K,
    pub polls: usize,
}

impl<K: Display> InternalEvent for CandidateDeletionConfirmed<'_, K> {
    fn emit_logs(&self) {
        debug!(
            message = "Resource removal confirmed.",
            kind = %self.kind,
            key = %self.key,
            polls = self.polls,
        );
    }

    fn emit_metrics(&self) {
        counter!("delete_confirmation_polls_total").increment(self.polls as u64);
    }
}
