#![deny(unused_allocation)]
#![deny(unused_assignments)]
#![deny(unused_comparisons)]

//! Declarative Kubernetes test operations.
//!
//! The crate currently ships a single operation, [`operations::delete::Delete`]:
//! it resolves a target into concrete resources, deletes them, and waits until
//! the API server no longer returns them.

#[macro_use]
extern crate tracing;

#[macro_use]
pub mod internal_events;

pub mod client;
pub mod config;
pub mod context;
pub mod logging;
pub mod namespacer;
pub mod operations;
pub mod poll;
pub mod resolver;
pub mod resource;

#[cfg(test)]
pub mod test_util;

pub use context::Context;
pub use operations::Operation;
