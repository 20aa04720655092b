//! Declarative test operations.

use async_trait::async_trait;

use crate::context::Context;

pub mod delete;

pub use self::delete::Delete;

/// A single step of a test, executed against a cluster.
#[async_trait]
pub trait Operation: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Run the operation to completion, or until `ctx` is done.
    async fn exec(&self, ctx: &Context) -> Result<(), Self::Error>;
}
