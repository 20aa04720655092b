//! Delete resources and wait until the API server stops returning them.
//!
//! Deletion in Kubernetes is asynchronous: an accepted delete request only
//! marks an object for removal, and finalizers may hold it back for a while.
//! [`Delete`] therefore issues every delete first and then polls each
//! candidate, one after the other, until a read reports it as not found.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use kube::core::GroupVersionKind;
use snafu::{ResultExt, Snafu};
use tokio::time::Instant;

use super::Operation;
use crate::{
    client::{self, Client, Propagation},
    context::{self, Context},
    internal_events::{CandidateAlreadyAbsent, CandidateDeleted, CandidateDeletionConfirmed},
    logging::{self, Logger, Status, TracingLogger},
    namespacer::{self, Namespacer},
    poll,
    resolver::{ClientResolver, Resolve},
    resource::{self, ObjectKey, TargetSpec},
};

/// Period between two existence checks of a deleted resource.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Why a delete operation failed.
///
/// Each variant displays its source unchanged.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    /// The namespacer rejected the target.
    #[snafu(display("{}", source))]
    Namespace { source: namespacer::Error },

    /// The target doesn't describe a valid kind.
    #[snafu(display("{}", source))]
    InvalidTarget { source: resource::Error },

    /// Candidates couldn't be resolved for a reason other than absence.
    #[snafu(display("{}", source))]
    Resolution { source: client::Error },

    /// The API server refused to delete a candidate.
    #[snafu(display("{}", source))]
    Deletion { key: ObjectKey, source: client::Error },

    /// A candidate couldn't be confirmed gone, either because a read failed
    /// or because the context was done first.
    #[snafu(display("{}", source))]
    Confirmation { key: ObjectKey, source: client::Error },
}

impl Error {
    /// The candidate the failure relates to, if any.
    pub const fn key(&self) -> Option<&ObjectKey> {
        match self {
            Error::Deletion { key, .. } | Error::Confirmation { key, .. } => Some(key),
            _ => None,
        }
    }

    /// The context error, when the operation was cut short by cancellation
    /// or a deadline.
    pub fn interruption(&self) -> Option<context::Error> {
        match self {
            Error::Namespace {
                source: namespacer::Error::Interrupted { source },
            } => Some(*source),
            Error::Resolution { source }
            | Error::Deletion { source, .. }
            | Error::Confirmation { source, .. } => source.interruption(),
            _ => None,
        }
    }
}

/// Deletes the resources designated by a target and waits for their removal.
pub struct Delete {
    client: Arc<dyn Client>,
    target: TargetSpec,
    namespacer: Option<Arc<dyn Namespacer>>,
    resolver: Arc<dyn Resolve>,
    logger: Arc<dyn Logger>,
    propagation: Propagation,
}

impl Delete {
    /// Candidates are read from `client` unless another resolver is set, and
    /// lifecycle events go to `tracing`.
    pub fn new(client: Arc<dyn Client>, target: TargetSpec) -> Self {
        Self {
            resolver: Arc::new(ClientResolver::new(Arc::clone(&client))),
            client,
            target,
            namespacer: None,
            logger: Arc::new(TracingLogger),
            propagation: Propagation::default(),
        }
    }

    pub fn with_namespacer(mut self, namespacer: Arc<dyn Namespacer>) -> Self {
        self.namespacer = Some(namespacer);
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn Resolve>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub const fn with_propagation(mut self, propagation: Propagation) -> Self {
        self.propagation = propagation;
        self
    }

    fn log(
        &self,
        status: Status,
        resource: &str,
        elapsed: Option<Duration>,
        error: Option<&(dyn std::error::Error + 'static)>,
    ) {
        self.logger.log(&logging::Event {
            operation: logging::Operation::Delete,
            status,
            resource,
            elapsed,
            error,
        });
    }

    async fn run(&self, ctx: &Context, target: &mut TargetSpec) -> Result<(), Error> {
        if let Some(namespacer) = &self.namespacer {
            ctx.run(namespacer.apply(target))
                .await
                .context(NamespaceSnafu)?;
        }

        self.log(Status::Running, &target.to_string(), None, None);

        let gvk = target.gvk().context(InvalidTargetSnafu)?;

        let candidates = match ctx.run(self.resolver.resolve(&gvk, target)).await {
            Ok(candidates) => candidates,
            Err(error) if error.is_not_found() => {
                debug!(message = "Nothing to delete.", %error);
                return Ok(());
            }
            Err(source) => return Err(Error::Resolution { source }),
        };

        for candidate in &candidates {
            let deleted = ctx
                .run(
                    self.client
                        .delete(&candidate.gvk, &candidate.key, self.propagation),
                )
                .await;
            match deleted {
                Ok(()) => {
                    emit!(CandidateDeleted {
                        kind: &candidate.gvk.kind,
                        key: &candidate.key,
                    });
                }
                Err(error) if error.is_not_found() => {
                    emit!(CandidateAlreadyAbsent {
                        kind: &candidate.gvk.kind,
                        key: &candidate.key,
                    });
                }
                Err(source) => {
                    return Err(Error::Deletion {
                        key: candidate.key.clone(),
                        source,
                    });
                }
            }
        }

        for candidate in &candidates {
            let polls = poll::until_done(ctx, POLL_INTERVAL, true, || {
                self.is_gone(&gvk, &candidate.key)
            })
            .await
            .context(ConfirmationSnafu {
                key: candidate.key.clone(),
            })?;
            emit!(CandidateDeletionConfirmed {
                kind: &gvk.kind,
                key: &candidate.key,
                polls,
            });
        }

        Ok(())
    }

    async fn is_gone(
        &self,
        gvk: &GroupVersionKind,
        key: &ObjectKey,
    ) -> Result<bool, client::Error> {
        match self.client.get(gvk, key).await {
            Ok(_) => Ok(false),
            Err(error) if error.is_not_found() => Ok(true),
            Err(error) => Err(error),
        }
    }
}

#[async_trait]
impl Operation for Delete {
    type Error = Error;

    async fn exec(&self, ctx: &Context) -> Result<(), Error> {
        let start = Instant::now();
        let mut target = self.target.clone();
        let result = self.run(ctx, &mut target).await;

        let resource = target.to_string();
        match &result {
            Ok(()) => self.log(Status::Done, &resource, Some(start.elapsed()), None),
            Err(error) => {
                self.log(Status::Error, &resource, Some(start.elapsed()), Some(error));
            }
        }
        result
    }
}
