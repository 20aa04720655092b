//! Turning a target into the concrete resources it designates.

use std::sync::Arc;

use async_trait::async_trait;
use kube::core::GroupVersionKind;

use crate::{
    client::{Client, Error},
    resource::{Candidate, ObjectKey, TargetSpec},
};

/// Resolves a target into candidates.
///
/// A target naming an object that doesn't exist fails with
/// [`Error::NotFound`]; a selector matching nothing is an empty success.
#[async_trait]
pub trait Resolve: Send + Sync {
    async fn resolve(
        &self,
        gvk: &GroupVersionKind,
        target: &TargetSpec,
    ) -> Result<Vec<Candidate>, Error>;
}

/// Reads candidates straight from the cluster: a `get` for named targets,
/// a filtered `list` otherwise.
pub struct ClientResolver {
    client: Arc<dyn Client>,
}

impl ClientResolver {
    pub fn new(client: Arc<dyn Client>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Resolve for ClientResolver {
    async fn resolve(
        &self,
        gvk: &GroupVersionKind,
        target: &TargetSpec,
    ) -> Result<Vec<Candidate>, Error> {
        let namespace = target
            .namespace
            .as_deref()
            .filter(|namespace| !namespace.is_empty());

        let objects = match target.name.as_deref().filter(|name| !name.is_empty()) {
            Some(name) => {
                let key = ObjectKey::new(namespace, name);
                vec![self.client.get(gvk, &key).await?]
            }
            None => {
                self.client
                    .list(gvk, namespace, &target.selector())
                    .await?
            }
        };

        Ok(objects
            .iter()
            .filter_map(|object| {
                let key = ObjectKey::from_object(object);
                if key.is_none() {
                    warn!(message = "Skipping object without a name.", kind = %gvk.kind);
                }
                key
            })
            .map(|key| Candidate::new(gvk.clone(), key))
            .collect())
    }
}
