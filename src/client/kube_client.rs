//! A [`Client`] backed by the kube-rs API client.

use std::collections::HashMap;

use async_trait::async_trait;
use kube::{
    api::{Api, DeleteParams, ListParams},
    core::{DynamicObject, GroupVersionKind},
    discovery::{self, ApiCapabilities, ApiResource, Scope},
};
use tokio::sync::RwLock;

use super::{Client, Error, Propagation, describe_gvk};
use crate::resource::{ObjectKey, Selector};

/// Talks to a real API server, resolving kinds through discovery.
///
/// Discovery results are cached per kind for the lifetime of the client.
pub struct KubeClient {
    client: kube::Client,
    discovered: RwLock<HashMap<String, (ApiResource, ApiCapabilities)>>,
}

impl KubeClient {
    pub fn new(client: kube::Client) -> Self {
        Self {
            client,
            discovered: RwLock::new(HashMap::new()),
        }
    }

    /// Connect using the local kubeconfig or the in-cluster environment.
    pub async fn try_default() -> Result<Self, kube::Error> {
        kube::Client::try_default().await.map(Self::new)
    }

    async fn discover(
        &self,
        gvk: &GroupVersionKind,
    ) -> Result<(ApiResource, ApiCapabilities), Error> {
        let cache_key = describe_gvk(gvk);
        if let Some(found) = self.discovered.read().await.get(&cache_key) {
            return Ok(found.clone());
        }

        let found = discovery::pinned_kind(&self.client, gvk)
            .await
            .map_err(|source| Error::Discovery {
                gvk: cache_key.clone(),
                source,
            })?;
        trace!(message = "Discovered API resource.", gvk = %cache_key, plural = %found.0.plural);
        self.discovered
            .write()
            .await
            .insert(cache_key, found.clone());
        Ok(found)
    }

    async fn api(
        &self,
        gvk: &GroupVersionKind,
        namespace: Option<&str>,
    ) -> Result<Api<DynamicObject>, Error> {
        let (resource, capabilities) = self.discover(gvk).await?;
        let client = self.client.clone();
        Ok(match (capabilities.scope, namespace) {
            (Scope::Namespaced, Some(namespace)) => {
                Api::namespaced_with(client, namespace, &resource)
            }
            _ => Api::all_with(client, &resource),
        })
    }
}

#[async_trait]
impl Client for KubeClient {
    async fn get(&self, gvk: &GroupVersionKind, key: &ObjectKey) -> Result<DynamicObject, Error> {
        let api = self.api(gvk, key.namespace.as_deref()).await?;
        api.get(&key.name)
            .await
            .map_err(|error| Error::from_kube(error, &gvk.kind, key))
    }

    async fn list(
        &self,
        gvk: &GroupVersionKind,
        namespace: Option<&str>,
        selector: &Selector,
    ) -> Result<Vec<DynamicObject>, Error> {
        let api = self.api(gvk, namespace).await?;
        let mut params = ListParams::default();
        if let Some(labels) = selector.label_selector() {
            params = params.labels(&labels);
        }
        if let Some(fields) = selector.field_selector() {
            params = params.fields(fields);
        }
        let list = api.list(&params).await.map_err(|error| {
            let key = ObjectKey::new(namespace, "*");
            Error::from_kube(error, &gvk.kind, &key)
        })?;
        Ok(list.items)
    }

    async fn delete(
        &self,
        gvk: &GroupVersionKind,
        key: &ObjectKey,
        propagation: Propagation,
    ) -> Result<(), Error> {
        let api = self.api(gvk, key.namespace.as_deref()).await?;
        let params = DeleteParams {
            propagation_policy: Some(propagation.into()),
            ..DeleteParams::default()
        };
        api.delete(&key.name, &params)
            .await
            .map(drop)
            .map_err(|error| Error::from_kube(error, &gvk.kind, key))
    }

    async fn is_namespaced(&self, gvk: &GroupVersionKind) -> Result<bool, Error> {
        let (_, capabilities) = self.discover(gvk).await?;
        Ok(matches!(capabilities.scope, Scope::Namespaced))
    }
}
