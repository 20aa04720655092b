//! Namespace injection for targets that don't name one.

use std::sync::Arc;

use async_trait::async_trait;
use snafu::{ResultExt, Snafu};

use crate::{
    client::{self, Client},
    context,
    resource::{self, TargetSpec},
};

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("{}", source))]
    InvalidTarget { source: resource::Error },

    #[snafu(display("unable to determine the scope of {}: {}", kind, source))]
    Scope { kind: String, source: client::Error },

    #[snafu(display("{}", source))]
    Interrupted { source: context::Error },
}

impl From<context::Error> for Error {
    fn from(source: context::Error) -> Self {
        Error::Interrupted { source }
    }
}

/// Rewrites the namespace of a target before it is resolved.
#[async_trait]
pub trait Namespacer: Send + Sync {
    async fn apply(&self, target: &mut TargetSpec) -> Result<(), Error>;
}

/// Places targets of namespaced kinds that don't carry a namespace into a
/// fixed one. Cluster scoped kinds are left alone.
pub struct DefaultNamespacer {
    namespace: String,
    client: Arc<dyn Client>,
}

impl DefaultNamespacer {
    pub fn new(namespace: impl Into<String>, client: Arc<dyn Client>) -> Self {
        Self {
            namespace: namespace.into(),
            client,
        }
    }
}

#[async_trait]
impl Namespacer for DefaultNamespacer {
    async fn apply(&self, target: &mut TargetSpec) -> Result<(), Error> {
        if target.namespace.as_deref().is_some_and(|namespace| !namespace.is_empty()) {
            return Ok(());
        }

        let gvk = target.gvk().context(InvalidTargetSnafu)?;
        let namespaced = self
            .client
            .is_namespaced(&gvk)
            .await
            .context(ScopeSnafu { kind: &gvk.kind })?;
        if namespaced {
            target.namespace = Some(self.namespace.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock;

    fn setup() -> (Arc<mock::Client>, DefaultNamespacer) {
        let client = Arc::new(mock::Client::new());
        let namespacer =
            DefaultNamespacer::new("e2e", Arc::clone(&client) as Arc<dyn Client>);
        (client, namespacer)
    }

    #[tokio::test]
    async fn fills_missing_namespace() {
        let (_, namespacer) = setup();
        let mut target = TargetSpec::new("v1", "ConfigMap").named("settings");
        namespacer.apply(&mut target).await.unwrap();
        assert_eq!(target.namespace.as_deref(), Some("e2e"));
    }

    #[tokio::test]
    async fn fills_empty_namespace() {
        let (_, namespacer) = setup();
        let mut target = TargetSpec::new("v1", "ConfigMap").within("");
        namespacer.apply(&mut target).await.unwrap();
        assert_eq!(target.namespace.as_deref(), Some("e2e"));
    }

    #[tokio::test]
    async fn keeps_explicit_namespace() {
        let (client, namespacer) = setup();
        let mut target = TargetSpec::new("v1", "ConfigMap").within("other");
        namespacer.apply(&mut target).await.unwrap();
        assert_eq!(target.namespace.as_deref(), Some("other"));
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn skips_cluster_scoped_kinds() {
        let (client, namespacer) = setup();
        client.cluster_scoped("ClusterRole");
        let mut target =
            TargetSpec::new("rbac.authorization.k8s.io/v1", "ClusterRole").named("admin");
        namespacer.apply(&mut target).await.unwrap();
        assert_eq!(target.namespace, None);
        assert_eq!(
            client.calls(),
            vec![mock::Call::IsNamespaced("ClusterRole".to_owned())]
        );
    }

    #[tokio::test]
    async fn rejects_invalid_target() {
        let (_, namespacer) = setup();
        let mut target = TargetSpec::new("a/b/c", "Thing");
        let error = namespacer.apply(&mut target).await.unwrap_err();
        assert!(matches!(error, Error::InvalidTarget { .. }));
    }
}
