//! The cluster API surface the operations depend on.

use async_trait::async_trait;
use kube::core::{DynamicObject, GroupVersionKind};
use serde::Deserialize;
use snafu::Snafu;

use crate::{
    context,
    resource::{ObjectKey, Selector},
};

mod kube_client;
#[cfg(any(test, feature = "mocks"))]
pub mod mock;

pub use self::kube_client::KubeClient;

/// Errors returned by a [`Client`].
///
/// Absence is reported as [`Error::NotFound`] so callers can treat it
/// differently from every other failure without inspecting messages.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("{} {} not found", kind, key))]
    NotFound { kind: String, key: String },

    #[snafu(display("API request for {} failed: {}", kind, source))]
    Api { kind: String, source: kube::Error },

    #[snafu(display("unable to discover API resource for {}: {}", gvk, source))]
    Discovery { gvk: String, source: kube::Error },

    #[snafu(display("{}", source))]
    Interrupted { source: context::Error },
}

impl Error {
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// The context error, when the call was cut short by cancellation or a
    /// deadline.
    pub const fn interruption(&self) -> Option<context::Error> {
        match self {
            Error::Interrupted { source } => Some(*source),
            _ => None,
        }
    }

    /// Classifies an API error, mapping HTTP 404 to [`Error::NotFound`].
    pub fn from_kube(error: kube::Error, kind: &str, key: &ObjectKey) -> Self {
        match error {
            kube::Error::Api(response) if response.code == 404 => Error::NotFound {
                kind: kind.to_owned(),
                key: key.to_string(),
            },
            source => Error::Api {
                kind: kind.to_owned(),
                source,
            },
        }
    }
}

impl From<context::Error> for Error {
    fn from(source: context::Error) -> Self {
        Error::Interrupted { source }
    }
}

/// How dependents of a deleted object are handled by the garbage collector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum Propagation {
    #[default]
    Background,
    Foreground,
    Orphan,
}

impl From<Propagation> for kube::api::PropagationPolicy {
    fn from(propagation: Propagation) -> Self {
        match propagation {
            Propagation::Background => kube::api::PropagationPolicy::Background,
            Propagation::Foreground => kube::api::PropagationPolicy::Foreground,
            Propagation::Orphan => kube::api::PropagationPolicy::Orphan,
        }
    }
}

/// Human readable `group/version/kind` (`version/kind` for the core group).
pub fn describe_gvk(gvk: &GroupVersionKind) -> String {
    if gvk.group.is_empty() {
        format!("{}/{}", gvk.version, gvk.kind)
    } else {
        format!("{}/{}/{}", gvk.group, gvk.version, gvk.kind)
    }
}

/// Access to the Kubernetes API server.
///
/// Every method is a suspension point; callers bound them with a
/// [`context::Context`]. Dropping a returned future abandons the request.
#[async_trait]
pub trait Client: Send + Sync {
    /// Fetch a single object.
    async fn get(&self, gvk: &GroupVersionKind, key: &ObjectKey) -> Result<DynamicObject, Error>;

    /// List objects of a kind, across all namespaces when `namespace` is
    /// `None`.
    async fn list(
        &self,
        gvk: &GroupVersionKind,
        namespace: Option<&str>,
        selector: &Selector,
    ) -> Result<Vec<DynamicObject>, Error>;

    /// Request deletion of an object. Deleting an absent object yields
    /// [`Error::NotFound`].
    async fn delete(
        &self,
        gvk: &GroupVersionKind,
        key: &ObjectKey,
        propagation: Propagation,
    ) -> Result<(), Error>;

    /// Whether objects of this kind live in a namespace.
    async fn is_namespaced(&self, gvk: &GroupVersionKind) -> Result<bool, Error>;
}

#[cfg(test)]
mod tests {
    use kube::core::ErrorResponse;

    use super::*;

    fn api_error(code: u16) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_owned(),
            message: "boom".to_owned(),
            reason: "Whatever".to_owned(),
            code,
        })
    }

    #[test]
    fn classifies_404_as_not_found() {
        let key = ObjectKey::new(Some("demo"), "web");
        let error = Error::from_kube(api_error(404), "Pod", &key);
        assert!(error.is_not_found());
        assert_eq!(error.to_string(), "Pod demo/web not found");
    }

    #[test]
    fn other_codes_are_api_errors() {
        let key = ObjectKey::new(None, "node-1");
        let error = Error::from_kube(api_error(403), "Node", &key);
        assert!(!error.is_not_found());
        assert!(matches!(error, Error::Api { .. }));
    }

    #[test]
    fn interruption_is_exposed() {
        let error = Error::from(context::Error::DeadlineExceeded);
        assert_eq!(error.interruption(), Some(context::Error::DeadlineExceeded));
        assert_eq!(error.to_string(), "context deadline exceeded");
        assert!(!error.is_not_found());
    }

    #[test]
    fn gvk_description() {
        assert_eq!(describe_gvk(&GroupVersionKind::gvk("", "v1", "Pod")), "v1/Pod");
        assert_eq!(
            describe_gvk(&GroupVersionKind::gvk("apps", "v1", "Deployment")),
            "apps/v1/Deployment"
        );
    }

    #[test]
    fn propagation_deserializes() {
        let propagation: Propagation = serde_yaml::from_str("Foreground").unwrap();
        assert_eq!(propagation, Propagation::Foreground);
        assert_eq!(Propagation::default(), Propagation::Background);
    }
}
