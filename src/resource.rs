//! Targets, candidates and how they are addressed.

use std::{collections::BTreeMap, fmt};

use kube::core::{DynamicObject, GroupVersionKind};
use serde::Deserialize;
use snafu::{Snafu, ensure};

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum Error {
    #[snafu(display("invalid apiVersion {:?}", api_version))]
    InvalidApiVersion { api_version: String },

    #[snafu(display("kind must not be empty"))]
    MissingKind,
}

/// The resource(s) an operation acts on: either a single named object, or
/// every object of a kind matching the selector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TargetSpec {
    pub api_version: String,
    pub kind: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub field_selector: Option<String>,
}

impl TargetSpec {
    pub fn new(api_version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
            ..Self::default()
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn within(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Splits `apiVersion` into group and version; the core group has no
    /// group prefix (`v1`).
    pub fn gvk(&self) -> Result<GroupVersionKind, Error> {
        ensure!(!self.kind.is_empty(), MissingKindSnafu);

        let invalid = || InvalidApiVersionSnafu {
            api_version: self.api_version.clone(),
        };
        let (group, version) = match self.api_version.split_once('/') {
            Some((group, version)) => (group, version),
            None => ("", self.api_version.as_str()),
        };
        ensure!(
            !version.is_empty() && !version.contains('/') && !self.api_version.starts_with('/'),
            invalid()
        );

        Ok(GroupVersionKind::gvk(group, version, &self.kind))
    }

    pub fn selector(&self) -> Selector {
        Selector {
            labels: self.labels.clone(),
            fields: self.field_selector.clone(),
        }
    }
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.api_version, self.kind)?;
        match (&self.namespace, &self.name) {
            (Some(namespace), Some(name)) => write!(f, " @ {namespace}/{name}"),
            (None, Some(name)) => write!(f, " @ {name}"),
            (Some(namespace), None) => write!(f, " @ {namespace}/*"),
            (None, None) => Ok(()),
        }
    }
}

/// Label and field restrictions applied when listing candidates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    pub labels: BTreeMap<String, String>,
    pub fields: Option<String>,
}

impl Selector {
    /// The label selector in its wire form, e.g. `app=web,tier=frontend`.
    pub fn label_selector(&self) -> Option<String> {
        if self.labels.is_empty() {
            return None;
        }
        Some(
            self.labels
                .iter()
                .map(|(key, value)| format!("{key}={value}"))
                .collect::<Vec<_>>()
                .join(","),
        )
    }

    pub fn field_selector(&self) -> Option<&str> {
        self.fields.as_deref().filter(|fields| !fields.is_empty())
    }

    /// Whether `labels` satisfies every label requirement of the selector.
    pub fn matches_labels(&self, labels: Option<&BTreeMap<String, String>>) -> bool {
        self.labels.iter().all(|(key, value)| {
            labels
                .and_then(|labels| labels.get(key))
                .is_some_and(|actual| actual == value)
        })
    }
}

/// Namespace and name of a single resource instance.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectKey {
    pub namespace: Option<String>,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: Option<&str>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.map(ToOwned::to_owned),
            name: name.into(),
        }
    }

    /// Returns `None` for objects without a name.
    pub fn from_object(object: &DynamicObject) -> Option<Self> {
        let name = object.metadata.name.clone()?;
        Some(Self {
            namespace: object.metadata.namespace.clone(),
            name,
        })
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(namespace) => write!(f, "{}/{}", namespace, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// A concrete resource selected for deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub gvk: GroupVersionKind,
    pub key: ObjectKey,
}

impl Candidate {
    pub const fn new(gvk: GroupVersionKind, key: ObjectKey) -> Self {
        Self { gvk, key }
    }
}
