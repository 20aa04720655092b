//! An in-memory [`super::Client`] for tests.
//!
//! Objects live in a map keyed by kind and [`ObjectKey`]. Deletion can be
//! made to linger for a number of reads, emulating finalizers, and failures
//! can be injected per object. Every call is recorded so tests can assert on
//! call order.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use kube::{
    core::{DynamicObject, ErrorResponse, GroupVersionKind},
    discovery::ApiResource,
};

use super::{Error, Propagation};
use crate::resource::{ObjectKey, Selector};

/// A recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Get(ObjectKey),
    List {
        namespace: Option<String>,
        selector: Selector,
    },
    Delete(ObjectKey, Propagation),
    IsNamespaced(String),
}

/// How long a deleted object keeps being returned by `get`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Removal {
    /// Gone as soon as the delete is accepted.
    #[default]
    Immediate,
    /// Still returned by this many reads after the delete.
    AfterReads(usize),
    /// Never goes away, like an object with a stuck finalizer.
    Never,
}

#[derive(Debug)]
struct Stored {
    object: DynamicObject,
    removal: Removal,
    deleting: bool,
}

#[derive(Debug, Default)]
struct State {
    objects: BTreeMap<(String, ObjectKey), Stored>,
    cluster_scoped: HashSet<String>,
    get_failures: HashMap<ObjectKey, u16>,
    delete_failures: HashMap<ObjectKey, u16>,
    list_failure: Option<u16>,
    calls: Vec<Call>,
}

/// Mock client.
#[derive(Debug, Default)]
pub struct Client {
    state: Mutex<State>,
}

/// Builds the API error the server would answer with `code`.
pub fn api_error(code: u16) -> kube::Error {
    kube::Error::Api(ErrorResponse {
        status: "Failure".to_owned(),
        message: format!("injected failure with status {code}"),
        reason: "Injected".to_owned(),
        code,
    })
}

impl Client {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // A panicking test thread must not hide the state from the others.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store an object.
    pub fn add(&self, gvk: &GroupVersionKind, key: ObjectKey, labels: &[(&str, &str)]) {
        let mut object = DynamicObject::new(&key.name, &ApiResource::from_gvk(gvk));
        object.metadata.namespace = key.namespace.clone();
        if !labels.is_empty() {
            object.metadata.labels = Some(
                labels
                    .iter()
                    .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
                    .collect(),
            );
        }
        self.state().objects.insert(
            (gvk.kind.clone(), key),
            Stored {
                object,
                removal: Removal::Immediate,
                deleting: false,
            },
        );
    }

    /// Control how long the object lingers after deletion.
    pub fn linger(&self, kind: &str, key: &ObjectKey, removal: Removal) {
        if let Some(stored) = self
            .state()
            .objects
            .get_mut(&(kind.to_owned(), key.clone()))
        {
            stored.removal = removal;
        }
    }

    pub fn cluster_scoped(&self, kind: &str) {
        self.state().cluster_scoped.insert(kind.to_owned());
    }

    pub fn fail_get(&self, key: ObjectKey, code: u16) {
        self.state().get_failures.insert(key, code);
    }

    pub fn fail_delete(&self, key: ObjectKey, code: u16) {
        self.state().delete_failures.insert(key, code);
    }

    pub fn fail_list(&self, code: u16) {
        self.state().list_failure = Some(code);
    }

    pub fn contains(&self, kind: &str, key: &ObjectKey) -> bool {
        self.state()
            .objects
            .contains_key(&(kind.to_owned(), key.clone()))
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    /// Recorded deletes, in order.
    pub fn deletes(&self) -> Vec<ObjectKey> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Delete(key, _) => Some(key),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl super::Client for Client {
    async fn get(&self, gvk: &GroupVersionKind, key: &ObjectKey) -> Result<DynamicObject, Error> {
        let mut state = self.state();
        state.calls.push(Call::Get(key.clone()));

        if let Some(code) = state.get_failures.get(key) {
            return Err(Error::from_kube(api_error(*code), &gvk.kind, key));
        }

        let id = (gvk.kind.clone(), key.clone());
        let gone = match state.objects.get_mut(&id) {
            None => true,
            Some(stored) if !stored.deleting => false,
            Some(stored) => match stored.removal {
                Removal::Immediate | Removal::AfterReads(0) => true,
                Removal::AfterReads(reads) => {
                    stored.removal = Removal::AfterReads(reads - 1);
                    false
                }
                Removal::Never => false,
            },
        };
        if gone {
            state.objects.remove(&id);
            return Err(Error::from_kube(api_error(404), &gvk.kind, key));
        }
        Ok(state.objects[&id].object.clone())
    }

    async fn list(
        &self,
        gvk: &GroupVersionKind,
        namespace: Option<&str>,
        selector: &Selector,
    ) -> Result<Vec<DynamicObject>, Error> {
        let mut state = self.state();
        state.calls.push(Call::List {
            namespace: namespace.map(ToOwned::to_owned),
            selector: selector.clone(),
        });

        if let Some(code) = state.list_failure {
            let key = ObjectKey::new(namespace, "*");
            return Err(Error::from_kube(api_error(code), &gvk.kind, &key));
        }

        Ok(state
            .objects
            .iter()
            .filter(|((kind, key), _)| {
                *kind == gvk.kind
                    && namespace.is_none_or(|namespace| key.namespace.as_deref() == Some(namespace))
            })
            .filter(|(_, stored)| selector.matches_labels(stored.object.metadata.labels.as_ref()))
            .map(|(_, stored)| stored.object.clone())
            .collect())
    }

    async fn delete(
        &self,
        gvk: &GroupVersionKind,
        key: &ObjectKey,
        propagation: Propagation,
    ) -> Result<(), Error> {
        let mut state = self.state();
        state.calls.push(Call::Delete(key.clone(), propagation));

        if let Some(code) = state.delete_failures.get(key) {
            return Err(Error::from_kube(api_error(*code), &gvk.kind, key));
        }

        let id = (gvk.kind.clone(), key.clone());
        match state.objects.get(&id).map(|stored| stored.removal) {
            None => return Err(Error::from_kube(api_error(404), &gvk.kind, key)),
            Some(Removal::Immediate) => {
                state.objects.remove(&id);
            }
            Some(_) => {
                if let Some(stored) = state.objects.get_mut(&id) {
                    stored.deleting = true;
                }
            }
        }
        Ok(())
    }

    async fn is_namespaced(&self, gvk: &GroupVersionKind) -> Result<bool, Error> {
        let mut state = self.state();
        state.calls.push(Call::IsNamespaced(gvk.kind.clone()));
        Ok(!state.cluster_scoped.contains(&gvk.kind))
    }
}
