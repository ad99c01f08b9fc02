//! In-memory convergence primitive
//!
//! Backs dry runs and `render`: it keeps the last object written for every
//! identity and logs each write in order, applying the same matching rules
//! as the cluster-backed converger.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::Value;

use super::matcher::is_subset;
use super::object::ManagedObject;
use crate::engine::{BoundDynamic, Converge, DesiredState, Identify, Outcome, ResourceRef};
use crate::error::Result;

/// One write performed against the store.
#[derive(Clone, Debug, PartialEq)]
pub struct Write {
    pub outcome: Outcome,
    pub resource: ResourceRef,
    /// Object as written; `None` for deletions
    pub object: Option<Value>,
}

#[derive(Debug, Default)]
struct State {
    objects: BTreeMap<ResourceRef, Value>,
    writes: Vec<Write>,
}

#[derive(Debug, Default)]
pub struct RecordingStore {
    state: Mutex<State>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed an object as if it already existed in the cluster.
    pub fn insert(&self, resource: ResourceRef, object: Value) {
        self.lock().objects.insert(resource, object);
    }

    pub fn get(&self, resource: &ResourceRef) -> Option<Value> {
        self.lock().objects.get(resource).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All writes so far, oldest first.
    pub fn writes(&self) -> Vec<Write> {
        self.lock().writes.clone()
    }

    pub fn write_count(&self) -> usize {
        self.lock().writes.len()
    }

    /// Create `create` when absent; otherwise merge `update` into the stored
    /// object when it diverges, keeping fields it leaves out.
    fn put(&self, resource: ResourceRef, create: Value, update: Value) -> Outcome {
        let mut state = self.lock();
        let (outcome, object) = match state.objects.get(&resource) {
            Some(current) if is_subset(&update, current) => return Outcome::Unchanged,
            Some(current) => {
                let mut merged = current.clone();
                merge(&mut merged, update);
                (Outcome::Updated, merged)
            }
            None => (Outcome::Created, create),
        };
        state.objects.insert(resource.clone(), object.clone());
        state.writes.push(Write {
            outcome,
            resource,
            object: Some(object),
        });
        outcome
    }

    fn remove(&self, resource: ResourceRef) -> Outcome {
        let mut state = self.lock();
        if state.objects.remove(&resource).is_none() {
            return Outcome::Unchanged;
        }
        state.writes.push(Write {
            outcome: Outcome::Deleted,
            resource,
            object: None,
        });
        Outcome::Deleted
    }
}

/// Apply-style merge: objects merge key by key, anything else is replaced.
fn merge(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(have), Value::Object(want)) => {
            for (key, value) in want {
                if value.is_null() {
                    continue;
                }
                match have.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        have.insert(key, value);
                    }
                }
            }
        }
        (target, patch) => *target = patch,
    }
}

#[async_trait]
impl Converge<ManagedObject> for RecordingStore {
    async fn converge(&self, resource: &ManagedObject) -> Result<Outcome> {
        Ok(self.put(
            resource.resource_ref(),
            resource.to_value()?,
            resource.to_update_value()?,
        ))
    }
}

#[async_trait]
impl Converge<BoundDynamic> for RecordingStore {
    async fn converge(&self, item: &BoundDynamic) -> Result<Outcome> {
        let id = item.resource_ref();
        match item.desired_state()? {
            DesiredState::Present(body) => {
                let object = serde_json::to_value(item.resource().to_object(body))?;
                Ok(self.put(id, object.clone(), object))
            }
            DesiredState::Absent => Ok(self.remove(id)),
        }
    }
}
