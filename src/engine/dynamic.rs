//! Dynamically-typed resources
//!
//! Objects whose schema is not known to `k8s-openapi` (Istio networking CRDs,
//! for instance) are handled as a [`DynamicResource`] handle plus a function
//! computing the body they should have.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::{ApiResource, DynamicObject};

use super::expand::Pending;
use super::identity::{Identify, ResourceRef};
use crate::error::Result;

/// Handle used to locate a schema-less object: its group/version/kind/plural
/// plus the metadata this operator owns.
#[derive(Clone, Debug, PartialEq)]
pub struct DynamicResource {
    pub api_resource: ApiResource,
    pub name: String,
    pub namespace: Option<String>,
    pub labels: BTreeMap<String, String>,
    pub owner_references: Vec<OwnerReference>,
}

impl DynamicResource {
    pub fn new(api_resource: ApiResource, name: impl Into<String>) -> Self {
        Self {
            api_resource,
            name: name.into(),
            namespace: None,
            labels: BTreeMap::new(),
            owner_references: Vec::new(),
        }
    }

    pub fn within(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn labels(mut self, labels: BTreeMap<String, String>) -> Self {
        self.labels = labels;
        self
    }

    pub fn owned_by(mut self, owner: Option<OwnerReference>) -> Self {
        self.owner_references = owner.into_iter().collect();
        self
    }

    /// Assemble the full object, with `body` holding everything but metadata
    /// (typically `{"spec": ...}`).
    pub fn to_object(&self, body: serde_json::Value) -> DynamicObject {
        let mut obj = DynamicObject::new(&self.name, &self.api_resource);
        obj.metadata.namespace = self.namespace.clone();
        if !self.labels.is_empty() {
            obj.metadata.labels = Some(self.labels.clone());
        }
        if !self.owner_references.is_empty() {
            obj.metadata.owner_references = Some(self.owner_references.clone());
        }
        obj.data = body;
        obj
    }
}

impl Identify for DynamicResource {
    fn resource_ref(&self) -> ResourceRef {
        ResourceRef {
            group: self.api_resource.group.clone(),
            version: self.api_resource.version.clone(),
            kind: self.api_resource.kind.clone(),
            namespace: self.namespace.clone(),
            name: self.name.clone(),
        }
    }
}

/// What a dynamic object should look like after convergence.
#[derive(Clone, Debug, PartialEq)]
pub enum DesiredState {
    /// Object must exist with this body (everything but metadata)
    Present(serde_json::Value),
    /// Object must not exist
    Absent,
}

pub type DesiredStateFn = Arc<dyn Fn(&DynamicResource) -> Result<DesiredState> + Send + Sync>;

type DynamicCtor = Arc<dyn Fn() -> Result<DynamicResource> + Send + Sync>;

/// A dynamic resource constructor paired with its desired-state computation.
#[derive(Clone)]
pub struct DynamicResourceWithDesiredState {
    name: &'static str,
    resource: DynamicCtor,
    desired_state: DesiredStateFn,
}

impl fmt::Debug for DynamicResourceWithDesiredState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicResourceWithDesiredState")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl DynamicResourceWithDesiredState {
    pub fn new<R, D>(name: &'static str, resource: R, desired_state: D) -> Self
    where
        R: Fn() -> Result<DynamicResource> + Send + Sync + 'static,
        D: Fn(&DynamicResource) -> Result<DesiredState> + Send + Sync + 'static,
    {
        Self {
            name,
            resource: Arc::new(resource),
            desired_state: Arc::new(desired_state),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Defer construction; the handle is built when the pass reaches it.
    pub(crate) fn bind(&self) -> Pending<BoundDynamic> {
        let resource = Arc::clone(&self.resource);
        let desired_state = Arc::clone(&self.desired_state);
        Pending::new(self.name, move || {
            Ok(BoundDynamic {
                resource: resource()?,
                desired_state: Arc::clone(&desired_state),
            })
        })
    }
}

/// A constructed dynamic handle still carrying its desired-state function.
///
/// The convergence primitive decides when to evaluate the function.
#[derive(Clone)]
pub struct BoundDynamic {
    resource: DynamicResource,
    desired_state: DesiredStateFn,
}

impl fmt::Debug for BoundDynamic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundDynamic")
            .field("resource", &self.resource)
            .finish_non_exhaustive()
    }
}

impl BoundDynamic {
    pub fn resource(&self) -> &DynamicResource {
        &self.resource
    }

    pub fn desired_state(&self) -> Result<DesiredState> {
        (self.desired_state)(&self.resource)
    }
}

impl Identify for BoundDynamic {
    fn resource_ref(&self) -> ResourceRef {
        self.resource.resource_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::api::GroupVersionKind;
    use serde_json::json;

    fn gateway_resource() -> ApiResource {
        ApiResource::from_gvk_with_plural(
            &GroupVersionKind::gvk("networking.istio.io", "v1alpha3", "Gateway"),
            "gateways",
        )
    }

    #[test]
    fn test_to_object_carries_metadata_and_body() {
        let labels = BTreeMap::from([("app".to_string(), "istio-ingressgateway".to_string())]);
        let res = DynamicResource::new(gateway_resource(), "gw")
            .within("istio-system")
            .labels(labels.clone());

        let obj = res.to_object(json!({"spec": {"servers": []}}));

        assert_eq!(obj.metadata.name.as_deref(), Some("gw"));
        assert_eq!(obj.metadata.namespace.as_deref(), Some("istio-system"));
        assert_eq!(obj.metadata.labels, Some(labels));
        assert!(obj.metadata.owner_references.is_none());
        assert_eq!(
            obj.types.as_ref().map(|t| t.api_version.as_str()),
            Some("networking.istio.io/v1alpha3")
        );
        assert_eq!(obj.data["spec"]["servers"], json!([]));
    }

    #[test]
    fn test_bind_defers_construction_and_evaluation() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let built = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&built);
        let item = DynamicResourceWithDesiredState::new(
            "gateway",
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(DynamicResource::new(gateway_resource(), "gw").within("ns"))
            },
            |_res: &DynamicResource| Ok(DesiredState::Absent),
        );

        let pending = item.bind();
        assert_eq!(built.load(Ordering::SeqCst), 0);
        assert_eq!(pending.origin(), "gateway");

        let bound = pending.build().unwrap();
        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert_eq!(bound.resource_ref().kind, "Gateway");
        assert_eq!(bound.desired_state().unwrap(), DesiredState::Absent);
    }
}
