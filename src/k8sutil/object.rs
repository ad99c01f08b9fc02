//! Statically-typed objects managed by the typed pass

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
use k8s_openapi::api::core::v1::{Service, ServiceAccount};
use k8s_openapi::api::policy::v1::PodDisruptionBudget;
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding};
use kube::Resource;

use crate::engine::{Identify, ResourceRef};
use crate::error::Result;

/// One object of any kind the gateway builders produce.
#[derive(Clone, Debug, PartialEq)]
pub enum ManagedObject {
    ServiceAccount(ServiceAccount),
    ClusterRole(ClusterRole),
    ClusterRoleBinding(ClusterRoleBinding),
    Deployment(Deployment),
    Service(Service),
    HorizontalPodAutoscaler(HorizontalPodAutoscaler),
    PodDisruptionBudget(PodDisruptionBudget),
}

macro_rules! with_object {
    ($value:expr, $obj:ident => $body:expr) => {
        match $value {
            ManagedObject::ServiceAccount($obj) => $body,
            ManagedObject::ClusterRole($obj) => $body,
            ManagedObject::ClusterRoleBinding($obj) => $body,
            ManagedObject::Deployment($obj) => $body,
            ManagedObject::Service($obj) => $body,
            ManagedObject::HorizontalPodAutoscaler($obj) => $body,
            ManagedObject::PodDisruptionBudget($obj) => $body,
        }
    };
}

impl ManagedObject {
    /// Serialized form, including `apiVersion` and `kind`.
    pub fn to_value(&self) -> Result<serde_json::Value> {
        Ok(with_object!(self, obj => serde_json::to_value(obj)?))
    }

    /// Serialized form used to check and patch an existing object.
    ///
    /// A Deployment's `spec.replicas` is only set on create; afterwards the
    /// gateway's HorizontalPodAutoscaler owns it.
    pub fn to_update_value(&self) -> Result<serde_json::Value> {
        let mut value = self.to_value()?;
        if let ManagedObject::Deployment(_) = self {
            if let Some(spec) = value.get_mut("spec").and_then(serde_json::Value::as_object_mut) {
                spec.remove("replicas");
            }
        }
        Ok(value)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ManagedObject::ServiceAccount(_) => "ServiceAccount",
            ManagedObject::ClusterRole(_) => "ClusterRole",
            ManagedObject::ClusterRoleBinding(_) => "ClusterRoleBinding",
            ManagedObject::Deployment(_) => "Deployment",
            ManagedObject::Service(_) => "Service",
            ManagedObject::HorizontalPodAutoscaler(_) => "HorizontalPodAutoscaler",
            ManagedObject::PodDisruptionBudget(_) => "PodDisruptionBudget",
        }
    }

    pub fn name(&self) -> Option<&str> {
        with_object!(self, obj => obj.meta().name.as_deref())
    }

    pub fn labels(&self) -> Option<&std::collections::BTreeMap<String, String>> {
        with_object!(self, obj => obj.meta().labels.as_ref())
    }
}

/// Identity of a `k8s-openapi` object from its static type information.
pub fn typed_ref<K>(obj: &K) -> ResourceRef
where
    K: Resource<DynamicType = ()>,
{
    ResourceRef {
        group: K::group(&()).into_owned(),
        version: K::version(&()).into_owned(),
        kind: K::kind(&()).into_owned(),
        namespace: obj.meta().namespace.clone(),
        name: obj.meta().name.clone().unwrap_or_default(),
    }
}

impl Identify for ManagedObject {
    fn resource_ref(&self) -> ResourceRef {
        with_object!(self, obj => typed_ref(obj))
    }
}
