//! Convergence against a live cluster
//!
//! Read the current object, create it when missing, and server-side apply
//! only when it diverges from the desired object, so a converged cluster
//! sees no writes. Create-only fields (a Deployment's replica count) are
//! left out of the comparison and the patch.

use std::fmt::Debug;

use async_trait::async_trait;
use k8s_openapi::{ClusterResourceScope, NamespaceResourceScope};
use kube::api::{Api, DeleteParams, DynamicObject, Patch, PatchParams, PostParams};
use kube::{Client, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

use super::matcher::is_subset;
use super::object::ManagedObject;
use crate::engine::{BoundDynamic, Converge, DesiredState, Outcome};
use crate::error::{Error, Result};

/// Default field manager for server-side apply
pub const FIELD_MANAGER: &str = "gateway-operator";

/// Typed and dynamic convergence primitive backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeConverger {
    client: Client,
    field_manager: String,
}

impl KubeConverger {
    pub fn new(client: Client, field_manager: impl Into<String>) -> Self {
        Self {
            client,
            field_manager: field_manager.into(),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    fn post_params(&self) -> PostParams {
        PostParams {
            dry_run: false,
            field_manager: Some(self.field_manager.clone()),
        }
    }

    fn apply_params(&self) -> PatchParams {
        PatchParams::apply(&self.field_manager).force()
    }

    async fn converge_namespaced<K>(&self, obj: &K, update: &Value) -> Result<Outcome>
    where
        K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
            + Clone
            + Debug
            + DeserializeOwned
            + Serialize
            + Send
            + Sync,
    {
        let namespace = obj.meta().namespace.as_deref().ok_or_else(|| {
            Error::ValidationError(format!(
                "{} {} has no namespace",
                K::kind(&()),
                obj.meta().name.as_deref().unwrap_or_default()
            ))
        })?;
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        self.converge_with(&api, obj, update).await
    }

    async fn converge_cluster<K>(&self, obj: &K, update: &Value) -> Result<Outcome>
    where
        K: Resource<Scope = ClusterResourceScope, DynamicType = ()>
            + Clone
            + Debug
            + DeserializeOwned
            + Serialize
            + Send
            + Sync,
    {
        let api: Api<K> = Api::all(self.client.clone());
        self.converge_with(&api, obj, update).await
    }

    async fn converge_with<K>(&self, api: &Api<K>, obj: &K, update: &Value) -> Result<Outcome>
    where
        K: Resource + Clone + Debug + DeserializeOwned + Serialize + Send + Sync,
        K::DynamicType: Default,
    {
        let name = obj
            .meta()
            .name
            .clone()
            .ok_or_else(|| Error::ValidationError("object has no name".to_string()))?;

        match api.get_opt(&name).await? {
            None => {
                api.create(&self.post_params(), obj).await?;
                Ok(Outcome::Created)
            }
            Some(current) => {
                if is_subset(update, &serde_json::to_value(&current)?) {
                    debug!("{} is up to date", name);
                    return Ok(Outcome::Unchanged);
                }
                api.patch(&name, &self.apply_params(), &Patch::Apply(update))
                    .await?;
                Ok(Outcome::Updated)
            }
        }
    }
}

#[async_trait]
impl Converge<ManagedObject> for KubeConverger {
    async fn converge(&self, resource: &ManagedObject) -> Result<Outcome> {
        let update = resource.to_update_value()?;
        let u = &update;
        match resource {
            ManagedObject::ServiceAccount(o) => self.converge_namespaced(o, u).await,
            ManagedObject::ClusterRole(o) => self.converge_cluster(o, u).await,
            ManagedObject::ClusterRoleBinding(o) => self.converge_cluster(o, u).await,
            ManagedObject::Deployment(o) => self.converge_namespaced(o, u).await,
            ManagedObject::Service(o) => self.converge_namespaced(o, u).await,
            ManagedObject::HorizontalPodAutoscaler(o) => self.converge_namespaced(o, u).await,
            ManagedObject::PodDisruptionBudget(o) => self.converge_namespaced(o, u).await,
        }
    }
}

#[async_trait]
impl Converge<BoundDynamic> for KubeConverger {
    #[instrument(skip(self, item), fields(kind = %item.resource().api_resource.kind, name = %item.resource().name))]
    async fn converge(&self, item: &BoundDynamic) -> Result<Outcome> {
        let resource = item.resource();
        let ar = &resource.api_resource;
        let api: Api<DynamicObject> = match &resource.namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, ar),
            None => Api::all_with(self.client.clone(), ar),
        };

        match item.desired_state()? {
            DesiredState::Present(body) => {
                let desired = resource.to_object(body);
                match api.get_opt(&resource.name).await? {
                    None => {
                        api.create(&self.post_params(), &desired).await?;
                        Ok(Outcome::Created)
                    }
                    Some(current) => {
                        if is_subset(
                            &serde_json::to_value(&desired)?,
                            &serde_json::to_value(&current)?,
                        ) {
                            return Ok(Outcome::Unchanged);
                        }
                        api.patch(&resource.name, &self.apply_params(), &Patch::Apply(&desired))
                            .await?;
                        Ok(Outcome::Updated)
                    }
                }
            }
            DesiredState::Absent => match api.get_opt(&resource.name).await? {
                Some(_) => {
                    api.delete(&resource.name, &DeleteParams::default()).await?;
                    Ok(Outcome::Deleted)
                }
                None => Ok(Outcome::Unchanged),
            },
        }
    }
}
