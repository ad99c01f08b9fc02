//! Finalizer handling for GatewaySet cleanup
//!
//! Namespaced gateway objects carry an owner reference and are garbage
//! collected with their GatewaySet. The cluster-scoped RBAC objects cannot,
//! so the finalizer deletes them explicitly before the GatewaySet goes away.

use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding};
use kube::api::{Api, DeleteParams};
use kube::Client;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use tracing::{info, warn};

use crate::crd::GatewaySet;
use crate::engine::Variant;
use crate::error::Result;
use crate::gateways::naming::{cluster_role_binding_name, cluster_role_name, EGRESS, INGRESS};
use crate::gateways::target_namespace;

pub const GATEWAY_SET_FINALIZER: &str = "gatewayset.gateways.meshops.io/finalizer";

/// Names of the cluster-scoped objects a GatewaySet may have created.
///
/// Both gateways are listed whatever their enabled flag, since a gateway
/// may have been disabled after its RBAC was created.
pub fn cluster_scoped_names(gws: &GatewaySet) -> Result<Vec<(String, String)>> {
    let namespace = target_namespace(gws);
    [INGRESS, EGRESS]
        .into_iter()
        .map(|name| {
            let gw = Variant::new(name)?;
            Ok((
                cluster_role_binding_name(&gw, &namespace),
                cluster_role_name(&gw, &namespace),
            ))
        })
        .collect()
}

/// Delete the ClusterRoleBindings, then the ClusterRoles, ignoring 404s
pub async fn cleanup_cluster_scoped(client: &Client, gws: &GatewaySet) -> Result<()> {
    let bindings: Api<ClusterRoleBinding> = Api::all(client.clone());
    let roles: Api<ClusterRole> = Api::all(client.clone());

    for (binding, role) in cluster_scoped_names(gws)? {
        delete_ignoring_missing(&bindings, &binding).await?;
        delete_ignoring_missing(&roles, &role).await?;
    }
    Ok(())
}

async fn delete_ignoring_missing<K>(api: &Api<K>, name: &str) -> Result<()>
where
    K: Clone + DeserializeOwned + Debug,
{
    match api.delete(name, &DeleteParams::default()).await {
        Ok(_) => {
            info!("Deleted {}", name);
            Ok(())
        }
        Err(kube::Error::Api(e)) if e.code == 404 => {
            warn!("{} not found, already deleted", name);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
