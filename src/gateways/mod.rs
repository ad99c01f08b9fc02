//! Ingress/egress gateway component
//!
//! Builds the resource set of a [`GatewaySet`] and drives both passes of the
//! engine over it: every typed object first, then the dynamic ones.

mod k8s_ingress;
pub mod naming;
mod resource_set;
mod resources;


use std::sync::Arc;

use kube::ResourceExt;
use tracing::{info, instrument};

use crate::crd::GatewaySet;
use crate::engine::{reconcile_all, reconcile_dynamic, BoundDynamic, Converge, PassSummary, ResourceSet};
use crate::error::Result;
use crate::k8sutil::ManagedObject;

pub use k8s_ingress::{gateway_api_resource, K8S_INGRESS_GATEWAY_NAME};
pub use resource_set::build_resource_set;
pub use resources::target_namespace;

pub const COMPONENT_NAME: &str = "gateways";

/// What one run did in each pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub typed: PassSummary,
    pub dynamic: PassSummary,
}

impl ReconcileReport {
    pub fn writes(&self) -> usize {
        self.typed.writes() + self.dynamic.writes()
    }
}

/// Reconciles the gateways of one GatewaySet snapshot against a store.
pub struct Reconciler<'a, S: ?Sized> {
    config: Arc<GatewaySet>,
    store: &'a S,
}

impl<'a, S> Reconciler<'a, S>
where
    S: Converge<ManagedObject> + Converge<BoundDynamic> + ?Sized,
{
    pub fn new(config: Arc<GatewaySet>, store: &'a S) -> Self {
        Self { config, store }
    }

    pub fn resource_set(&self) -> Result<ResourceSet<ManagedObject>> {
        build_resource_set(&self.config)
    }

    /// The dynamic pass only starts once every typed object has converged.
    #[instrument(skip(self), fields(component = COMPONENT_NAME, name = %self.config.name_any()))]
    pub async fn reconcile(&self) -> Result<ReconcileReport> {
        info!("Reconciling");

        let set = self.resource_set()?;
        let typed = reconcile_all(&set.expand(), self.store).await?;
        let dynamic = reconcile_dynamic(set.dynamic(), self.store).await?;

        info!(
            created = typed.created + dynamic.created,
            updated = typed.updated + dynamic.updated,
            deleted = dynamic.deleted,
            "Reconciled"
        );
        Ok(ReconcileReport { typed, dynamic })
    }
}
