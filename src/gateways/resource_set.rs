//! Which gateways, builders and dynamic objects take part in a run

use std::sync::Arc;

use super::k8s_ingress::k8s_ingress;
use super::naming::{EGRESS, INGRESS};
use super::resources::{
    cluster_role, cluster_role_binding, deployment, horizontal_pod_autoscaler,
    pod_disruption_budget, service, service_account,
};
use crate::crd::GatewaySet;
use crate::engine::{select_enabled, Gated, ResourceBuilder, ResourceSet, Variant};
use crate::error::Result;
use crate::k8sutil::ManagedObject;

type BuildFn = fn(&GatewaySet, &Variant) -> Result<ManagedObject>;

fn builder(name: &'static str, gws: &Arc<GatewaySet>, build: BuildFn) -> ResourceBuilder<ManagedObject> {
    let gws = Arc::clone(gws);
    ResourceBuilder::new(name, move |gw: &Variant| build(&gws, gw))
}

/// Enabled gateways, ingress first
pub fn gateway_variants(gws: &GatewaySet) -> Result<Vec<Variant>> {
    let gateways = &gws.spec.gateways;
    select_enabled([
        Gated::new(gateways.ingress.enabled, INGRESS),
        Gated::new(gateways.egress.enabled, EGRESS),
    ])
    .into_iter()
    .map(Variant::new)
    .collect()
}

/// Builders applied to every enabled gateway, in apply order
pub fn gateway_builders(gws: &Arc<GatewaySet>) -> Vec<ResourceBuilder<ManagedObject>> {
    let pdb_enabled = gws.spec.default_pod_disruption_budget.enabled;
    select_enabled([
        Gated::always(builder("serviceAccount", gws, service_account)),
        Gated::always(builder("clusterRole", gws, cluster_role)),
        Gated::always(builder("clusterRoleBinding", gws, cluster_role_binding)),
        Gated::always(builder("deployment", gws, deployment)),
        Gated::always(builder("service", gws, service)),
        Gated::always(builder("horizontalPodAutoscaler", gws, horizontal_pod_autoscaler)),
        Gated::new(pdb_enabled, builder("podDisruptionBudget", gws, pod_disruption_budget)),
    ])
}

pub fn build_resource_set(gws: &Arc<GatewaySet>) -> Result<ResourceSet<ManagedObject>> {
    let dynamic = select_enabled([Gated::new(
        gws.spec.gateways.k8s_ingress.enabled,
        k8s_ingress(gws),
    )]);

    ResourceSet::new(gateway_variants(gws)?, gateway_builders(gws), dynamic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::GatewaySetSpec;

    fn gateway_set(configure: impl FnOnce(&mut GatewaySetSpec)) -> Arc<GatewaySet> {
        let mut spec = GatewaySetSpec::default();
        configure(&mut spec);
        Arc::new(GatewaySet::new("mesh", spec))
    }

    #[test]
    fn test_defaults_select_both_gateways() {
        let set = build_resource_set(&gateway_set(|_| {})).unwrap();

        let variants: Vec<_> = set.variants().iter().map(Variant::as_str).collect();
        assert_eq!(variants, vec![INGRESS, EGRESS]);
        assert_eq!(set.builders().len(), 6);
        assert!(set.dynamic().is_empty());
        assert_eq!(set.expand().len(), 12);
    }

    #[test]
    fn test_pdb_builder_is_last_when_enabled() {
        let set = build_resource_set(&gateway_set(|s| {
            s.default_pod_disruption_budget.enabled = true;
        }))
        .unwrap();

        let names: Vec<_> = set.builders().iter().map(ResourceBuilder::name).collect();
        assert_eq!(
            names,
            vec![
                "serviceAccount",
                "clusterRole",
                "clusterRoleBinding",
                "deployment",
                "service",
                "horizontalPodAutoscaler",
                "podDisruptionBudget",
            ]
        );
    }

    #[test]
    fn test_disabled_gateway_is_not_expanded() {
        let set = build_resource_set(&gateway_set(|s| s.gateways.egress.enabled = false)).unwrap();

        let origins: Vec<_> = set.expand().iter().map(|p| p.origin().to_string()).collect();
        assert_eq!(origins.len(), 6);
        assert!(origins.iter().all(|o| o.starts_with("ingressgateway/")));
    }

    #[test]
    fn test_k8s_ingress_is_gated() {
        let set = build_resource_set(&gateway_set(|s| s.gateways.k8s_ingress.enabled = true)).unwrap();
        assert_eq!(set.dynamic().len(), 1);
        assert_eq!(set.dynamic()[0].name(), "k8sIngress");
    }

    #[test]
    fn test_no_gateways_yields_empty_run() {
        let set = build_resource_set(&gateway_set(|s| {
            s.gateways.ingress.enabled = false;
            s.gateways.egress.enabled = false;
        }))
        .unwrap();
        assert!(set.expand().is_empty());
    }
}
