//! Istio Gateway serving Kubernetes Ingress resources
//!
//! `networking.istio.io` types are not part of `k8s-openapi`, so the object
//! goes through the dynamic pass. It only exists while the ingress gateway
//! does; disabling ingress removes it.

use std::sync::Arc;

use kube::api::{ApiResource, GroupVersionKind};
use kube::Resource;
use serde_json::json;

use super::naming::{object_labels, INGRESS};
use super::resources::target_namespace;
use crate::crd::GatewaySet;
use crate::engine::{DesiredState, DynamicResource, DynamicResourceWithDesiredState, Variant};
use crate::error::Result;

pub const K8S_INGRESS_GATEWAY_NAME: &str = "istio-autogenerated-k8s-ingress";

pub fn gateway_api_resource() -> ApiResource {
    ApiResource::from_gvk_with_plural(
        &GroupVersionKind::gvk("networking.istio.io", "v1alpha3", "Gateway"),
        "gateways",
    )
}

/// Handle for the Gateway object
pub fn k8s_ingress_resource(gws: &GatewaySet) -> Result<DynamicResource> {
    let ingress = Variant::new(INGRESS)?;
    Ok(
        DynamicResource::new(gateway_api_resource(), K8S_INGRESS_GATEWAY_NAME)
            .within(target_namespace(gws))
            .labels(object_labels(&ingress))
            .owned_by(gws.controller_owner_ref(&())),
    )
}

/// Present with an HTTP server on port 80 while the ingress gateway is
/// enabled, absent otherwise.
pub fn k8s_ingress_desired_state(gws: &GatewaySet) -> DesiredState {
    if !gws.spec.gateways.ingress.enabled {
        return DesiredState::Absent;
    }

    DesiredState::Present(json!({
        "spec": {
            "selector": { "istio": INGRESS },
            "servers": [{
                "port": { "number": 80, "protocol": "HTTP2", "name": "http" },
                "hosts": ["*"],
            }],
        }
    }))
}

pub fn k8s_ingress(gws: &Arc<GatewaySet>) -> DynamicResourceWithDesiredState {
    let for_resource = Arc::clone(gws);
    let for_state = Arc::clone(gws);
    DynamicResourceWithDesiredState::new(
        "k8sIngress",
        move || k8s_ingress_resource(&for_resource),
        move |_resource: &DynamicResource| Ok(k8s_ingress_desired_state(&for_state)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::GatewaySetSpec;
    use crate::engine::Identify;

    fn gateway_set(ingress_enabled: bool) -> GatewaySet {
        let mut spec = GatewaySetSpec::default();
        spec.gateways.ingress.enabled = ingress_enabled;
        let mut gws = GatewaySet::new("mesh", spec);
        gws.metadata.namespace = Some("istio-system".to_string());
        gws
    }

    #[test]
    fn test_handle_locates_istio_gateway() {
        let resource = k8s_ingress_resource(&gateway_set(true)).unwrap();
        let id = resource.resource_ref();

        assert_eq!(id.api_version(), "networking.istio.io/v1alpha3");
        assert_eq!(id.kind, "Gateway");
        assert_eq!(id.namespace.as_deref(), Some("istio-system"));
        assert_eq!(resource.api_resource.plural, "gateways");
        // no uid on the fixture, so no owner
        assert!(resource.owner_references.is_empty());
    }

    #[test]
    fn test_present_while_ingress_enabled() {
        let DesiredState::Present(body) = k8s_ingress_desired_state(&gateway_set(true)) else {
            panic!("expected the gateway to be present");
        };
        assert_eq!(body["spec"]["selector"]["istio"], "ingressgateway");
        assert_eq!(body["spec"]["servers"][0]["port"]["number"], 80);
    }

    #[test]
    fn test_absent_when_ingress_disabled() {
        assert_eq!(
            k8s_ingress_desired_state(&gateway_set(false)),
            DesiredState::Absent
        );
    }
}
