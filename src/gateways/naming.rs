//! Names and labels derived from a gateway variant

use std::collections::BTreeMap;

use crate::engine::Variant;

pub const INGRESS: &str = "ingressgateway";
pub const EGRESS: &str = "egressgateway";

pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
pub const MANAGED_BY: &str = "gateway-operator";

pub fn service_account_name(gw: &Variant) -> String {
    format!("istio-{gw}-service-account")
}

/// Cluster-scoped, so the owning namespace is part of the name
pub fn cluster_role_name(gw: &Variant, namespace: &str) -> String {
    format!("istio-{gw}-cluster-role-{namespace}")
}

pub fn cluster_role_binding_name(gw: &Variant, namespace: &str) -> String {
    format!("istio-{gw}-cluster-role-binding-{namespace}")
}

/// Deployment and Service name
pub fn gateway_name(gw: &Variant) -> String {
    format!("istio-{gw}")
}

pub fn hpa_name(gw: &Variant) -> String {
    format!("istio-{gw}-autoscaler")
}

pub fn pdb_name(gw: &Variant) -> String {
    format!("istio-{gw}")
}

pub fn gateway_labels(gw: &Variant) -> BTreeMap<String, String> {
    BTreeMap::from([("app".to_string(), gateway_name(gw))])
}

/// Pod selector: the gateway labels plus `istio=<gw>`
pub fn label_selector(gw: &Variant) -> BTreeMap<String, String> {
    merge_labels(
        gateway_labels(gw),
        BTreeMap::from([("istio".to_string(), gw.to_string())]),
    )
}

/// Labels stamped on every object's metadata
pub fn object_labels(gw: &Variant) -> BTreeMap<String, String> {
    merge_labels(
        gateway_labels(gw),
        BTreeMap::from([(MANAGED_BY_LABEL.to_string(), MANAGED_BY.to_string())]),
    )
}

/// Later maps win on conflicting keys.
pub fn merge_labels(
    mut base: BTreeMap<String, String>,
    extra: BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    base.extend(extra);
    base
}
