//! Tests for GatewaySet parsing and validation

use super::*;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::CustomResourceExt;

fn spec() -> GatewaySetSpec {
    GatewaySetSpec::default()
}

#[test]
fn test_empty_spec_uses_defaults() {
    let spec: GatewaySetSpec = serde_yaml::from_str("{}").unwrap();

    assert_eq!(spec, GatewaySetSpec::default());
    assert!(spec.gateways.ingress.enabled);
    assert!(spec.gateways.egress.enabled);
    assert!(!spec.gateways.k8s_ingress.enabled);
    assert!(!spec.default_pod_disruption_budget.enabled);
    assert_eq!(spec.gateways.ingress.max_replicas, 5);
}

#[test]
fn test_camel_case_fields() {
    let yaml = r#"
proxyImage: registry.local/proxyv2:1.2.0
imagePullPolicy: IfNotPresent
gateways:
  ingress:
    replicaCount: 2
    targetCpuUtilizationPercentage: 60
    serviceType: NodePort
    ports:
      - name: http
        port: 80
        targetPort: 8080
  k8sIngress:
    enabled: true
defaultPodDisruptionBudget:
  enabled: true
  maxUnavailable: 1
"#;
    let spec: GatewaySetSpec = serde_yaml::from_str(yaml).unwrap();

    assert_eq!(spec.image_pull_policy.as_deref(), Some("IfNotPresent"));
    let ingress = &spec.gateways.ingress;
    assert_eq!(ingress.replica_count, 2);
    assert_eq!(ingress.target_cpu_utilization_percentage, 60);
    assert_eq!(ingress.ports[0].container_port(), 8080);
    assert_eq!(ingress.ports[0].protocol, "TCP");
    assert!(spec.gateways.k8s_ingress.enabled);
    assert_eq!(
        spec.default_pod_disruption_budget.max_unavailable,
        Some(IntOrString::Int(1))
    );
    assert!(spec.validate().is_ok());
}

#[test]
fn test_default_spec_is_valid() {
    assert!(spec().validate().is_ok());
}

#[test]
fn test_empty_image_rejected() {
    let mut s = spec();
    s.proxy_image = " ".to_string();
    assert!(s.validate().is_err());
}

#[test]
fn test_inverted_replica_bounds_rejected() {
    let mut s = spec();
    s.gateways.egress.min_replicas = 4;
    s.gateways.egress.max_replicas = 2;
    let err = s.validate().unwrap_err();
    assert!(err.contains("gateways.egress.minReplicas"), "{err}");
}

#[test]
fn test_disabled_gateway_not_validated() {
    let mut s = spec();
    s.gateways.egress.enabled = false;
    s.gateways.egress.min_replicas = 0;
    assert!(s.validate().is_ok());
}

#[test]
fn test_cpu_target_out_of_range_rejected() {
    let mut s = spec();
    s.gateways.ingress.target_cpu_utilization_percentage = 0;
    assert!(s.validate().is_err());
}

#[test]
fn test_duplicate_port_names_rejected() {
    let mut s = spec();
    s.gateways.ingress.ports = vec![
        GatewayPort::new("http", 80, 80),
        GatewayPort::new("http", 8080, 8080),
    ];
    let err = s.validate().unwrap_err();
    assert!(err.contains("duplicate port name http"), "{err}");
}

#[test]
fn test_port_out_of_range_rejected() {
    let mut s = spec();
    s.gateways.ingress.ports = vec![GatewayPort::new("http", 70000, 80)];
    assert!(s.validate().is_err());
}

#[test]
fn test_pdb_with_both_bounds_rejected() {
    let mut s = spec();
    s.default_pod_disruption_budget.enabled = true;
    s.default_pod_disruption_budget.min_available = Some(IntOrString::Int(1));
    s.default_pod_disruption_budget.max_unavailable = Some(IntOrString::Int(1));
    let err = s.validate().unwrap_err();
    assert!(err.contains("minAvailable and maxUnavailable"), "{err}");

    s.default_pod_disruption_budget.max_unavailable = None;
    assert!(s.validate().is_ok());

    s.default_pod_disruption_budget.enabled = false;
    s.default_pod_disruption_budget.max_unavailable = Some(IntOrString::Int(1));
    assert!(s.validate().is_ok());
}

#[test]
fn test_crd_metadata() {
    let crd = GatewaySet::crd();
    assert_eq!(crd.spec.group, "gateways.meshops.io");
    assert_eq!(crd.spec.names.kind, "GatewaySet");
    assert_eq!(crd.spec.names.plural, "gatewaysets");
    assert_eq!(crd.spec.scope, "Namespaced");
}

#[test]
fn test_config_state_display() {
    assert_eq!(ConfigState::ReconcileFailed.to_string(), "ReconcileFailed");
    let json = serde_json::to_value(ConfigState::Available).unwrap();
    assert_eq!(json, "Available");
}
