//! Kubernetes resource builders for the gateways
//!
//! Every builder is a pure function of the GatewaySet snapshot and a gateway
//! variant. Namespaced objects are owned by the GatewaySet; cluster-scoped
//! RBAC objects are removed by the finalizer instead.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::autoscaling::v2::{
    CrossVersionObjectReference, HorizontalPodAutoscaler, HorizontalPodAutoscalerSpec,
    MetricSpec, MetricTarget, ResourceMetricSource,
};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar, EnvVarSource, HTTPGetAction, ObjectFieldSelector, PodSpec,
    PodTemplateSpec, Probe, Service, ServiceAccount, ServicePort, ServiceSpec,
};
use k8s_openapi::api::policy::v1::{PodDisruptionBudget, PodDisruptionBudgetSpec};
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, PolicyRule, RoleRef, Subject};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta, OwnerReference};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::{Resource, ResourceExt};

use super::naming::{
    cluster_role_binding_name, cluster_role_name, gateway_name, hpa_name, label_selector,
    merge_labels, object_labels, pdb_name, service_account_name, EGRESS, INGRESS,
};
use crate::crd::{GatewayConfiguration, GatewayPort, GatewaySet};
use crate::engine::Variant;
use crate::error::{Error, Result};
use crate::k8sutil::ManagedObject;

const PROXY_CONTAINER: &str = "istio-proxy";
const PROMETHEUS_PORT: i32 = 15090;
const STATUS_PORT: i32 = 15020;

/// Configuration record of the given gateway
pub fn gateway_config<'a>(gws: &'a GatewaySet, gw: &Variant) -> Result<&'a GatewayConfiguration> {
    match gw.as_str() {
        INGRESS => Ok(&gws.spec.gateways.ingress),
        EGRESS => Ok(&gws.spec.gateways.egress),
        other => Err(Error::ConfigError(format!(
            "unknown gateway variant {other}"
        ))),
    }
}

/// Namespace all namespaced gateway objects live in
pub fn target_namespace(gws: &GatewaySet) -> String {
    gws.namespace().unwrap_or_else(|| "default".to_string())
}

fn owner_reference(gws: &GatewaySet) -> Option<OwnerReference> {
    gws.controller_owner_ref(&()).map(|mut owner| {
        owner.block_owner_deletion = Some(true);
        owner
    })
}

fn namespaced_meta(gws: &GatewaySet, gw: &Variant, name: String) -> ObjectMeta {
    ObjectMeta {
        name: Some(name),
        namespace: Some(target_namespace(gws)),
        labels: Some(object_labels(gw)),
        owner_references: owner_reference(gws).map(|owner| vec![owner]),
        ..Default::default()
    }
}

fn cluster_meta(gw: &Variant, name: String) -> ObjectMeta {
    ObjectMeta {
        name: Some(name),
        labels: Some(object_labels(gw)),
        ..Default::default()
    }
}

/// Ports from configuration, or the gateway's defaults when none are set
pub fn effective_ports(gw: &Variant, config: &GatewayConfiguration) -> Vec<GatewayPort> {
    if !config.ports.is_empty() {
        return config.ports.clone();
    }

    let mut ports = vec![
        GatewayPort::new("http2", 80, 80),
        GatewayPort::new("https", 443, 443),
    ];
    if gw.as_str() == INGRESS {
        ports.push(GatewayPort::new("tls", 15443, 15443));
    }
    ports
}

fn service_type(gw: &Variant, config: &GatewayConfiguration) -> String {
    config.service_type.clone().unwrap_or_else(|| {
        if gw.as_str() == INGRESS {
            "LoadBalancer".to_string()
        } else {
            "ClusterIP".to_string()
        }
    })
}

// ============================================================================
// ServiceAccount
// ============================================================================

pub fn service_account(gws: &GatewaySet, gw: &Variant) -> Result<ManagedObject> {
    Ok(ManagedObject::ServiceAccount(ServiceAccount {
        metadata: namespaced_meta(gws, gw, service_account_name(gw)),
        ..Default::default()
    }))
}

// ============================================================================
// ClusterRole / ClusterRoleBinding
// ============================================================================

pub fn cluster_role(gws: &GatewaySet, gw: &Variant) -> Result<ManagedObject> {
    let namespace = target_namespace(gws);

    Ok(ManagedObject::ClusterRole(ClusterRole {
        metadata: cluster_meta(gw, cluster_role_name(gw, &namespace)),
        rules: Some(vec![PolicyRule {
            api_groups: Some(vec!["networking.istio.io".to_string()]),
            resources: Some(vec![
                "virtualservices".to_string(),
                "destinationrules".to_string(),
                "gateways".to_string(),
            ]),
            verbs: vec![
                "get".to_string(),
                "watch".to_string(),
                "list".to_string(),
                "update".to_string(),
            ],
            ..Default::default()
        }]),
        ..Default::default()
    }))
}

pub fn cluster_role_binding(gws: &GatewaySet, gw: &Variant) -> Result<ManagedObject> {
    let namespace = target_namespace(gws);

    Ok(ManagedObject::ClusterRoleBinding(ClusterRoleBinding {
        metadata: cluster_meta(gw, cluster_role_binding_name(gw, &namespace)),
        role_ref: RoleRef {
            api_group: "rbac.authorization.k8s.io".to_string(),
            kind: "ClusterRole".to_string(),
            name: cluster_role_name(gw, &namespace),
        },
        subjects: Some(vec![Subject {
            kind: "ServiceAccount".to_string(),
            name: service_account_name(gw),
            namespace: Some(namespace),
            ..Default::default()
        }]),
    }))
}

// ============================================================================
// Deployment
// ============================================================================

pub fn deployment(gws: &GatewaySet, gw: &Variant) -> Result<ManagedObject> {
    let config = gateway_config(gws, gw)?;
    let selector = label_selector(gw);

    Ok(ManagedObject::Deployment(Deployment {
        metadata: namespaced_meta(gws, gw, gateway_name(gw)),
        spec: Some(DeploymentSpec {
            replicas: Some(config.replica_count),
            selector: LabelSelector {
                match_labels: Some(selector.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(selector),
                    annotations: Some(BTreeMap::from([(
                        "sidecar.istio.io/inject".to_string(),
                        "false".to_string(),
                    )])),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    service_account_name: Some(service_account_name(gw)),
                    containers: vec![proxy_container(gws, gw, config)],
                    node_selector: if config.node_selector.is_empty() {
                        None
                    } else {
                        Some(config.node_selector.clone())
                    },
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        status: None,
    }))
}

fn proxy_container(gws: &GatewaySet, gw: &Variant, config: &GatewayConfiguration) -> Container {
    let mut ports: Vec<ContainerPort> = effective_ports(gw, config)
        .iter()
        .map(|p| ContainerPort {
            container_port: p.container_port(),
            protocol: Some(p.protocol.clone()),
            ..Default::default()
        })
        .collect();
    ports.push(ContainerPort {
        name: Some("http-envoy-prom".to_string()),
        container_port: PROMETHEUS_PORT,
        protocol: Some("TCP".to_string()),
        ..Default::default()
    });

    let args: Vec<String> = [
        "proxy",
        "router",
        "--domain",
        "$(POD_NAMESPACE).svc.cluster.local",
        "--log_output_level",
        "info",
        "--drainDuration",
        "45s",
        "--parentShutdownDuration",
        "1m0s",
        "--connectTimeout",
        "10s",
        "--serviceCluster",
        gateway_name(gw).as_str(),
        "--proxyAdminPort",
        "15000",
        "--statusPort",
        STATUS_PORT.to_string().as_str(),
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    Container {
        name: PROXY_CONTAINER.to_string(),
        image: Some(gws.spec.proxy_image.clone()),
        image_pull_policy: gws.spec.image_pull_policy.clone(),
        args: Some(args),
        ports: Some(ports),
        env: Some(vec![
            field_env("POD_NAME", "metadata.name"),
            field_env("POD_NAMESPACE", "metadata.namespace"),
            field_env("INSTANCE_IP", "status.podIP"),
            EnvVar {
                name: "ISTIO_META_ROUTER_MODE".to_string(),
                value: Some("sni-dnat".to_string()),
                ..Default::default()
            },
        ]),
        readiness_probe: Some(Probe {
            http_get: Some(HTTPGetAction {
                path: Some("/healthz/ready".to_string()),
                port: IntOrString::Int(STATUS_PORT),
                scheme: Some("HTTP".to_string()),
                ..Default::default()
            }),
            initial_delay_seconds: Some(1),
            period_seconds: Some(2),
            failure_threshold: Some(30),
            ..Default::default()
        }),
        resources: config.resources.clone(),
        ..Default::default()
    }
}

fn field_env(name: &str, field_path: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value_from: Some(EnvVarSource {
            field_ref: Some(ObjectFieldSelector {
                api_version: Some("v1".to_string()),
                field_path: field_path.to_string(),
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

// ============================================================================
// Service
// ============================================================================

pub fn service(gws: &GatewaySet, gw: &Variant) -> Result<ManagedObject> {
    let config = gateway_config(gws, gw)?;

    let mut metadata = namespaced_meta(gws, gw, gateway_name(gw));
    metadata.labels = Some(merge_labels(
        object_labels(gw),
        config.service_labels.clone(),
    ));
    if !config.service_annotations.is_empty() {
        metadata.annotations = Some(config.service_annotations.clone());
    }

    let ports = effective_ports(gw, config)
        .into_iter()
        .map(|p| ServicePort {
            target_port: Some(IntOrString::Int(p.container_port())),
            name: Some(p.name),
            port: p.port,
            protocol: Some(p.protocol),
            ..Default::default()
        })
        .collect();

    Ok(ManagedObject::Service(Service {
        metadata,
        spec: Some(ServiceSpec {
            type_: Some(service_type(gw, config)),
            selector: Some(label_selector(gw)),
            ports: Some(ports),
            ..Default::default()
        }),
        status: None,
    }))
}

// ============================================================================
// HorizontalPodAutoscaler
// ============================================================================

pub fn horizontal_pod_autoscaler(gws: &GatewaySet, gw: &Variant) -> Result<ManagedObject> {
    let config = gateway_config(gws, gw)?;

    if config.min_replicas > config.max_replicas {
        return Err(Error::ValidationError(format!(
            "{gw}: minReplicas ({}) exceeds maxReplicas ({})",
            config.min_replicas, config.max_replicas
        )));
    }

    Ok(ManagedObject::HorizontalPodAutoscaler(
        HorizontalPodAutoscaler {
            metadata: namespaced_meta(gws, gw, hpa_name(gw)),
            spec: Some(HorizontalPodAutoscalerSpec {
                scale_target_ref: CrossVersionObjectReference {
                    api_version: Some("apps/v1".to_string()),
                    kind: "Deployment".to_string(),
                    name: gateway_name(gw),
                },
                min_replicas: Some(config.min_replicas),
                max_replicas: config.max_replicas,
                metrics: Some(vec![MetricSpec {
                    type_: "Resource".to_string(),
                    resource: Some(ResourceMetricSource {
                        name: "cpu".to_string(),
                        target: MetricTarget {
                            type_: "Utilization".to_string(),
                            average_utilization: Some(config.target_cpu_utilization_percentage),
                            ..Default::default()
                        },
                    }),
                    ..Default::default()
                }]),
                behavior: None,
            }),
            status: None,
        },
    ))
}

// ============================================================================
// PodDisruptionBudget
// ============================================================================

pub fn pod_disruption_budget(gws: &GatewaySet, gw: &Variant) -> Result<ManagedObject> {
    let pdb = &gws.spec.default_pod_disruption_budget;

    // default to minAvailable: 1 when no bound is given
    let (min_available, max_unavailable) = match (&pdb.min_available, &pdb.max_unavailable) {
        (None, None) => (Some(IntOrString::Int(1)), None),
        (min, max) => (min.clone(), max.clone()),
    };

    Ok(ManagedObject::PodDisruptionBudget(PodDisruptionBudget {
        metadata: namespaced_meta(gws, gw, pdb_name(gw)),
        spec: Some(PodDisruptionBudgetSpec {
            selector: Some(LabelSelector {
                match_labels: Some(label_selector(gw)),
                ..Default::default()
            }),
            min_available,
            max_unavailable,
            ..Default::default()
        }),
        status: None,
    }))
}
