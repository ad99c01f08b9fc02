//! Shared types for the GatewaySet CRD

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::ResourceRequirements;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Configuration for both gateways plus the k8s ingress gateway object
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GatewaysConfig {
    /// Ingress gateway (`ingressgateway` variant)
    #[serde(default)]
    pub ingress: GatewayConfiguration,

    /// Egress gateway (`egressgateway` variant)
    #[serde(default)]
    pub egress: GatewayConfiguration,

    /// Istio Gateway object serving Kubernetes Ingress resources
    #[serde(default)]
    pub k8s_ingress: K8sIngressConfig,
}

/// Per-gateway configuration
///
/// Ports and service type fall back to per-gateway defaults when unset: the
/// ingress gateway is exposed through a `LoadBalancer` service, the egress
/// gateway through `ClusterIP`.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfiguration {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Initial replica count of the gateway Deployment
    #[serde(default = "default_replica_count")]
    pub replica_count: i32,

    /// Autoscaler lower bound
    #[serde(default = "default_min_replicas")]
    pub min_replicas: i32,

    /// Autoscaler upper bound
    #[serde(default = "default_max_replicas")]
    pub max_replicas: i32,

    /// Target average CPU utilization (1-100)
    #[serde(default = "default_target_cpu")]
    pub target_cpu_utilization_percentage: i32,

    /// Service type (LoadBalancer, NodePort, ClusterIP)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_type: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub service_annotations: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub service_labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<GatewayPort>,

    /// Container resources of the gateway proxy
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<serde_json::Value>")]
    pub resources: Option<ResourceRequirements>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_selector: BTreeMap<String, String>,
}

impl Default for GatewayConfiguration {
    fn default() -> Self {
        Self {
            enabled: true,
            replica_count: default_replica_count(),
            min_replicas: default_min_replicas(),
            max_replicas: default_max_replicas(),
            target_cpu_utilization_percentage: default_target_cpu(),
            service_type: None,
            service_annotations: BTreeMap::new(),
            service_labels: BTreeMap::new(),
            ports: Vec::new(),
            resources: None,
            node_selector: BTreeMap::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_replica_count() -> i32 {
    1
}

fn default_min_replicas() -> i32 {
    1
}

fn default_max_replicas() -> i32 {
    5
}

fn default_target_cpu() -> i32 {
    80
}

/// A port exposed by a gateway Service and its proxy container
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GatewayPort {
    pub name: String,
    pub port: i32,

    /// Container port; defaults to `port`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_port: Option<i32>,

    #[serde(default = "default_protocol")]
    pub protocol: String,
}

impl GatewayPort {
    pub fn new(name: &str, port: i32, target_port: i32) -> Self {
        Self {
            name: name.to_string(),
            port,
            target_port: Some(target_port),
            protocol: default_protocol(),
        }
    }

    pub fn container_port(&self) -> i32 {
        self.target_port.unwrap_or(self.port)
    }
}

fn default_protocol() -> String {
    "TCP".to_string()
}

/// Istio Gateway for Kubernetes Ingress traffic
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct K8sIngressConfig {
    #[serde(default)]
    pub enabled: bool,
}

/// Default PodDisruptionBudget applied to every gateway
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodDisruptionBudgetConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Defaults to 1 when neither bound is set
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<serde_json::Value>")]
    pub min_available: Option<IntOrString>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<serde_json::Value>")]
    pub max_unavailable: Option<IntOrString>,
}

/// Reconciliation state reported in status
#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum ConfigState {
    Reconciling,
    Available,
    ReconcileFailed,
}

impl std::fmt::Display for ConfigState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigState::Reconciling => write!(f, "Reconciling"),
            ConfigState::Available => write!(f, "Available"),
            ConfigState::ReconcileFailed => write!(f, "ReconcileFailed"),
        }
    }
}

/// Kubernetes-style condition
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition (e.g., "Ready")
    #[serde(rename = "type")]
    pub type_: String,
    /// "True", "False", or "Unknown"
    pub status: String,
    pub last_transition_time: String,
    /// Machine-readable reason
    pub reason: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}
