//! GatewaySet Custom Resource Definition
//!
//! A GatewaySet declares the ingress/egress gateway pair of a service mesh
//! installation. Resources are created in the GatewaySet's namespace.

use std::collections::HashSet;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::{
    Condition, ConfigState, GatewayConfiguration, GatewaysConfig, PodDisruptionBudgetConfig,
};

#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "gateways.meshops.io",
    version = "v1alpha1",
    kind = "GatewaySet",
    namespaced,
    status = "GatewaySetStatus",
    shortname = "gws",
    printcolumn = r#"{"name":"Status","type":"string","jsonPath":".status.status"}"#,
    printcolumn = r#"{"name":"Error","type":"string","jsonPath":".status.errorMessage"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct GatewaySetSpec {
    /// Proxy image run by both gateways
    #[serde(default = "default_proxy_image")]
    pub proxy_image: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_pull_policy: Option<String>,

    #[serde(default)]
    pub gateways: GatewaysConfig,

    #[serde(default)]
    pub default_pod_disruption_budget: PodDisruptionBudgetConfig,
}

fn default_proxy_image() -> String {
    "docker.io/istio/proxyv2:1.1.0".to_string()
}

impl Default for GatewaySetSpec {
    fn default() -> Self {
        Self {
            proxy_image: default_proxy_image(),
            image_pull_policy: None,
            gateways: GatewaysConfig::default(),
            default_pod_disruption_budget: PodDisruptionBudgetConfig::default(),
        }
    }
}

impl GatewaySetSpec {
    /// Check spec-level invariants of every enabled gateway
    pub fn validate(&self) -> Result<(), String> {
        if self.proxy_image.trim().is_empty() {
            return Err("proxyImage must not be empty".to_string());
        }
        validate_gateway("ingress", &self.gateways.ingress)?;
        validate_gateway("egress", &self.gateways.egress)?;

        let pdb = &self.default_pod_disruption_budget;
        if pdb.enabled && pdb.min_available.is_some() && pdb.max_unavailable.is_some() {
            return Err(
                "defaultPodDisruptionBudget: set only one of minAvailable and maxUnavailable"
                    .to_string(),
            );
        }
        Ok(())
    }
}

fn validate_gateway(field: &str, config: &GatewayConfiguration) -> Result<(), String> {
    if !config.enabled {
        return Ok(());
    }

    if config.replica_count < 0 {
        return Err(format!(
            "gateways.{field}.replicaCount must not be negative"
        ));
    }
    if config.min_replicas < 1 {
        return Err(format!("gateways.{field}.minReplicas must be at least 1"));
    }
    if config.min_replicas > config.max_replicas {
        return Err(format!(
            "gateways.{field}.minReplicas ({}) must not exceed maxReplicas ({})",
            config.min_replicas, config.max_replicas
        ));
    }
    if !(1..=100).contains(&config.target_cpu_utilization_percentage) {
        return Err(format!(
            "gateways.{field}.targetCpuUtilizationPercentage must be between 1 and 100"
        ));
    }

    let mut names = HashSet::new();
    for port in &config.ports {
        if port.name.is_empty() {
            return Err(format!("gateways.{field}.ports: every port needs a name"));
        }
        if !names.insert(port.name.as_str()) {
            return Err(format!(
                "gateways.{field}.ports: duplicate port name {}",
                port.name
            ));
        }
        if !(1..=65535).contains(&port.port) || !(1..=65535).contains(&port.container_port()) {
            return Err(format!(
                "gateways.{field}.ports.{}: port out of range",
                port.name
            ));
        }
    }

    Ok(())
}

/// Status subresource
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GatewaySetStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ConfigState>,

    /// First error of the last failed run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reconcile_time: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}
