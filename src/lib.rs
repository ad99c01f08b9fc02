//! gateway-operator: Kubernetes operator for service mesh ingress/egress gateways
//!
//! A [`crd::GatewaySet`] declares a gateway pair. The [`engine`] expands its
//! resource builders over the enabled gateways and converges every object
//! through a [`k8sutil`] convergence primitive, either the live cluster or an
//! in-memory store.

pub mod config;
pub mod controller;
pub mod crd;
pub mod engine;
pub mod error;
pub mod gateways;
pub mod k8sutil;
pub mod telemetry;

pub use crate::error::{Error, Result};
