//! Controller module for GatewaySet reconciliation

pub mod conditions;
mod finalizers;
mod reconciler;

pub use finalizers::{cleanup_cluster_scoped, GATEWAY_SET_FINALIZER};
pub use reconciler::{run_controller, ControllerState};
