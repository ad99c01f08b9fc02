//! Custom Resource Definitions for the gateway operator

mod gateway_set;
pub mod types;

#[cfg(test)]
mod tests;

pub use gateway_set::{GatewaySet, GatewaySetSpec, GatewaySetStatus};
pub use types::*;
