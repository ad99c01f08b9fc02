//! Loading GatewaySet documents from disk
//!
//! Used by the `reconcile` and `render` commands. A file holds either a full
//! GatewaySet manifest or just its spec.

use std::path::Path;

use serde_yaml::Value;
use tracing::debug;

use crate::crd::{GatewaySet, GatewaySetSpec};
use crate::error::{Error, Result};

pub const DEFAULT_NAMESPACE: &str = "default";

/// Name given to a GatewaySet read from a bare spec
pub const DEFAULT_NAME: &str = "gateways";

/// Parse a GatewaySet manifest (or bare spec) from YAML.
///
/// `namespace` overrides the manifest's namespace; without either, objects
/// land in `default`. `spec` is validated before it is returned.
pub fn parse_gateway_set(raw: &str, namespace: Option<&str>) -> Result<GatewaySet> {
    let doc: Value = serde_yaml::from_str(raw)?;

    let mut gws = if doc.get("spec").is_some() {
        match doc.get("kind").and_then(Value::as_str) {
            Some("GatewaySet") | None => {}
            Some(other) => {
                return Err(Error::ConfigError(format!(
                    "expected kind GatewaySet, found {other}"
                )))
            }
        }
        serde_yaml::from_value::<GatewaySet>(doc)?
    } else {
        let spec: GatewaySetSpec = serde_yaml::from_value(doc)?;
        GatewaySet::new(DEFAULT_NAME, spec)
    };

    if let Some(ns) = namespace {
        gws.metadata.namespace = Some(ns.to_string());
    } else if gws.metadata.namespace.is_none() {
        gws.metadata.namespace = Some(DEFAULT_NAMESPACE.to_string());
    }

    gws.spec.validate().map_err(Error::ValidationError)?;
    Ok(gws)
}

pub fn load_gateway_set(path: &Path, namespace: Option<&str>) -> Result<GatewaySet> {
    debug!(path = %path.display(), "Loading GatewaySet");
    let raw = std::fs::read_to_string(path)?;
    parse_gateway_set(&raw, namespace)
}
