//! Error types for the gateway operator

use kube::runtime::finalizer::Error as FinalizerFailure;
use thiserror::Error;

use crate::engine::{Pass, ResourceRef};

/// Main error type for gateway reconciliation
#[derive(Error, Debug)]
pub enum Error {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    /// Operator or resource configuration is unusable
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// GatewaySet spec failed validation
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// JSON (de)serialization failure
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// YAML (de)serialization failure
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// A builder could not produce its resource
    #[error("failed to build {pass} {origin}: {source}")]
    Construction {
        pass: Pass,
        origin: String,
        #[source]
        source: Box<Error>,
    },

    /// The convergence primitive failed for a constructed resource
    #[error("failed to reconcile {pass} {origin} ({resource}): {source}")]
    Reconcile {
        pass: Pass,
        origin: String,
        resource: ResourceRef,
        #[source]
        source: Box<Error>,
    },

    /// Finalizer add/remove or cleanup failure
    #[error("Finalizer error: {0}")]
    FinalizerError(#[source] Box<kube::runtime::finalizer::Error<Error>>),
}

impl From<kube::runtime::finalizer::Error<Error>> for Error {
    fn from(err: kube::runtime::finalizer::Error<Error>) -> Self {
        Error::FinalizerError(Box::new(err))
    }
}

impl Error {
    /// Whether requeueing soon has a chance of succeeding.
    ///
    /// Configuration and validation problems need a spec change first, so they
    /// are retried on the slow interval.
    pub fn is_retriable(&self) -> bool {
        match self {
            Error::KubeError(_) | Error::IoError(_) => true,
            Error::ConfigError(_)
            | Error::ValidationError(_)
            | Error::SerializationError(_)
            | Error::YamlError(_) => false,
            Error::Construction { .. } => false,
            Error::Reconcile { source, .. } => source.is_retriable(),
            Error::FinalizerError(err) => match err.as_ref() {
                FinalizerFailure::ApplyFailed(e) | FinalizerFailure::CleanupFailed(e) => {
                    e.is_retriable()
                }
                _ => true,
            },
        }
    }

    /// The resource whose convergence failed, if this error came out of a pass.
    pub fn failed_resource(&self) -> Option<&ResourceRef> {
        match self {
            Error::Reconcile { resource, .. } => Some(resource),
            _ => None,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    fn deployment_ref() -> ResourceRef {
        ResourceRef {
            group: "apps".to_string(),
            version: "v1".to_string(),
            kind: "Deployment".to_string(),
            namespace: Some("istio-system".to_string()),
            name: "istio-ingressgateway".to_string(),
        }
    }

    #[test]
    fn test_reconcile_error_names_resource() {
        let err = Error::Reconcile {
            pass: Pass::Typed,
            origin: "ingressgateway/deployment".to_string(),
            resource: deployment_ref(),
            source: Box::new(Error::ConfigError("boom".to_string())),
        };

        let msg = err.to_string();
        assert!(
            msg.starts_with("failed to reconcile resource ingressgateway/deployment"),
            "{msg}"
        );
        assert!(msg.contains("Deployment"), "{msg}");
        assert!(msg.contains("istio-system/istio-ingressgateway"), "{msg}");
        assert!(msg.ends_with("boom"), "{msg}");
    }

    #[test]
    fn test_dynamic_pass_is_named_in_message() {
        let err = Error::Construction {
            pass: Pass::Dynamic,
            origin: "k8s-ingress".to_string(),
            source: Box::new(Error::ValidationError("missing namespace".to_string())),
        };
        assert_eq!(
            err.to_string(),
            "failed to build dynamic resource k8s-ingress: Validation error: missing namespace"
        );
    }

    #[test]
    fn test_retriable_follows_wrapped_source() {
        let config = Error::Reconcile {
            pass: Pass::Typed,
            origin: "ingressgateway/deployment".to_string(),
            resource: deployment_ref(),
            source: Box::new(Error::ConfigError("bad".to_string())),
        };
        assert!(!config.is_retriable());

        let io = Error::Reconcile {
            pass: Pass::Typed,
            origin: "ingressgateway/deployment".to_string(),
            resource: deployment_ref(),
            source: Box::new(Error::IoError(std::io::Error::other("reset"))),
        };
        assert!(io.is_retriable());
        assert_eq!(io.failed_resource(), Some(&deployment_ref()));
    }
}
