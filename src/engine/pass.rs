//! Fail-fast reconciliation passes

use std::fmt;

use async_trait::async_trait;
use tracing::{debug, info};

use super::dynamic::{BoundDynamic, DynamicResourceWithDesiredState};
use super::expand::Pending;
use super::identity::Identify;
use crate::error::{Error, Result};

/// Which convergence path a resource went through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pass {
    Typed,
    Dynamic,
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pass::Typed => f.write_str("resource"),
            Pass::Dynamic => f.write_str("dynamic resource"),
        }
    }
}

/// What converging a single object did to the cluster.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Updated,
    Deleted,
    Unchanged,
}

impl Outcome {
    pub fn is_write(self) -> bool {
        !matches!(self, Outcome::Unchanged)
    }
}

/// Write counts for one pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub unchanged: usize,
}

impl PassSummary {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Created => self.created += 1,
            Outcome::Updated => self.updated += 1,
            Outcome::Deleted => self.deleted += 1,
            Outcome::Unchanged => self.unchanged += 1,
        }
    }

    pub fn writes(&self) -> usize {
        self.created + self.updated + self.deleted
    }

    pub fn total(&self) -> usize {
        self.writes() + self.unchanged
    }
}

/// Makes the live object match a constructed resource: create when absent,
/// update when divergent, leave alone when already matching.
///
/// Implementations own any retry policy; the passes never retry.
#[async_trait]
pub trait Converge<R: Sync + ?Sized>: Send + Sync {
    async fn converge(&self, resource: &R) -> Result<Outcome>;
}

/// Construct and converge `items` in order, stopping at the first failure.
///
/// Objects converged before the failure stay converged; nothing after it is
/// constructed or attempted.
pub async fn run_pass<R, C>(pass: Pass, items: &[Pending<R>], converger: &C) -> Result<PassSummary>
where
    R: Identify + Send + Sync,
    C: Converge<R> + ?Sized,
{
    let mut summary = PassSummary::default();

    for item in items {
        let resource = item.build().map_err(|source| Error::Construction {
            pass,
            origin: item.origin().to_string(),
            source: Box::new(source),
        })?;
        let id = resource.resource_ref();

        debug!(%pass, origin = item.origin(), resource = %id, "Converging");
        let outcome = converger
            .converge(&resource)
            .await
            .map_err(|source| Error::Reconcile {
                pass,
                origin: item.origin().to_string(),
                resource: id.clone(),
                source: Box::new(source),
            })?;

        if outcome.is_write() {
            info!(%pass, resource = %id, ?outcome, "Converged");
        }
        summary.record(outcome);
    }

    Ok(summary)
}

/// Typed pass over an expanded resource list.
pub async fn reconcile_all<R, C>(resources: &[Pending<R>], converger: &C) -> Result<PassSummary>
where
    R: Identify + Send + Sync,
    C: Converge<R> + ?Sized,
{
    run_pass(Pass::Typed, resources, converger).await
}

/// Dynamic pass; each item's desired-state function travels with its handle
/// into the convergence primitive.
pub async fn reconcile_dynamic<C>(
    items: &[DynamicResourceWithDesiredState],
    converger: &C,
) -> Result<PassSummary>
where
    C: Converge<BoundDynamic> + ?Sized,
{
    let pending: Vec<Pending<BoundDynamic>> = items.iter().map(|item| item.bind()).collect();
    run_pass(Pass::Dynamic, &pending, converger).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{
        expand, DesiredState, DynamicResource, ResourceBuilder, ResourceRef, Variant,
    };
    use kube::api::{ApiResource, GroupVersionKind};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Debug, PartialEq)]
    struct Widget {
        kind: &'static str,
        name: String,
    }

    impl Identify for Widget {
        fn resource_ref(&self) -> ResourceRef {
            ResourceRef {
                group: "test".to_string(),
                version: "v1".to_string(),
                kind: self.kind.to_string(),
                namespace: Some("ns".to_string()),
                name: self.name.clone(),
            }
        }
    }

    /// Converges into a vector; fails for the named object.
    #[derive(Default)]
    struct Store {
        seen: Mutex<Vec<String>>,
        fail_on: Option<String>,
    }

    #[async_trait]
    impl Converge<Widget> for Store {
        async fn converge(&self, resource: &Widget) -> Result<Outcome> {
            self.seen.lock().unwrap().push(resource.name.clone());
            if self.fail_on.as_deref() == Some(resource.name.as_str()) {
                return Err(Error::ConfigError("forbidden".to_string()));
            }
            Ok(Outcome::Created)
        }
    }

    #[async_trait]
    impl Converge<BoundDynamic> for Store {
        async fn converge(&self, resource: &BoundDynamic) -> Result<Outcome> {
            self.seen.lock().unwrap().push(resource.resource().name.clone());
            match resource.desired_state()? {
                DesiredState::Present(_) => Ok(Outcome::Created),
                DesiredState::Absent => Ok(Outcome::Unchanged),
            }
        }
    }

    fn builder(kind: &'static str, built: Arc<AtomicUsize>) -> ResourceBuilder<Widget> {
        ResourceBuilder::new(kind, move |v: &Variant| {
            built.fetch_add(1, Ordering::SeqCst);
            Ok(Widget {
                kind,
                name: format!("{v}-{}", kind.to_lowercase()),
            })
        })
    }

    fn variants() -> Vec<Variant> {
        vec![Variant::new("ingress").unwrap(), Variant::new("egress").unwrap()]
    }

    #[tokio::test]
    async fn test_pass_converges_in_order() {
        let built = Arc::new(AtomicUsize::new(0));
        let items = expand(
            &variants(),
            &[
                builder("ServiceAccount", built.clone()),
                builder("Deployment", built.clone()),
            ],
        );
        let store = Store::default();

        let summary = reconcile_all(&items, &store).await.unwrap();

        assert_eq!(summary.created, 4);
        assert_eq!(
            *store.seen.lock().unwrap(),
            vec![
                "ingress-serviceaccount",
                "ingress-deployment",
                "egress-serviceaccount",
                "egress-deployment",
            ]
        );
    }

    #[tokio::test]
    async fn test_pass_stops_at_first_failure() {
        let built = Arc::new(AtomicUsize::new(0));
        let items = expand(
            &variants(),
            &[
                builder("ServiceAccount", built.clone()),
                builder("Deployment", built.clone()),
            ],
        );
        let store = Store {
            fail_on: Some("ingress-deployment".to_string()),
            ..Default::default()
        };

        let err = reconcile_all(&items, &store).await.unwrap_err();

        // the two remaining egress items were never even constructed
        assert_eq!(built.load(Ordering::SeqCst), 2);
        assert_eq!(store.seen.lock().unwrap().len(), 2);

        let failed = err.failed_resource().expect("reconcile error");
        assert_eq!(failed.kind, "Deployment");
        assert_eq!(failed.name, "ingress-deployment");
        let msg = err.to_string();
        assert!(msg.contains("ingress/Deployment"), "{msg}");
    }

    #[tokio::test]
    async fn test_construction_error_names_origin() {
        let items = expand(
            &variants(),
            &[ResourceBuilder::new("broken", |v: &Variant| -> Result<Widget> {
                Err(Error::ValidationError(format!("{v} has no replicas")))
            })],
        );
        let store = Store::default();

        let err = reconcile_all(&items, &store).await.unwrap_err();

        assert!(matches!(err, Error::Construction { pass: Pass::Typed, .. }));
        assert!(err.to_string().contains("ingress/broken"), "{err}");
        assert!(store.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_pass_succeeds() {
        let store = Store::default();
        let summary = reconcile_all::<Widget, _>(&[], &store).await.unwrap();
        assert_eq!(summary, PassSummary::default());
    }

    #[tokio::test]
    async fn test_dynamic_pass_evaluates_desired_state() {
        let ar = ApiResource::from_gvk(&GroupVersionKind::gvk("networking.istio.io", "v1alpha3", "Gateway"));
        let present_ar = ar.clone();
        let items = vec![
            DynamicResourceWithDesiredState::new(
                "present",
                move || Ok(DynamicResource::new(present_ar.clone(), "a").within("ns")),
                |_r: &DynamicResource| Ok(DesiredState::Present(serde_json::json!({}))),
            ),
            DynamicResourceWithDesiredState::new(
                "absent",
                move || Ok(DynamicResource::new(ar.clone(), "b").within("ns")),
                |_r: &DynamicResource| Ok(DesiredState::Absent),
            ),
        ];
        let store = Store::default();

        let summary = reconcile_dynamic(&items, &store).await.unwrap();

        assert_eq!(summary.created, 1);
        assert_eq!(summary.unchanged, 1);
        assert_eq!(summary.writes(), 1);
        assert_eq!(summary.total(), 2);
    }

    #[tokio::test]
    async fn test_dynamic_failure_is_wrapped_as_dynamic() {
        let ar = ApiResource::from_gvk(&GroupVersionKind::gvk("networking.istio.io", "v1alpha3", "Gateway"));
        let items = vec![DynamicResourceWithDesiredState::new(
            "gateway",
            move || Ok(DynamicResource::new(ar.clone(), "gw").within("ns")),
            |_r: &DynamicResource| Err(Error::ConfigError("no ingress".to_string())),
        )];

        let err = reconcile_dynamic(&items, &Store::default()).await.unwrap_err();

        assert!(matches!(err, Error::Reconcile { pass: Pass::Dynamic, .. }));
        let msg = err.to_string();
        assert!(msg.starts_with("failed to reconcile dynamic resource gateway (Gateway"), "{msg}");
        assert!(msg.ends_with("no ingress"), "{msg}");
    }
}
