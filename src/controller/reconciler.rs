//! Main reconciler for GatewaySet resources
//!
//! Implements the controller pattern using kube-rs runtime.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
use k8s_openapi::api::core::v1::{Service, ServiceAccount};
use k8s_openapi::api::policy::v1::PodDisruptionBudget;
use kube::{
    api::{Api, Patch, PatchParams},
    client::Client,
    runtime::{
        controller::{Action, Controller},
        finalizer::{finalizer, Event as FinalizerEvent},
        watcher::Config,
    },
    ResourceExt,
};
use tracing::{debug, error, info, instrument, warn};

use super::conditions::apply_state;
use super::finalizers::{cleanup_cluster_scoped, GATEWAY_SET_FINALIZER};
use crate::crd::{ConfigState, GatewaySet, GatewaySetStatus};
use crate::error::{Error, Result};
use crate::gateways::Reconciler;
use crate::k8sutil::{KubeConverger, RecordingStore};

/// Shared state for the controller
pub struct ControllerState {
    pub client: Client,
    pub converger: KubeConverger,
    /// Requeue interval after a successful run
    pub requeue_interval: Duration,
    /// Converge into memory instead of the cluster
    pub dry_run: bool,
    /// Only watch GatewaySets in this namespace
    pub watch_namespace: Option<String>,
}

impl ControllerState {
    pub fn new(client: Client, field_manager: &str, requeue_interval: Duration, dry_run: bool) -> Self {
        Self {
            converger: KubeConverger::new(client.clone(), field_manager),
            client,
            requeue_interval,
            dry_run,
            watch_namespace: None,
        }
    }

    pub fn watching(mut self, namespace: Option<String>) -> Self {
        self.watch_namespace = namespace;
        self
    }
}

/// Main entry point to start the controller
pub async fn run_controller(state: Arc<ControllerState>) -> Result<()> {
    let client = state.client.clone();
    let gateway_sets: Api<GatewaySet> = match &state.watch_namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    };

    info!(namespace = ?state.watch_namespace, "Starting GatewaySet controller");

    match gateway_sets.list(&Default::default()).await {
        Ok(_) => info!("GatewaySet CRD is available"),
        Err(e) => {
            error!("GatewaySet CRD not found. Install it first (crdgen): {:?}", e);
            return Err(Error::ConfigError(
                "GatewaySet CRD not installed".to_string(),
            ));
        }
    }

    Controller::new(gateway_sets, Config::default())
        .owns::<Deployment>(Api::all(client.clone()), Config::default())
        .owns::<Service>(Api::all(client.clone()), Config::default())
        .owns::<ServiceAccount>(Api::all(client.clone()), Config::default())
        .owns::<HorizontalPodAutoscaler>(Api::all(client.clone()), Config::default())
        .owns::<PodDisruptionBudget>(Api::all(client.clone()), Config::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, state)
        .for_each(|res| async move {
            match res {
                Ok(obj) => debug!("Reconciled: {:?}", obj),
                Err(e) => error!("Reconcile error: {:?}", e),
            }
        })
        .await;

    Ok(())
}

async fn reconcile(obj: Arc<GatewaySet>, ctx: Arc<ControllerState>) -> Result<Action> {
    let namespace = obj.namespace().unwrap_or_else(|| "default".to_string());
    let api: Api<GatewaySet> = Api::namespaced(ctx.client.clone(), &namespace);

    finalizer(&api, GATEWAY_SET_FINALIZER, obj, |event| async {
        match event {
            FinalizerEvent::Apply(gws) => apply_gateway_set(&ctx, gws).await,
            FinalizerEvent::Cleanup(gws) => cleanup_gateway_set(&ctx, &gws).await,
        }
    })
    .await
    .map_err(Error::from)
}

#[instrument(skip(ctx, gws), fields(name = %gws.name_any(), namespace = gws.namespace()))]
async fn apply_gateway_set(ctx: &ControllerState, gws: Arc<GatewaySet>) -> Result<Action> {
    let client = &ctx.client;

    if let Err(e) = gws.spec.validate() {
        warn!("Validation failed: {}", e);
        update_status(client, &gws, ConfigState::ReconcileFailed, Some(&e)).await?;
        return Err(Error::ValidationError(e));
    }

    if needs_reconciling_status(&gws) {
        update_status(client, &gws, ConfigState::Reconciling, None).await?;
    }

    let result = if ctx.dry_run {
        let store = RecordingStore::new();
        let report = Reconciler::new(gws.clone(), &store).reconcile().await;
        info!(writes = store.write_count(), "Dry run, nothing written to the cluster");
        report
    } else {
        Reconciler::new(gws.clone(), &ctx.converger).reconcile().await
    };

    match result {
        Ok(_) => {
            update_status(client, &gws, ConfigState::Available, None).await?;
            Ok(Action::requeue(ctx.requeue_interval))
        }
        Err(e) => {
            update_status(client, &gws, ConfigState::ReconcileFailed, Some(&e.to_string())).await?;
            Err(e)
        }
    }
}

#[instrument(skip(ctx, gws), fields(name = %gws.name_any(), namespace = gws.namespace()))]
async fn cleanup_gateway_set(ctx: &ControllerState, gws: &GatewaySet) -> Result<Action> {
    info!("Cleaning up cluster-scoped gateway resources");

    if ctx.dry_run {
        info!("Dry run, skipping cleanup");
    } else {
        cleanup_cluster_scoped(&ctx.client, gws).await?;
    }

    Ok(Action::await_change())
}

fn error_policy(gws: Arc<GatewaySet>, error: &Error, _ctx: Arc<ControllerState>) -> Action {
    error!("Reconciliation error for {}: {}", gws.name_any(), error);

    let retry_duration = if error.is_retriable() {
        Duration::from_secs(15)
    } else {
        Duration::from_secs(60)
    };

    Action::requeue(retry_duration)
}

/// A new generation has not been picked up yet
fn needs_reconciling_status(gws: &GatewaySet) -> bool {
    gws.status
        .as_ref()
        .and_then(|s| s.observed_generation)
        != gws.metadata.generation
}

/// Whether writing `state` would leave the status as it is
fn status_unchanged(
    current: Option<&GatewaySetStatus>,
    state: ConfigState,
    message: Option<&str>,
    generation: Option<i64>,
) -> bool {
    current.is_some_and(|s| {
        s.status == Some(state)
            && s.error_message.as_deref() == message
            && s.observed_generation == generation
    })
}

/// Patch the status subresource; skipped when nothing would change so that
/// a converged GatewaySet does not trigger itself again.
async fn update_status(
    client: &Client,
    gws: &GatewaySet,
    state: ConfigState,
    message: Option<&str>,
) -> Result<()> {
    let generation = gws.metadata.generation;
    if status_unchanged(gws.status.as_ref(), state, message, generation) {
        debug!("Status already {}", state);
        return Ok(());
    }

    let namespace = gws.namespace().unwrap_or_else(|| "default".to_string());
    let api: Api<GatewaySet> = Api::namespaced(client.clone(), &namespace);

    let mut conditions = gws
        .status
        .as_ref()
        .map(|s| s.conditions.clone())
        .unwrap_or_default();
    apply_state(&mut conditions, state, message.unwrap_or_default(), generation);

    let patch = serde_json::json!({
        "status": {
            "status": state,
            "errorMessage": message,
            "observedGeneration": generation,
            "lastReconcileTime": Utc::now().to_rfc3339(),
            "conditions": conditions,
        }
    });
    api.patch_status(&gws.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
        .await
        .map_err(Error::KubeError)?;

    Ok(())
}
