use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use gateway_operator::{
    config,
    controller::{self, ControllerState},
    gateways::Reconciler,
    k8sutil::{KubeConverger, RecordingStore, FIELD_MANAGER},
    telemetry, Error,
};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log output format
    #[arg(long, global = true, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the operator
    Run(RunArgs),
    /// Reconcile a single GatewaySet read from a file, then exit
    Reconcile(ReconcileArgs),
    /// Print the objects a GatewaySet file would produce, without a cluster
    Render(RenderArgs),
    /// Show version information
    Version,
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Only watch GatewaySets in this namespace (all namespaces when unset)
    #[arg(long, env = "WATCH_NAMESPACE")]
    namespace: Option<String>,

    /// Field manager used for server-side apply
    #[arg(long, env = "FIELD_MANAGER", default_value = FIELD_MANAGER)]
    field_manager: String,

    /// Seconds between periodic reconciles of a healthy GatewaySet
    #[arg(long, env = "REQUEUE_SECONDS", default_value_t = 300)]
    requeue_seconds: u64,

    /// Run in dry-run mode (calculate changes without applying them)
    #[arg(long, env = "DRY_RUN")]
    dry_run: bool,
}

#[derive(Parser, Debug)]
struct ReconcileArgs {
    /// GatewaySet manifest or bare spec (YAML)
    #[arg(long, short)]
    file: PathBuf,

    /// Namespace override
    #[arg(long, short)]
    namespace: Option<String>,

    /// Field manager used for server-side apply
    #[arg(long, env = "FIELD_MANAGER", default_value = FIELD_MANAGER)]
    field_manager: String,

    /// Converge into memory instead of the cluster
    #[arg(long, env = "DRY_RUN")]
    dry_run: bool,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// GatewaySet manifest or bare spec (YAML)
    #[arg(long, short)]
    file: PathBuf,

    /// Namespace override
    #[arg(long, short)]
    namespace: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();

    match args.command {
        Commands::Version => {
            println!("gateway-operator v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Render(render_args) => run_render(render_args).await,
        Commands::Reconcile(reconcile_args) => {
            init_tracing(args.log_format)?;
            let result = run_reconcile(reconcile_args).await;
            telemetry::shutdown_telemetry();
            result
        }
        Commands::Run(run_args) => {
            init_tracing(args.log_format)?;
            let result = run_operator(run_args).await;
            telemetry::shutdown_telemetry();
            result
        }
    }
}

fn init_tracing(format: LogFormat) -> Result<(), Error> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    let (text_layer, json_layer) = match format {
        LogFormat::Text => (Some(fmt::layer().with_target(true)), None),
        LogFormat::Json => (None, Some(fmt::layer().json().with_target(true))),
    };

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(text_layer)
        .with(json_layer);

    // Only enable OTEL if an endpoint is provided
    let otel_enabled = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok();

    if otel_enabled {
        let otel_layer = telemetry::init_telemetry(&registry)
            .map_err(|e| Error::ConfigError(format!("OpenTelemetry setup failed: {e}")))?;
        registry.with(otel_layer).init();
        info!("OpenTelemetry tracing initialized");
    } else {
        registry.init();
        info!("OpenTelemetry tracing disabled (OTEL_EXPORTER_OTLP_ENDPOINT not set)");
    }

    Ok(())
}

async fn run_operator(args: RunArgs) -> Result<(), Error> {
    info!("Starting gateway-operator v{}", env!("CARGO_PKG_VERSION"));

    let client = kube::Client::try_default()
        .await
        .map_err(Error::KubeError)?;

    info!("Connected to Kubernetes cluster");
    if args.dry_run {
        info!("Dry-run mode: no objects will be written");
    }

    let state = Arc::new(ControllerState::new(
        client,
        &args.field_manager,
        Duration::from_secs(args.requeue_seconds),
        args.dry_run,
    )
    .watching(args.namespace));

    controller::run_controller(state).await
}

async fn run_reconcile(args: ReconcileArgs) -> Result<(), Error> {
    let gws = Arc::new(config::load_gateway_set(
        &args.file,
        args.namespace.as_deref(),
    )?);

    let report = if args.dry_run {
        let store = RecordingStore::new();
        Reconciler::new(gws, &store).reconcile().await?
    } else {
        let client = kube::Client::try_default()
            .await
            .map_err(Error::KubeError)?;
        let converger = KubeConverger::new(client, args.field_manager);
        Reconciler::new(gws, &converger).reconcile().await?
    };

    println!(
        "resources: {} created, {} updated, {} unchanged",
        report.typed.created, report.typed.updated, report.typed.unchanged
    );
    println!(
        "dynamic resources: {} created, {} updated, {} deleted, {} unchanged",
        report.dynamic.created,
        report.dynamic.updated,
        report.dynamic.deleted,
        report.dynamic.unchanged
    );
    Ok(())
}

async fn run_render(args: RenderArgs) -> Result<(), Error> {
    let gws = Arc::new(config::load_gateway_set(
        &args.file,
        args.namespace.as_deref(),
    )?);

    let store = RecordingStore::new();
    Reconciler::new(gws, &store).reconcile().await?;

    for write in store.writes() {
        if let Some(object) = write.object {
            println!("---");
            print!("{}", serde_yaml::to_string(&object)?);
        }
    }
    Ok(())
}
