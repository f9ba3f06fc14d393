use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use k8s_openapi::api::core::v1::Pod;
use kube_client::{
    config::{KubeConfigOptions, Kubeconfig},
    Client,
};
use platform_annotator::{
    client::KubeObjects, config, ConfigSubscription, PlatformConfigTarget, Runtime,
    WorkloadSubscription,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Path to a kubeconfig. Only required if out-of-cluster.
    #[arg(long)]
    kubeconfig: Option<PathBuf>,
    /// The address of the Kubernetes API server. Overrides any value in kubeconfig.
    #[arg(long)]
    master: Option<String>,
    /// Name of the config map holding the platform defaults.
    #[arg(long, default_value = config::DEFAULT_CONFIG_MAP_NAME)]
    config_name: String,
    /// Only read the platform config map from this namespace.
    #[arg(long)]
    config_namespace: Option<String>,
    /// Data key of the platform defaults inside the config map.
    #[arg(long, default_value = config::DEFAULT_DATA_KEY)]
    config_key: String,
    /// Only annotate workloads in this namespace.
    #[arg(long)]
    workload_namespace: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let client = build_client(&args).await?;
    tracing::info!(
        default_namespace = client.default_namespace(),
        "Connected to cluster"
    );

    let objects = KubeObjects::new(client);
    let platform_config = ConfigSubscription::new(
        objects.clone(),
        PlatformConfigTarget {
            name: args.config_name,
            namespace: args.config_namespace,
            data_key: args.config_key,
        },
    );
    let workloads = WorkloadSubscription::<_, Pod>::new(
        objects,
        config::workload_watcher_config(args.workload_namespace.as_deref()),
    )
    .with_platform_config(platform_config.snapshot());

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "Cannot listen for shutdown signal");
                return;
            }
            tracing::info!("Shutdown requested");
            shutdown.cancel();
        }
    });

    Runtime::new()
        .with(platform_config)
        .with(workloads)
        .run(shutdown)
        .await
        .context("running subscriptions")
}

async fn build_client(args: &Args) -> anyhow::Result<Client> {
    let mut config = match &args.kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path)
                .with_context(|| format!("reading kubeconfig {}", path.display()))?;
            kube_client::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .context("loading kubeconfig")?
        }
        None => kube_client::Config::infer()
            .await
            .context("inferring cluster config")?,
    };
    if let Some(master) = &args.master {
        config.cluster_url = master
            .parse()
            .with_context(|| format!("invalid master url {master:?}"))?;
    }
    Client::try_from(config).context("building client")
}
