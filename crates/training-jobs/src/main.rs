use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use training_jobs::{config::Config, kubernetes::ClusterApi, metrics, server::Server, KubeClient};

/// Status and hibernation service for Kubernetes training jobs
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Namespace whose jobs are listed and polled (overrides KUBE_NAMESPACE)
    #[arg(long)]
    namespace: Option<String>,

    /// HTTP listen address (overrides SERVER_ADDR)
    #[arg(long)]
    addr: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(namespace) = args.namespace {
        config.kube.namespace = namespace;
    }
    if let Some(addr) = args.addr {
        config.server.addr = addr;
    }
    info!("Loaded configuration: {:?}", config);

    metrics::register_metrics();

    let client: Arc<dyn ClusterApi> = Arc::new(
        KubeClient::try_default()
            .await
            .context("Failed to connect to the Kubernetes API")?,
    );

    let server = Server::new(&config, client);
    let shutdown = server.shutdown_token();

    let poller = server.poller();
    let poller_task = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { poller.run(shutdown).await }
    });

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(e) => {
                warn!("Failed to listen for shutdown signal: {}", e);
                return;
            }
        }
        shutdown.cancel();
    });

    info!("Starting server on {}", config.server.addr);
    server
        .start(&config.server.addr)
        .await
        .context("HTTP server failed")?;

    poller_task.await.context("Status poller panicked")?;
    Ok(())
}
