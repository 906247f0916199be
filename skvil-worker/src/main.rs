use std::sync::Arc;
use std::time::Duration;

use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use skvil_core::limits;
use skvil_worker::client::BrokerClient;
use skvil_worker::config::WorkerConfig;
use skvil_worker::heartbeat;
use skvil_worker::host::{self, HostChannel};
use skvil_worker::processor::AutoProcessor;
use skvil_worker::sampling::SamplingHost;
use skvil_worker::tools::ToolRouter;

#[tokio::main]
async fn main() {
    let config = match WorkerConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("fatal: {err}");
            std::process::exit(1);
        }
    };

    // Stdout carries the host JSON-RPC channel; diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!(
        agent_id = %config.agent_id,
        broker = %config.broker_url,
        auto_process = config.auto_process,
        "worker starting"
    );

    let client = match BrokerClient::new(&config.broker_url, &config.agent_id) {
        Ok(client) => Arc::new(client),
        Err(err) => {
            eprintln!("fatal: {err}");
            std::process::exit(1);
        }
    };

    // Registration is best-effort here: if the broker is down, the tools
    // surface the errors and the heartbeat keeps retrying registration.
    match client.register(&config.register_request()).await {
        Ok(response) => {
            info!(total_agents = response.total_agents, "registered with broker");
        }
        Err(err) => warn!("initial registration failed: {err}"),
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(heartbeat::run_heartbeat(
        client.clone(),
        config.clone(),
        shutdown_rx.clone(),
    ));

    let channel = HostChannel::new(tokio::io::stdout());
    let sampling: Arc<dyn SamplingHost> = channel.clone();
    let processor = AutoProcessor::new(
        client.clone(),
        sampling,
        config.poll_interval,
        config.auto_process,
    );
    if config.auto_process {
        processor.start(shutdown_rx.clone());
    }

    let tools = Arc::new(ToolRouter::new(
        client.clone(),
        processor.clone(),
        shutdown_rx.clone(),
    ));
    let mut host_loop = tokio::spawn(host::run_host_loop(channel, tools, tokio::io::stdin()));

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to register SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to register SIGINT handler");
    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
        _ = &mut host_loop => info!("host channel closed, shutting down"),
    }

    // Stop the tickers, then drain an in-flight pass before deregistering.
    processor.stop();
    let _ = shutdown_tx.send(true);
    drain(&processor).await;

    let status_key = format!("{}-status", config.agent_id);
    if let Err(err) = client
        .set_context(&status_key, serde_json::json!("offline"))
        .await
    {
        warn!("failed to publish offline status: {err}");
    }
    match client.deregister().await {
        Ok(_) => info!("deregistered from broker"),
        Err(err) => warn!("deregister failed: {err}"),
    }

    info!("worker stopped");
}

/// Wait up to the drain budget for an in-flight processing pass to finish.
async fn drain(processor: &AutoProcessor) {
    let deadline = tokio::time::Instant::now() + limits::SHUTDOWN_DRAIN;
    while processor.is_processing() {
        if tokio::time::Instant::now() >= deadline {
            warn!("shutdown drain expired with processing still in flight");
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}
