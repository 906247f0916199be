mod shutdown;
mod telemetry;

use anyhow::Result;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};

use skvil_broker::{BrokerState, broker_router, console, reaper};
use skvil_core::limits;

/// Skvil-Piertotum broker daemon: central message and context hub for
/// coding agents on the local network.
#[derive(Parser, Debug)]
#[command(name = "skvild", version, about)]
struct Cli {
    /// Listen port.
    #[arg(env = "BROKER_PORT", default_value_t = limits::DEFAULT_BROKER_PORT)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init_telemetry();

    // A panic leaves broker state undefined; the process must not keep
    // serving from it. Supervisors restart on exit code 1.
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        default_hook(info);
        std::process::exit(1);
    }));

    let state = BrokerState::new();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let listener = match TcpListener::bind(("0.0.0.0", cli.port)).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(port = cli.port, "failed to bind listener: {err}");
            std::process::exit(1);
        }
    };
    info!(port = cli.port, "broker listening");

    tokio::spawn(reaper::run_reaper(state.clone(), shutdown_rx.clone()));
    tokio::spawn(console::run_console(state.clone(), shutdown_rx.clone()));
    tokio::spawn(shutdown::signal_listener(shutdown_tx));

    let mut serve_shutdown = shutdown_rx;
    axum::serve(listener, broker_router(state))
        .with_graceful_shutdown(async move {
            serve_shutdown.changed().await.ok();
        })
        .await?;

    info!("broker stopped");
    Ok(())
}
