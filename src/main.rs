//! blockchain-forge service binary.
//!
//! Accepts machine-provisioning requests, runs each one in the background
//! against a cloud provider, and exposes CRUD for RPC endpoints and nodes.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌───────────────────────────────────────────────────┐
//!                         │                  BLOCKCHAIN FORGE                  │
//!                         │                                                    │
//!   POST /api/create-     │  ┌─────────┐    ┌─────────────┐   spawn            │
//!   machine  ─────────────┼─▶│  http   │───▶│ Provisioner │─────────┐          │
//!                         │  │ server  │    └──────┬──────┘         ▼          │
//!   GET /api/task-status  │  └────┬────┘           │         ┌─────────────┐   │
//!   ◀─────────────────────┼───────┘                ▼         │ Provision-  │   │
//!                         │                 ┌───────────┐    │ Worker      │   │
//!                         │                 │ TaskStore │◀───┤ (one/task)  │   │
//!                         │                 └───────────┘    └──────┬──────┘   │
//!                         │                                         ▼          │
//!                         │                              ┌──────────────────┐  │
//!                         │                              │ProviderDispatcher│  │
//!                         │                              └────────┬─────────┘  │
//!                         │                         gcloud / aws / az CLIs     │
//!                         │                                                    │
//!   /api/rpcs, /api/nodes │  ┌─────────────┐                                   │
//!   ──────────────────────┼─▶│ RecordStore │                                   │
//!                         │  └─────────────┘                                   │
//!                         └───────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use blockchain_forge::config::load_config;
use blockchain_forge::lifecycle::Shutdown;
use blockchain_forge::observability::{logging, metrics};
use blockchain_forge::HttpServer;

#[derive(Parser)]
#[command(name = "blockchain-forge", version, about = "Blockchain node provisioning service")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "FORGE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load_config(args.config.as_deref())?;
    logging::init_logging(&config.observability)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "blockchain-forge starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        drain_timeout_secs = config.provisioning.drain_timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::from_config(config);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
