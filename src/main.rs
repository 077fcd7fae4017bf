//! Edge proxy binary.
//!
//! # Request Flow
//!
//! ```text
//! client ──▶ http::server ──▶ security::limits ──▶ routing::Router
//!                                   │                    │
//!                                   ▼                    ├─ /image/* hit  ──▶ static_files (1 day cache)
//!                                 413                    ├─ /image/* miss ──▶ forward ──▶ localhost:8080
//!                                                        └─ everything else ─▶ forward ──▶ app:8080
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use edge_proxy::config::{load_config, validate_config, ConfigError, ConfigWatcher, ProxyConfig};
use edge_proxy::lifecycle::{wait_for_signal, Shutdown};
use edge_proxy::observability::{logging, metrics};
use edge_proxy::HttpServer;

#[derive(Parser)]
#[command(name = "edge-proxy")]
#[command(about = "Static image edge and reverse proxy", long_about = None)]
struct Cli {
    /// TOML configuration file. Built-in defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,

    /// Reload routing settings when the config file changes.
    #[arg(short, long, requires = "config")]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
        validate_config(&config).map_err(ConfigError::Validation)?;
    }

    logging::init_logging(&config.observability);
    tracing::info!("edge-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_body_size = config.limits.max_body_size,
        static_root = %config.static_files.root,
        "Configuration loaded"
    );

    let (_watcher, config_updates) = match (&cli.config, cli.watch) {
        (Some(path), true) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        _ => (None, mpsc::unbounded_channel().1),
    };

    if config.observability.metrics_enabled {
        // Already checked by `validate_config` when metrics are enabled.
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        signal_shutdown.trigger();
    });

    let server = HttpServer::new(config)?;
    server.run(listener, config_updates, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
