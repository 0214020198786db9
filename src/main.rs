//! fx-quote server.
//!
//! Serves `GET /cotacao`: fetches the USD-BRL bid from the upstream API
//! under a fetch deadline, stores it under a separate persist deadline, and
//! returns `{"bid": "..."}`. Only startup failures end the process.

use std::path::PathBuf;

use clap::Parser;

use fx_quote::config::{load_config, ServerConfig};
use fx_quote::lifecycle::{bootstrap, Shutdown};
use fx_quote::observability::{logging::init_logging, metrics::init_metrics};

#[derive(Parser)]
#[command(name = "fx-quote")]
#[command(about = "Currency quote server with propagated deadlines", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    init_logging(&config.observability, "fx_quote=debug,tower_http=info");
    tracing::info!("fx-quote v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.url,
        request_ms = config.timeouts.request_ms,
        fetch_ms = config.timeouts.fetch_ms,
        persist_ms = config.timeouts.persist_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let (server, listener) = bootstrap(config).await.map_err(|e| {
        tracing::error!(error = %e, "Startup failed");
        e
    })?;

    let shutdown = Shutdown::new();
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
