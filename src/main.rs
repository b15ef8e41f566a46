//! vod-proxy server binary.

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use vod_proxy::lifecycle::{signals, startup, Shutdown};
use vod_proxy::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "vod-proxy")]
#[command(about = "Forwarding proxy for video-site APIs and media streams", long_about = None)]
struct Args {
    /// Path to a TOML configuration file. Defaults plus environment are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = startup::load(args.config.as_deref())?;

    logging::init_logging(&config.observability.log_level);
    tracing::info!("vod-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        timeout_ms = config.upstream.timeout_ms,
        max_retries = config.retries.max_retries,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        // Validated as a socket address during config load.
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        }
    }

    let bind_address = config.listener.bind_address.clone();
    let server = startup::build_server(config)?;

    let listener = TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(&shutdown);

    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
