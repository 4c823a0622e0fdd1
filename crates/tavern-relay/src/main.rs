use std::path::PathBuf;

use clap::Parser;
use tavern_config::TavernConfig;
use tavern_relay::{serve, SignalingRelay};
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(name = "tavern-relay", about = "Room presence and signaling relay for tavern")]
struct Args {
    /// Address to bind (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Path to a TOML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is unset (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Logging depends on config, so config errors are reported after init.
    let (config, config_err) = match tavern_config::load_config_from(args.config.as_deref()) {
        Ok(config) => (config, None),
        Err(e) => (TavernConfig::default(), Some(e)),
    };

    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.as_str().to_string());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("tavern_relay={level}").into()),
        )
        .init();

    if let Some(e) = config_err {
        tracing::warn!("{e}; using default config");
    }

    let host = args.host.unwrap_or(config.server.host);
    let port = args.port.unwrap_or(config.server.port);
    let addr = format!("{host}:{port}");

    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(addr = %addr, error = %e, "Failed to bind TCP listener");
            std::process::exit(1);
        }
    };

    tracing::info!("tavern-relay listening on {}", addr);

    serve(listener, SignalingRelay::new(config.limits)).await;
}
