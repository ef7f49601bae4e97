use anyhow::Context;
use clap::Parser;
use phonepe_gateway::{build_router, Config, PaymentService};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "phonepe-gateway", about = "PhonePe payment initiation service")]
struct Cli {
    /// Optional TOML config file; environment variables take precedence.
    #[arg(long, env = "PHONEPE_CONFIG")]
    config: Option<PathBuf>,

    /// Overrides PORT.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.server_port = port;
    }

    info!(
        port = config.server_port,
        environment = ?config.phonepe.environment,
        api_base_url = %config.phonepe.api_base_url,
        token_cache = config.phonepe.token_cache,
        "Starting PhonePe gateway"
    );

    let config = Arc::new(config);
    let service = Arc::new(
        PaymentService::from_config(config.clone()).context("failed to build PhonePe client")?,
    );
    let app = build_router(service);

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
