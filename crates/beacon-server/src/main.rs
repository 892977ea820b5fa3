use anyhow::Result;
use clap::Parser;
use tracing::info;

mod config;
mod server;
mod telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init()?;

    let config = config::ServerConfig::parse();

    info!("Beacon relay starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Start the WebSocket relay server
    server::start(config).await?;

    Ok(())
}
