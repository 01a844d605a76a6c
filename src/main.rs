use clap::Parser;
use tracing_subscriber::EnvFilter;

use jobbot_server::config::{AppConfig, Args};
use jobbot_server::Server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let config = AppConfig::load(&args)?;

    let default_level = if config.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let server = Server::new(config).await?;
    server.start().await?;

    Ok(())
}
