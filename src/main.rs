use anyhow::{Context, Result};
use clap::Parser;
use fogmate::cli::{Cli, Commands};
use fogmate::network::Server;
use fogmate::ServerConfig;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { bind, config } => {
            let mut config =
                ServerConfig::load(config.as_deref()).context("Failed to load configuration")?;
            if let Some(bind) = bind {
                config.bind_addr = bind;
            }

            let server = Server::bind(config).await?;
            info!("Listening on {}", server.local_addr()?);

            server
                .run_until(async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        error!("Failed to listen for Ctrl-C: {}", e);
                        std::future::pending::<()>().await;
                    }
                })
                .await?;
            info!("Server stopped");
        }
        Commands::Config { config } => {
            let config =
                ServerConfig::load(config.as_deref()).context("Failed to load configuration")?;
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}
