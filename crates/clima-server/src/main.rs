use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use tracing::{Level, error, info};

use clima_server::config::ServerConfig;
use clima_server::error::Result;
use clima_server::server::Server;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Configuration file in `JSON` format.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server address. Overrides the configuration file.
    #[arg(short, long)]
    address: Option<Ipv4Addr>,

    /// Server port. Overrides the configuration file.
    #[arg(short, long)]
    port: Option<u16>,

    /// Authorized device secret. Can be repeated, and adds to the secrets
    /// of the configuration file.
    #[arg(short, long = "secret")]
    secrets: Vec<String>,

    /// Log level.
    #[arg(long, default_value_t = Level::INFO)]
    log_level: Level,
}

impl Cli {
    fn server_config(self) -> Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::from_file(path)?,
            None => ServerConfig::default(),
        };

        if let Some(address) = self.address {
            config.address = address;
        }

        if let Some(port) = self.port {
            config.port = port;
        }

        Ok(config.secrets(self.secrets))
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Unable to listen for the shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.server_config()?;
    info!("Configuration: {config:?}");

    Server::from_config(&config)?
        .with_graceful_shutdown(shutdown_signal())
        .run()
        .await
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .init();

    // Errors are logged when they are created.
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}
