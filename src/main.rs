//! Prime collector - Entry Point
//!
//! Collects a configured number of unique, signed primes from producers,
//! prints the scoreboard and exits.

use clap::Parser;
use log::{error, info};
use std::process::ExitCode;

use prime_collector::config::DEFAULT_CONFIG_PATH;
use prime_collector::{CollectorConfig, CollectorServer};

#[derive(Debug, Parser)]
#[command(name = "prime-collector", about = "Collect unique signed primes from producers")]
struct Cli {
    /// Maximum number of unique primes to collect
    #[arg(short, long)]
    max: Option<usize>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind to
    #[arg(long)]
    bind: Option<String>,

    /// Configuration file (extension optional)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize the logger (env_logger picks up RUST_LOG environment variable)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = match CollectorConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(max) = cli.max {
        config.capacity = max;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(bind) = cli.bind {
        config.bind_address = bind;
    }

    info!("Launching prime collector...");

    let server = match CollectorServer::bind(config).await {
        Ok(server) => server,
        Err(e) => {
            error!("Server startup failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let coordinator = server.coordinator();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, stopping collection");
            coordinator.interrupt();
        }
    });

    match server.run().await {
        Ok(report) => {
            info!("{}", report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Server failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
