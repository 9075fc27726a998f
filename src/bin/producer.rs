//! Prime producer - Entry Point
//!
//! Connects to a collector and submits signed random primes until the
//! collector has enough.

use clap::Parser;
use log::{error, info};
use std::process::ExitCode;

use prime_collector::producer::Producer;

#[derive(Debug, Parser)]
#[command(name = "prime-producer", about = "Submit signed random primes to a collector")]
struct Cli {
    /// Collector address
    #[arg(short, long, env = "PRIME_PRODUCER_ADDR", default_value = "127.0.0.1:3000")]
    addr: String,

    /// Largest value to draw primes from
    #[arg(long, default_value_t = i32::MAX)]
    max_value: i32,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let producer = match Producer::connect(&cli.addr).await {
        Ok(producer) => producer,
        Err(e) => {
            error!("Error connecting to {}: {}", cli.addr, e);
            return ExitCode::FAILURE;
        }
    };

    match producer.run(cli.max_value).await {
        Ok(outcome) => {
            info!(
                "Client {} done ({:?}): {} accepted, {} duplicates, {} invalid",
                outcome.identity,
                outcome.final_code,
                outcome.stats.accepted,
                outcome.stats.duplicates,
                outcome.stats.invalid
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Producer failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
