use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use portgate::bootstrap::Server;
use portgate::config::Config;
use portgate::telemetry::{init_tracing, TracingConfig};

#[derive(Parser, Debug)]
#[command(name = "portgate")]
#[command(author, version, about = "Port-based packet admission firewall")]
struct Args {
    /// Path to config file
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,

    /// Validate config and exit
    #[arg(long)]
    validate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration first (to get log settings)
    let config = Config::load(&args.config)?;

    let tracing_config = TracingConfig {
        service_name: "portgate".to_string(),
        log_level: config.telemetry.log_level.clone(),
        json_logs: config.telemetry.json_logs,
    };

    init_tracing(&tracing_config)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %args.config.display(),
        "starting portgate"
    );

    info!(
        address = %config.listener.address,
        seed_rules = config.rules.len(),
        "configuration loaded"
    );

    // Validate only mode
    if args.validate {
        for (index, request) in config.rules.iter().enumerate() {
            request
                .clone()
                .validate()
                .with_context(|| format!("invalid seed rule #{}", index + 1))?;
        }
        info!("configuration is valid");
        return Ok(());
    }

    let server = Server::new(config)?;
    server.run().await?;

    Ok(())
}
