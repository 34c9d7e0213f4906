use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod domain;
mod services;

use cli::{Cli, Commands};
use services::client::HttpAnalysisClient;
use services::config::{load_config, ClientConfig};

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "faceai=debug" } else { "warn" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn connect(cli: &Cli) -> anyhow::Result<(ClientConfig, HttpAnalysisClient)> {
    let config = load_config(cli.api_url.as_deref())?;
    let client = HttpAnalysisClient::new(&config.api_url, config.timeout)?;
    Ok((config, client))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Analyze(args) => {
            let (config, client) = connect(&cli)?;
            commands::handle_analyze(&cli, args, &config, &client).await
        }
        Commands::Session(args) => {
            let (config, client) = connect(&cli)?;
            commands::handle_session(&cli, args, &config, client).await
        }
        Commands::Health => {
            let (_, client) = connect(&cli)?;
            commands::handle_health(&cli, &client).await
        }
        Commands::Normalize(args) => commands::handle_normalize(&cli, args),
        Commands::Gate { warnings } => commands::handle_gate(&cli, warnings),
    }
}
