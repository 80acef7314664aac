use anyhow::Result;
use clap::Parser;
use leavebook::cli::Cli;
use leavebook::config::AppConfig;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Loads .env before clap reads env-backed flags
    let config = AppConfig::from_env()?;
    let cli = Cli::parse();

    init_tracing(cli.verbose, config.log_json);

    cli.run(config).await
}

fn init_tracing(verbose: bool, json: bool) {
    let default_filter = if verbose { "leavebook=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
